use glam::Vec3;

use crate::physics::body_properties::{BodyInertia, RigidBody, SolverBody};
use crate::physics::collision_detection::ContactManifold;
use crate::physics::constraints::contact::{ContactConstraint, PenetrationLimit, TangentFriction};
use crate::physics::errors::SolverError;
use crate::physics::solve_description::SolveDescription;
use crate::physics::warm_start::WarmStartCache;

/// Turns contact manifolds into solver constraints.
///
/// Every manifold becomes exactly one constraint at the same index. Jacobian coefficients and biases are computed
/// from the body state at conversion time and stay fixed for the rest of the solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstraintConverter {
    pub time_step: f32,
    pub position_drift: f32,
    pub position_constraint_coeff: f32,
    pub restitution_cutoff_sq: f32,
    pub static_body_index: Option<u32>,
}

impl ConstraintConverter {
    pub fn new(description: &SolveDescription) -> Self {
        Self {
            time_step: description.time_step,
            position_drift: description.position_drift,
            position_constraint_coeff: description.position_constraint_coeff,
            restitution_cutoff_sq: description.restitution_cutoff_sq,
            static_body_index: description.static_body_index,
        }
    }

    /// Converts manifolds against the caller's body and inertia arrays.
    pub fn convert(
        &self,
        bodies: &[RigidBody],
        inertias: &[BodyInertia],
        manifolds: &[ContactManifold],
        warm_start: Option<&WarmStartCache>,
    ) -> Result<Vec<ContactConstraint>, SolverError> {
        let states = SolverBody::gather(bodies, inertias, self.static_body_index)?;
        self.convert_gathered(&states, manifolds, warm_start)
    }

    /// Converts manifolds against bodies already gathered for solving.
    ///
    /// All manifolds are validated before any constraint is produced.
    pub fn convert_gathered(
        &self,
        bodies: &[SolverBody],
        manifolds: &[ContactManifold],
        warm_start: Option<&WarmStartCache>,
    ) -> Result<Vec<ContactConstraint>, SolverError> {
        for (index, manifold) in manifolds.iter().enumerate() {
            Self::validate_manifold(index, manifold, bodies.len())?;
        }
        Ok(manifolds
            .iter()
            .enumerate()
            .map(|(index, manifold)| {
                let body_a = &bodies[manifold.body_a as usize];
                let body_b = &bodies[manifold.body_b as usize];
                let mut constraint = self.convert_manifold(index, manifold, body_a, body_b);
                if let Some(cache) = warm_start {
                    Self::seed_impulses(&mut constraint, cache);
                }
                constraint
            })
            .collect())
    }

    fn validate_manifold(index: usize, manifold: &ContactManifold, body_count: usize) -> Result<(), SolverError> {
        for body in [manifold.body_a, manifold.body_b] {
            if body as usize >= body_count {
                return Err(SolverError::BodyIndexOutOfRange {
                    manifold: index,
                    body,
                    body_count,
                });
            }
        }
        if manifold.body_a == manifold.body_b {
            return Err(SolverError::DegeneratePair {
                manifold: index,
                body: manifold.body_a,
            });
        }
        if manifold.point_count > ContactManifold::MAX_POINTS {
            return Err(SolverError::TooManyContactPoints {
                manifold: index,
                count: manifold.point_count,
            });
        }
        Ok(())
    }

    /// Builds the constraint for one validated manifold with cold impulse accumulators.
    pub fn convert_manifold(
        &self,
        manifold_index: usize,
        manifold: &ContactManifold,
        body_a: &SolverBody,
        body_b: &SolverBody,
    ) -> ContactConstraint {
        let normal = manifold.normal;
        let inverse_dt = 1.0 / self.time_step;
        let mut constraint = ContactConstraint {
            normal,
            friction: manifold.friction,
            body_a: manifold.body_a,
            body_b: manifold.body_b,
            manifold_index: manifold_index as u32,
            point_count: manifold.point_count as u32,
            ..Default::default()
        };

        for (i, (position, depth)) in manifold.contacts().enumerate() {
            let (angular_a, angular_b) =
                PenetrationLimit::compute_angular_jacobians(position, normal, body_a.position, body_b.position);
            constraint.world_positions[i] = position;
            constraint.jac_coeff_inv[i] =
                PenetrationLimit::compute_jac_coeff_inv(normal, angular_a, angular_b, body_a, body_b);

            let relative_velocity = PenetrationLimit::compute_relative_velocity(
                normal,
                angular_a,
                angular_b,
                &body_a.velocity,
                &body_b.velocity,
            );
            let restitution = if relative_velocity * relative_velocity < self.restitution_cutoff_sq {
                0.0
            } else {
                manifold.restitution
            };
            constraint.bias[i] = restitution * relative_velocity
                + (self.position_drift - depth) * self.position_constraint_coeff * inverse_dt;
        }

        constraint.center = manifold.center().unwrap_or(Vec3::ZERO);
        if manifold.point_count > 0 {
            let tangents = TangentFriction::compute_tangents(normal);
            for (i, tangent) in tangents.into_iter().enumerate() {
                let (angular_a, angular_b) = PenetrationLimit::compute_angular_jacobians(
                    constraint.center,
                    tangent,
                    body_a.position,
                    body_b.position,
                );
                constraint.friction_jac_coeff_inv[i] =
                    PenetrationLimit::compute_jac_coeff_inv(tangent, angular_a, angular_b, body_a, body_b);
            }
        }
        constraint
    }

    fn seed_impulses(constraint: &mut ContactConstraint, cache: &WarmStartCache) {
        for point in 0..constraint.point_count as usize {
            if let Some(impulse) = cache.normal_impulse(constraint.body_a, constraint.body_b, point) {
                constraint.applied_impulse[point] = impulse.max(0.0);
            }
        }
        if let Some(impulses) = cache.friction_impulses(constraint.body_a, constraint.body_b) {
            let maximum = TangentFriction::compute_maximum_impulse(constraint);
            constraint.friction_impulse = impulses.map(|impulse| impulse.max(-maximum).min(maximum));
        }
    }
}
