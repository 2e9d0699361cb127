use glam::Vec3;

use crate::physics::body_properties::{BodyVelocity, SolverBody};
use crate::physics::constraints::contact::penetration_limit::write_back;
use crate::physics::constraints::contact::{ContactConstraint, PenetrationLimit};
use crate::physics::constraints::{UpdateMode, VelocityStore};
use crate::physics::helpers::Helpers;

/// Angular damping applied to point-like contacts during friction updates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrictionDamping {
    /// Fraction of the angular velocity around the normal removed per update.
    pub angular_damping: f32,
    /// Cosine above which the contact center counts as colinear with the body positions.
    pub colinearity_threshold: f32,
}

impl Default for FrictionDamping {
    fn default() -> Self {
        Self {
            angular_damping: 0.1,
            colinearity_threshold: 0.95,
        }
    }
}

/// Handles the tangent friction implementation.
///
/// Friction acts at the constraint's center along the two tangents of the normal's orthonormal basis. Each tangent
/// impulse is bounded by the friction coefficient times the total accumulated normal impulse.
pub struct TangentFriction;

impl TangentFriction {
    #[inline(always)]
    pub fn compute_tangents(normal: Vec3) -> [Vec3; 2] {
        let (tangent_x, tangent_y) = Helpers::build_orthonormal_basis(normal);
        [tangent_x, tangent_y]
    }

    /// Largest magnitude either tangent impulse may accumulate given the current normal impulses.
    #[inline(always)]
    pub fn compute_maximum_impulse(constraint: &ContactConstraint) -> f32 {
        (constraint.friction * constraint.normal_impulse_sum()).max(0.0)
    }

    /// Point contacts cannot resist spin around the normal; pairs that look like one lose some of it.
    #[inline(always)]
    pub fn needs_angular_damping(
        body_a: &SolverBody,
        body_b: &SolverBody,
        center: Vec3,
        damping: &FrictionDamping,
    ) -> bool {
        if body_a.inverse_mass == 0.0 || body_b.inverse_mass == 0.0 {
            return true;
        }
        let ab = Helpers::safe_normalize(body_b.position - body_a.position);
        let ac = Helpers::safe_normalize(center - body_a.position);
        ab.dot(ac) > damping.colinearity_threshold
    }

    #[inline(always)]
    pub fn damp_angular_velocity(normal: Vec3, angular_damping: f32, velocity: &mut BodyVelocity) {
        let spin = normal.dot(velocity.angular);
        velocity.angular -= normal * (spin * angular_damping);
    }

    /// Applies the accumulated friction impulses of a constraint to its bodies.
    pub fn warm_start<S: VelocityStore + ?Sized>(constraint: &ContactConstraint, store: &mut S) {
        if constraint.friction_impulse == [0.0, 0.0] {
            return;
        }
        let body_a = store.load(constraint.body_a);
        let body_b = store.load(constraint.body_b);
        let mut velocity_a = body_a.velocity;
        let mut velocity_b = body_b.velocity;
        let tangents = Self::compute_tangents(constraint.normal);
        for (i, tangent) in tangents.into_iter().enumerate() {
            let (angular_a, angular_b) = PenetrationLimit::compute_angular_jacobians(
                constraint.center,
                tangent,
                body_a.position,
                body_b.position,
            );
            PenetrationLimit::apply_impulse(
                tangent,
                angular_a,
                angular_b,
                &body_a,
                &body_b,
                constraint.friction_impulse[i],
                &mut velocity_a,
                &mut velocity_b,
            );
        }
        write_back(store, constraint, &body_a, &body_b, velocity_a, velocity_b);
    }

    /// Runs one friction update for both tangents, followed by the angular damping of point-like pairs.
    pub fn solve<S: VelocityStore + ?Sized>(
        constraint: &mut ContactConstraint,
        store: &mut S,
        mode: UpdateMode,
        damping: &FrictionDamping,
    ) {
        if constraint.friction_jac_coeff_inv == [0.0, 0.0] {
            return;
        }
        let body_a = store.load(constraint.body_a);
        let body_b = store.load(constraint.body_b);
        let mut velocity_a = body_a.velocity;
        let mut velocity_b = body_b.velocity;

        let maximum = Self::compute_maximum_impulse(constraint);
        let tangents = Self::compute_tangents(constraint.normal);
        for (i, tangent) in tangents.into_iter().enumerate() {
            let (angular_a, angular_b) = PenetrationLimit::compute_angular_jacobians(
                constraint.center,
                tangent,
                body_a.position,
                body_b.position,
            );
            let (read_a, read_b) = match mode {
                UpdateMode::Sequential => (velocity_a, velocity_b),
                UpdateMode::Jacobi => (body_a.velocity, body_b.velocity),
            };
            let relative_velocity =
                PenetrationLimit::compute_relative_velocity(tangent, angular_a, angular_b, &read_a, &read_b);
            let corrective_impulse = PenetrationLimit::compute_corrective_impulse(
                relative_velocity,
                0.0,
                constraint.friction_jac_coeff_inv[i],
                &mut constraint.friction_impulse[i],
                -maximum,
                maximum,
            );
            PenetrationLimit::apply_impulse(
                tangent,
                angular_a,
                angular_b,
                &body_a,
                &body_b,
                corrective_impulse,
                &mut velocity_a,
                &mut velocity_b,
            );
        }

        if Self::needs_angular_damping(&body_a, &body_b, constraint.center, damping) {
            Self::damp_angular_velocity(constraint.normal, damping.angular_damping, &mut velocity_a);
            Self::damp_angular_velocity(constraint.normal, damping.angular_damping, &mut velocity_b);
        }
        write_back(store, constraint, &body_a, &body_b, velocity_a, velocity_b);
    }
}
