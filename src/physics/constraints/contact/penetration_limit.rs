use glam::Vec3;

use crate::physics::body_properties::{BodyVelocity, SolverBody};
use crate::physics::constraints::contact::ContactConstraint;
use crate::physics::constraints::{UpdateMode, VelocityStore};
use crate::utilities::Symmetric3x3;

/// Non-penetration half of the contact constraint, plus the one-dimensional impulse math shared with friction.
pub struct PenetrationLimit;

impl PenetrationLimit {
    /// Computes the angular jacobians of a constraint along `direction` acting at `point`.
    ///
    /// Returns (offsetA x direction, direction x offsetB); body B's linear jacobian is the negated direction.
    #[inline(always)]
    pub fn compute_angular_jacobians(
        point: Vec3,
        direction: Vec3,
        position_a: Vec3,
        position_b: Vec3,
    ) -> (Vec3, Vec3) {
        let offset_a = point - position_a;
        let offset_b = point - position_b;
        (offset_a.cross(direction), direction.cross(offset_b))
    }

    /// Computes the inverse of the effective mass seen along the jacobians.
    ///
    /// Returns zero when neither body can respond, which disables the row.
    #[inline(always)]
    pub fn compute_jac_coeff_inv(
        direction: Vec3,
        angular_a: Vec3,
        angular_b: Vec3,
        body_a: &SolverBody,
        body_b: &SolverBody,
    ) -> f32 {
        let denominator = direction.length_squared() * (body_a.inverse_mass + body_b.inverse_mass)
            + Symmetric3x3::vector_sandwich(angular_a, &body_a.inverse_inertia)
            + Symmetric3x3::vector_sandwich(angular_b, &body_b.inverse_inertia);
        if denominator > 0.0 {
            1.0 / denominator
        } else {
            0.0
        }
    }

    /// Velocity of A relative to B along the jacobians. Positive values are separating.
    #[inline(always)]
    pub fn compute_relative_velocity(
        direction: Vec3,
        angular_a: Vec3,
        angular_b: Vec3,
        velocity_a: &BodyVelocity,
        velocity_b: &BodyVelocity,
    ) -> f32 {
        direction.dot(velocity_a.linear) + angular_a.dot(velocity_a.angular)
            - direction.dot(velocity_b.linear)
            + angular_b.dot(velocity_b.angular)
    }

    /// Accumulates the impulse that drives the relative velocity to `-bias` and clamps the total into
    /// `[minimum, maximum]`.
    ///
    /// Returns the impulse change which should be applied to the bodies.
    #[inline(always)]
    pub fn compute_corrective_impulse(
        relative_velocity: f32,
        bias: f32,
        jac_coeff_inv: f32,
        accumulated_impulse: &mut f32,
        minimum: f32,
        maximum: f32,
    ) -> f32 {
        let impulse = -(relative_velocity + bias) * jac_coeff_inv;
        let previous_accumulated = *accumulated_impulse;
        *accumulated_impulse = (previous_accumulated + impulse).max(minimum).min(maximum);
        *accumulated_impulse - previous_accumulated
    }

    #[inline(always)]
    pub fn apply_impulse(
        direction: Vec3,
        angular_a: Vec3,
        angular_b: Vec3,
        body_a: &SolverBody,
        body_b: &SolverBody,
        corrective_impulse: f32,
        velocity_a: &mut BodyVelocity,
        velocity_b: &mut BodyVelocity,
    ) {
        velocity_a.linear += direction * (corrective_impulse * body_a.inverse_mass);
        velocity_a.angular +=
            Symmetric3x3::transform(angular_a * corrective_impulse, &body_a.inverse_inertia);
        velocity_b.linear -= direction * (corrective_impulse * body_b.inverse_mass);
        velocity_b.angular +=
            Symmetric3x3::transform(angular_b * corrective_impulse, &body_b.inverse_inertia);
    }

    /// Applies the accumulated normal impulses of a constraint to its bodies.
    pub fn warm_start<S: VelocityStore + ?Sized>(constraint: &ContactConstraint, store: &mut S) {
        let body_a = store.load(constraint.body_a);
        let body_b = store.load(constraint.body_b);
        let mut velocity_a = body_a.velocity;
        let mut velocity_b = body_b.velocity;
        for i in 0..4 {
            if constraint.jac_coeff_inv[i] == 0.0 || constraint.applied_impulse[i] == 0.0 {
                continue;
            }
            let (angular_a, angular_b) = Self::compute_angular_jacobians(
                constraint.world_positions[i],
                constraint.normal,
                body_a.position,
                body_b.position,
            );
            Self::apply_impulse(
                constraint.normal,
                angular_a,
                angular_b,
                &body_a,
                &body_b,
                constraint.applied_impulse[i],
                &mut velocity_a,
                &mut velocity_b,
            );
        }
        write_back(store, constraint, &body_a, &body_b, velocity_a, velocity_b);
    }

    /// Runs one accumulate-clamp-apply update for every contact of the constraint.
    pub fn solve<S: VelocityStore + ?Sized>(
        constraint: &mut ContactConstraint,
        store: &mut S,
        mode: UpdateMode,
    ) {
        let body_a = store.load(constraint.body_a);
        let body_b = store.load(constraint.body_b);
        let mut velocity_a = body_a.velocity;
        let mut velocity_b = body_b.velocity;
        for i in 0..4 {
            let jac_coeff_inv = constraint.jac_coeff_inv[i];
            if jac_coeff_inv == 0.0 {
                continue;
            }
            let (angular_a, angular_b) = Self::compute_angular_jacobians(
                constraint.world_positions[i],
                constraint.normal,
                body_a.position,
                body_b.position,
            );
            let relative_velocity = match mode {
                UpdateMode::Sequential => Self::compute_relative_velocity(
                    constraint.normal,
                    angular_a,
                    angular_b,
                    &velocity_a,
                    &velocity_b,
                ),
                UpdateMode::Jacobi => Self::compute_relative_velocity(
                    constraint.normal,
                    angular_a,
                    angular_b,
                    &body_a.velocity,
                    &body_b.velocity,
                ),
            };
            let corrective_impulse = Self::compute_corrective_impulse(
                relative_velocity,
                constraint.bias[i],
                jac_coeff_inv,
                &mut constraint.applied_impulse[i],
                0.0,
                f32::MAX,
            );
            Self::apply_impulse(
                constraint.normal,
                angular_a,
                angular_b,
                &body_a,
                &body_b,
                corrective_impulse,
                &mut velocity_a,
                &mut velocity_b,
            );
        }
        write_back(store, constraint, &body_a, &body_b, velocity_a, velocity_b);
    }
}

/// Stores the new velocities of whichever bodies the solver is allowed to move.
#[inline(always)]
pub(crate) fn write_back<S: VelocityStore + ?Sized>(
    store: &mut S,
    constraint: &ContactConstraint,
    body_a: &SolverBody,
    body_b: &SolverBody,
    velocity_a: BodyVelocity,
    velocity_b: BodyVelocity,
) {
    if body_a.dynamic {
        store.store(constraint.body_a, velocity_a);
    }
    if body_b.dynamic {
        store.store(constraint.body_b, velocity_b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn body(position: Vec3, inverse_mass: f32) -> SolverBody {
        SolverBody {
            position,
            inverse_mass,
            inverse_inertia: Symmetric3x3::scale(&Symmetric3x3::IDENTITY, inverse_mass),
            dynamic: inverse_mass != 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_corrective_impulse_never_goes_negative() {
        let mut accumulated = 0.5;
        // Separating fast: the raw impulse would pull.
        let change = PenetrationLimit::compute_corrective_impulse(10.0, 0.0, 1.0, &mut accumulated, 0.0, f32::MAX);
        assert_eq!(accumulated, 0.0);
        assert_eq!(change, -0.5);
    }

    #[test]
    fn test_corrective_impulse_respects_maximum() {
        let mut accumulated = 0.0;
        let change = PenetrationLimit::compute_corrective_impulse(-10.0, 0.0, 1.0, &mut accumulated, -2.0, 2.0);
        assert_eq!(accumulated, 2.0);
        assert_eq!(change, 2.0);
    }

    #[test]
    fn test_jac_coeff_inv_of_two_static_bodies_is_zero() {
        let a = body(Vec3::ZERO, 0.0);
        let b = body(Vec3::Y, 0.0);
        let (angular_a, angular_b) =
            PenetrationLimit::compute_angular_jacobians(Vec3::new(0.2, 0.5, 0.0), Vec3::Y, a.position, b.position);
        assert_eq!(
            PenetrationLimit::compute_jac_coeff_inv(Vec3::Y, angular_a, angular_b, &a, &b),
            0.0
        );
    }

    #[test]
    fn test_apply_impulse_conserves_linear_momentum() {
        let a = body(Vec3::new(0.0, 1.0, 0.0), 1.0);
        let b = body(Vec3::new(0.3, 0.0, 0.0), 0.5);
        let point = Vec3::new(0.1, 0.5, 0.2);
        let (angular_a, angular_b) = PenetrationLimit::compute_angular_jacobians(point, Vec3::Y, a.position, b.position);
        let mut velocity_a = BodyVelocity::ZERO;
        let mut velocity_b = BodyVelocity::ZERO;
        PenetrationLimit::apply_impulse(Vec3::Y, angular_a, angular_b, &a, &b, 2.0, &mut velocity_a, &mut velocity_b);
        let momentum = velocity_a.linear / a.inverse_mass + velocity_b.linear / b.inverse_mass;
        assert_relative_eq!(momentum.length(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(velocity_a.linear.y, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_stops_approach_against_static_body() {
        let mut bodies = vec![body(Vec3::new(0.0, 0.5, 0.0), 1.0), body(Vec3::ZERO, 0.0)];
        bodies[0].velocity.linear = Vec3::new(0.0, -2.0, 0.0);
        let a = bodies[0];
        let b = bodies[1];
        let point = Vec3::ZERO;
        let (angular_a, angular_b) = PenetrationLimit::compute_angular_jacobians(point, Vec3::Y, a.position, b.position);
        let mut constraint = ContactConstraint {
            normal: Vec3::Y,
            body_a: 0,
            body_b: 1,
            point_count: 1,
            ..Default::default()
        };
        constraint.jac_coeff_inv[0] = PenetrationLimit::compute_jac_coeff_inv(Vec3::Y, angular_a, angular_b, &a, &b);
        PenetrationLimit::solve(&mut constraint, bodies.as_mut_slice(), UpdateMode::Sequential);
        assert_relative_eq!(bodies[0].velocity.linear.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(constraint.applied_impulse[0], 2.0, epsilon = 1e-6);
        assert_eq!(bodies[1].velocity, BodyVelocity::ZERO);
    }

    #[test]
    fn test_jacobi_reads_start_velocities() {
        // Two identical contacts: Gauss-Seidel resolves the approach with the first one, Jacobi applies both and
        // overshoots into separation.
        let mut sequential = vec![body(Vec3::new(0.0, 0.5, 0.0), 1.0), body(Vec3::ZERO, 0.0)];
        sequential[0].velocity.linear = Vec3::new(0.0, -1.0, 0.0);
        let mut jacobi = sequential.clone();
        let mut constraint = ContactConstraint {
            normal: Vec3::Y,
            body_a: 0,
            body_b: 1,
            point_count: 2,
            jac_coeff_inv: [1.0, 1.0, 0.0, 0.0],
            ..Default::default()
        };
        let mut jacobi_constraint = constraint;

        PenetrationLimit::solve(&mut constraint, sequential.as_mut_slice(), UpdateMode::Sequential);
        PenetrationLimit::solve(&mut jacobi_constraint, jacobi.as_mut_slice(), UpdateMode::Jacobi);

        assert_relative_eq!(sequential[0].velocity.linear.y, 0.0, epsilon = 1e-6);
        assert_eq!(constraint.applied_impulse, [1.0, 0.0, 0.0, 0.0]);
        assert_relative_eq!(jacobi[0].velocity.linear.y, 1.0, epsilon = 1e-6);
        assert_eq!(jacobi_constraint.applied_impulse, [1.0, 1.0, 0.0, 0.0]);
    }
}
