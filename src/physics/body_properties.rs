use core::ops::{Add, AddAssign, Sub};
use glam::Vec3;

use crate::physics::errors::SolverError;
use crate::utilities::Symmetric3x3;

/// Linear and angular velocity of a body.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyVelocity {
    /// Linear velocity associated with the body.
    pub linear: Vec3,
    /// Angular velocity associated with the body.
    pub angular: Vec3,
}

impl BodyVelocity {
    pub const ZERO: Self = Self {
        linear: Vec3::ZERO,
        angular: Vec3::ZERO,
    };

    /// Constructs a new velocity from linear and angular components.
    #[inline(always)]
    pub const fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }

    #[inline(always)]
    pub fn is_finite(&self) -> bool {
        self.linear.is_finite() && self.angular.is_finite()
    }
}

impl Add for BodyVelocity {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.linear + rhs.linear, self.angular + rhs.angular)
    }
}

impl AddAssign for BodyVelocity {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        self.linear += rhs.linear;
        self.angular += rhs.angular;
    }
}

impl Sub for BodyVelocity {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.linear - rhs.linear, self.angular - rhs.angular)
    }
}

/// Body state the solver reads and writes. Owned by the caller.
///
/// An inverse mass of zero marks the body as static or kinematic; the solver never writes its velocity.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RigidBody {
    pub position: Vec3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub inverse_mass: f32,
}

impl RigidBody {
    /// Creates a body at rest.
    #[inline(always)]
    pub fn new(position: Vec3, inverse_mass: f32) -> Self {
        Self {
            position,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            inverse_mass,
        }
    }

    /// Creates an immovable body at rest.
    #[inline(always)]
    pub fn new_static(position: Vec3) -> Self {
        Self::new(position, 0.0)
    }

    #[inline(always)]
    pub fn with_linear_velocity(mut self, linear_velocity: Vec3) -> Self {
        self.linear_velocity = linear_velocity;
        self
    }

    #[inline(always)]
    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    #[inline(always)]
    pub fn velocity(&self) -> BodyVelocity {
        BodyVelocity::new(self.linear_velocity, self.angular_velocity)
    }

    #[inline(always)]
    pub fn set_velocity(&mut self, velocity: BodyVelocity) {
        self.linear_velocity = velocity.linear;
        self.angular_velocity = velocity.angular;
    }
}

/// Stores the inertia for a body.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyInertia {
    /// Inverse of the body's inertia tensor, expressed in world space.
    pub inverse_inertia_tensor: Symmetric3x3,
}

impl BodyInertia {
    /// Inertia of a body that cannot rotate in response to impulses.
    pub const STATIC: Self = Self {
        inverse_inertia_tensor: Symmetric3x3::ZERO,
    };

    #[inline(always)]
    pub fn new(inverse_inertia_tensor: Symmetric3x3) -> Self {
        Self {
            inverse_inertia_tensor,
        }
    }

    /// Computes the world space inverse inertia of an axis aligned solid box.
    pub fn solid_box(mass: f32, half_extents: Vec3) -> Self {
        let extents = half_extents * 2.0;
        let squared = extents * extents;
        let inertia = Vec3::new(
            squared.y + squared.z,
            squared.x + squared.z,
            squared.x + squared.y,
        ) * (mass / 12.0);
        Self::new(Symmetric3x3::from_diagonal(inertia.recip()))
    }

    /// Computes the inverse inertia of a solid sphere.
    pub fn solid_sphere(mass: f32, radius: f32) -> Self {
        let inertia = 0.4 * mass * radius * radius;
        Self::new(Symmetric3x3::from_diagonal(Vec3::splat(1.0 / inertia)))
    }
}

/// Per-solve working copy of a body, combining the caller's state with the world inertia.
///
/// Bodies which the solver must not move have their inverse mass and inertia zeroed here, so the impulse math can stay
/// branch free.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolverBody {
    pub position: Vec3,
    pub velocity: BodyVelocity,
    pub inverse_mass: f32,
    pub inverse_inertia: Symmetric3x3,
    /// True if the solver may write this body's velocity.
    pub dynamic: bool,
}

impl SolverBody {
    /// Builds the solver's working copies of the caller's bodies.
    ///
    /// A body is dynamic when its inverse mass is nonzero and its index is not `static_body_index`.
    pub fn gather(
        bodies: &[RigidBody],
        inertias: &[BodyInertia],
        static_body_index: Option<u32>,
    ) -> Result<Vec<SolverBody>, SolverError> {
        if bodies.len() != inertias.len() {
            return Err(SolverError::InertiaCountMismatch {
                body_count: bodies.len(),
                inertia_count: inertias.len(),
            });
        }
        Ok(bodies
            .iter()
            .zip(inertias)
            .enumerate()
            .map(|(index, (body, inertia))| {
                let dynamic =
                    body.inverse_mass != 0.0 && static_body_index != Some(index as u32);
                if dynamic {
                    SolverBody {
                        position: body.position,
                        velocity: body.velocity(),
                        inverse_mass: body.inverse_mass,
                        inverse_inertia: inertia.inverse_inertia_tensor,
                        dynamic,
                    }
                } else {
                    SolverBody {
                        position: body.position,
                        velocity: body.velocity(),
                        inverse_mass: 0.0,
                        inverse_inertia: Symmetric3x3::ZERO,
                        dynamic,
                    }
                }
            })
            .collect())
    }

    /// Writes solved velocities back into the caller's bodies. Only dynamic bodies are touched.
    pub fn scatter(states: &[SolverBody], bodies: &mut [RigidBody]) {
        for (state, body) in states.iter().zip(bodies.iter_mut()) {
            if state.dynamic {
                body.set_velocity(state.velocity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_marks_static_bodies() {
        let bodies = [
            RigidBody::new(Vec3::ZERO, 1.0),
            RigidBody::new_static(Vec3::X),
            RigidBody::new(Vec3::Y, 2.0),
        ];
        let inertias = [BodyInertia::solid_sphere(1.0, 0.5); 3];
        let states = SolverBody::gather(&bodies, &inertias, Some(2)).unwrap();
        assert!(states[0].dynamic);
        assert!(!states[1].dynamic);
        assert!(!states[2].dynamic);
        assert_eq!(states[2].inverse_mass, 0.0);
        assert_eq!(states[2].inverse_inertia, Symmetric3x3::ZERO);
    }

    #[test]
    fn test_gather_rejects_inertia_mismatch() {
        let bodies = [RigidBody::new(Vec3::ZERO, 1.0)];
        let result = SolverBody::gather(&bodies, &[], None);
        assert_eq!(
            result,
            Err(SolverError::InertiaCountMismatch {
                body_count: 1,
                inertia_count: 0
            })
        );
    }

    #[test]
    fn test_scatter_skips_static_bodies() {
        let mut bodies = [
            RigidBody::new(Vec3::ZERO, 1.0),
            RigidBody::new_static(Vec3::X).with_linear_velocity(Vec3::Y),
        ];
        let inertias = [BodyInertia::STATIC; 2];
        let mut states = SolverBody::gather(&bodies, &inertias, None).unwrap();
        for state in states.iter_mut() {
            state.velocity.linear = Vec3::new(5.0, 0.0, 0.0);
        }
        SolverBody::scatter(&states, &mut bodies);
        assert_eq!(bodies[0].linear_velocity, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(bodies[1].linear_velocity, Vec3::Y);
    }

    #[test]
    fn test_solid_box_inertia() {
        let inertia = BodyInertia::solid_box(12.0, Vec3::splat(0.5));
        // I = m/12 * (1 + 1) = 2 on every axis.
        assert!((inertia.inverse_inertia_tensor.xx - 0.5).abs() < 1e-6);
        assert!((inertia.inverse_inertia_tensor.zz - 0.5).abs() < 1e-6);
    }
}
