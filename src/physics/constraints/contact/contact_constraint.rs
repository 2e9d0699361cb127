use glam::Vec3;

use crate::physics::body_properties::SolverBody;

/// Solver representation of up to four contacts between one body pair.
///
/// Bodies are referenced by index into the caller's body array; the indices are validated once during conversion.
/// Unused contacts carry a zero `jac_coeff_inv` and are skipped by every solve pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContactConstraint {
    /// World space position of each contact.
    pub world_positions: [Vec3; 4],
    /// Shared contact normal, pointing from body B to body A.
    pub normal: Vec3,
    /// Mean of the used contact positions. Friction acts here.
    pub center: Vec3,
    /// Inverse of the effective mass seen along the normal at each contact. Zero for unused contacts.
    pub jac_coeff_inv: [f32; 4],
    /// Velocity bias from restitution and penetration stabilization at each contact.
    pub bias: [f32; 4],
    /// Accumulated normal impulse at each contact. Never negative.
    pub applied_impulse: [f32; 4],
    /// Inverse effective mass along the two friction tangents at the center.
    pub friction_jac_coeff_inv: [f32; 2],
    /// Accumulated impulse along the two friction tangents.
    pub friction_impulse: [f32; 2],
    pub friction: f32,
    pub body_a: u32,
    pub body_b: u32,
    /// Spatial cell the constraint was scheduled into.
    pub cell: u32,
    /// Batch within the cell. Equal to the cell's batch limit for sequential fallback constraints.
    pub batch: u32,
    /// Index of the manifold this constraint was converted from.
    pub manifold_index: u32,
    pub point_count: u32,
}

impl ContactConstraint {
    /// Sum of the accumulated normal impulses over every contact.
    #[inline(always)]
    pub fn normal_impulse_sum(&self) -> f32 {
        self.applied_impulse.iter().sum()
    }

    /// Gets the referenced bodies the solver is allowed to write.
    pub fn dynamic_bodies<'a>(&'a self, bodies: &'a [SolverBody]) -> impl Iterator<Item = u32> + 'a {
        [self.body_a, self.body_b]
            .into_iter()
            .filter(move |&index| bodies[index as usize].dynamic)
    }
}
