use glam::Vec3;

/// Contact data between two bodies sharing one surface basis, as produced by collision detection.
///
/// Up to [`ContactManifold::MAX_POINTS`] points are supported. The manifold is consumed by conversion and can be
/// discarded afterwards.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContactManifold {
    /// Index of body A in the body array.
    pub body_a: u32,
    /// Index of body B in the body array.
    pub body_b: u32,
    /// Surface basis of the manifold. Points from body B to body A and must be unit length.
    pub normal: Vec3,
    /// World space contact positions. Only the first `point_count` entries are meaningful.
    pub points: [Vec3; 4],
    /// Penetration depth at each contact. Negative values represent separation.
    pub depths: [f32; 4],
    /// Number of contacts in the manifold.
    pub point_count: usize,
    /// Coulomb friction coefficient of the pair.
    pub friction: f32,
    /// Restitution coefficient of the pair.
    pub restitution: f32,
}

impl ContactManifold {
    pub const MAX_POINTS: usize = 4;

    /// Creates a manifold without contacts. Friction and restitution start at zero.
    pub fn new(body_a: u32, body_b: u32, normal: Vec3) -> Self {
        Self {
            body_a,
            body_b,
            normal,
            points: [Vec3::ZERO; 4],
            depths: [0.0; 4],
            point_count: 0,
            friction: 0.0,
            restitution: 0.0,
        }
    }

    /// Appends a contact. Returns false if the manifold is already full.
    pub fn add_point(&mut self, position: Vec3, depth: f32) -> bool {
        if self.point_count >= Self::MAX_POINTS {
            return false;
        }
        self.points[self.point_count] = position;
        self.depths[self.point_count] = depth;
        self.point_count += 1;
        true
    }

    pub fn with_point(mut self, position: Vec3, depth: f32) -> Self {
        let added = self.add_point(position, depth);
        debug_assert!(added, "A manifold holds at most four contacts.");
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Gets the contacts of the manifold as (position, depth) pairs.
    pub fn contacts(&self) -> impl Iterator<Item = (Vec3, f32)> + '_ {
        let count = self.point_count.min(Self::MAX_POINTS);
        self.points[..count]
            .iter()
            .copied()
            .zip(self.depths[..count].iter().copied())
    }

    /// Mean of the manifold's contact positions, or `None` for an empty manifold.
    pub fn center(&self) -> Option<Vec3> {
        let count = self.point_count.min(Self::MAX_POINTS);
        if count == 0 {
            return None;
        }
        let sum: Vec3 = self.points[..count].iter().copied().sum();
        Some(sum / count as f32)
    }
}
