use glam::Vec3;

/// Shared miscellaneous helper functions.
pub struct Helpers;

impl Helpers {
    /// Builds an orthonormal basis perpendicular to a unit length normal.
    ///
    /// Returns the two tangent directions. The same normal always produces the same tangents, so the converter and the
    /// friction phase agree on the basis without storing it.
    #[inline(always)]
    pub fn build_orthonormal_basis(normal: Vec3) -> (Vec3, Vec3) {
        let sign = if normal.z < 0.0 { -1.0f32 } else { 1.0f32 };

        // This has a discontinuity at z==0. Raw frisvad has only one discontinuity,
        // though that region is more unpredictable than the revised version.
        let scale = -1.0 / (sign + normal.z);
        let t1 = Vec3::new(
            normal.x * normal.y * scale,
            sign + normal.y * normal.y * scale,
            -normal.y,
        );
        let t2 = Vec3::new(
            1.0 + sign * normal.x * normal.x * scale,
            sign * t1.x,
            -sign * normal.x,
        );
        (t1, t2)
    }

    /// Normalizes the vector, or returns zero for vectors too short to normalize.
    #[inline(always)]
    pub fn safe_normalize(v: Vec3) -> Vec3 {
        v.normalize_or_zero()
    }
}
