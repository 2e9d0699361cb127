use core::ops::{Add, Mul, Sub};
use glam::{Mat3, Vec3};

/// Lower left triangle (including diagonal) of a symmetric 3x3 matrix.
///
/// Inverse inertia tensors are always symmetric, so the solver stores them in this packed form.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Symmetric3x3 {
    /// First row, first column of the matrix.
    pub xx: f32,
    /// Second row, first column of the matrix.
    pub yx: f32,
    /// Second row, second column of the matrix.
    pub yy: f32,
    /// Third row, first column of the matrix.
    pub zx: f32,
    /// Third row, second column of the matrix.
    pub zy: f32,
    /// Third row, third column of the matrix.
    pub zz: f32,
}

impl Symmetric3x3 {
    /// The all-zero matrix. Used as the inverse inertia of static and kinematic bodies.
    pub const ZERO: Self = Self {
        xx: 0.0,
        yx: 0.0,
        yy: 0.0,
        zx: 0.0,
        zy: 0.0,
        zz: 0.0,
    };

    /// The identity matrix.
    pub const IDENTITY: Self = Self {
        xx: 1.0,
        yx: 0.0,
        yy: 1.0,
        zx: 0.0,
        zy: 0.0,
        zz: 1.0,
    };

    /// Creates a diagonal matrix.
    #[inline(always)]
    pub const fn from_diagonal(diagonal: Vec3) -> Self {
        Self {
            xx: diagonal.x,
            yx: 0.0,
            yy: diagonal.y,
            zx: 0.0,
            zy: 0.0,
            zz: diagonal.z,
        }
    }

    /// Expands the packed triangle into a full matrix.
    pub fn to_mat3(&self) -> Mat3 {
        Mat3::from_cols(
            Vec3::new(self.xx, self.yx, self.zx),
            Vec3::new(self.yx, self.yy, self.zy),
            Vec3::new(self.zx, self.zy, self.zz),
        )
    }

    #[inline(always)]
    pub fn scale(m: &Self, scale: f32) -> Self {
        Self {
            xx: m.xx * scale,
            yx: m.yx * scale,
            yy: m.yy * scale,
            zx: m.zx * scale,
            zy: m.zy * scale,
            zz: m.zz * scale,
        }
    }

    /// Transforms a vector by a symmetric matrix.
    #[inline(always)]
    pub fn transform(v: Vec3, m: &Self) -> Vec3 {
        Vec3::new(
            v.x * m.xx + v.y * m.yx + v.z * m.zx,
            v.x * m.yx + v.y * m.yy + v.z * m.zy,
            v.x * m.zx + v.y * m.zy + v.z * m.zz,
        )
    }

    /// Computes v * m * vT for a row vector v and a symmetric matrix m.
    #[inline(always)]
    pub fn vector_sandwich(v: Vec3, m: &Self) -> f32 {
        let x = v.x * m.xx + v.y * m.yx + v.z * m.zx;
        let y = v.x * m.yx + v.y * m.yy + v.z * m.zy;
        let z = v.x * m.zx + v.y * m.zy + v.z * m.zz;
        x * v.x + y * v.y + z * v.z
    }

    /// Returns true if every stored element is finite.
    pub fn is_finite(&self) -> bool {
        self.xx.is_finite()
            && self.yx.is_finite()
            && self.yy.is_finite()
            && self.zx.is_finite()
            && self.zy.is_finite()
            && self.zz.is_finite()
    }
}

impl Add for Symmetric3x3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            xx: self.xx + rhs.xx,
            yx: self.yx + rhs.yx,
            yy: self.yy + rhs.yy,
            zx: self.zx + rhs.zx,
            zy: self.zy + rhs.zy,
            zz: self.zz + rhs.zz,
        }
    }
}

impl Sub for Symmetric3x3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            xx: self.xx - rhs.xx,
            yx: self.yx - rhs.yx,
            yy: self.yy - rhs.yy,
            zx: self.zx - rhs.zx,
            zy: self.zy - rhs.zy,
            zz: self.zz - rhs.zz,
        }
    }
}

impl Mul<f32> for Symmetric3x3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::scale(&self, rhs)
    }
}

impl Mul<Vec3> for Symmetric3x3 {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Vec3 {
        Self::transform(rhs, &self)
    }
}
