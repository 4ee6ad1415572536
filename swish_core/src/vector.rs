//! Small 3-vector used by the filter, detector and scorer.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn from_array(a: [f32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    #[inline]
    pub fn magnitude_squared(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn magnitude(self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).magnitude()
    }

    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Unit vector in the same direction; the zero vector (or anything
    /// non-finite) normalizes to zero rather than NaN.
    pub fn normalized(self) -> Self {
        let m = self.magnitude();
        if m.is_finite() && m > f32::EPSILON {
            self / m
        } else {
            Self::ZERO
        }
    }

    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from(a: [f32; 3]) -> Self {
        Self::from_array(a)
    }
}

impl From<Vector3> for [f32; 3] {
    fn from(v: Vector3) -> Self {
        v.to_array()
    }
}

impl Add for Vector3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vector3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vector3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vector3 {
    type Output = Self;
    fn mul(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }
}

impl Div<f32> for Vector3 {
    type Output = Self;
    fn div(self, k: f32) -> Self {
        Self::new(self.x / k, self.y / k, self.z / k)
    }
}

impl Neg for Vector3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Uniform index-based resampling with linear interpolation.
///
/// Output has exactly `n` points; the first and last input points are kept.
/// A single-point input is repeated, an empty input yields zeros.
pub fn resample(points: &[Vector3], n: usize) -> Vec<Vector3> {
    match (points.len(), n) {
        (_, 0) => Vec::new(),
        (0, _) => vec![Vector3::ZERO; n],
        (1, _) => vec![points[0]; n],
        (_, 1) => vec![points[0]],
        (len, _) => {
            let last = (len - 1) as f32;
            let denom = (n - 1) as f32;
            (0..n)
                .map(|i| {
                    let pos = i as f32 * last / denom;
                    let lo = (pos.floor() as usize).min(len - 1);
                    let hi = (lo + 1).min(len - 1);
                    points[lo].lerp(points[hi], pos - lo as f32)
                })
                .collect()
        }
    }
}

/// Mean point-wise distance between two equal-length paths.
pub fn mean_distance(a: &[Vector3], b: &[Vector3]) -> f32 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let total: f64 = a
        .iter()
        .zip(b)
        .map(|(p, q)| f64::from(p.distance(*q)))
        .sum();
    (total / n as f64) as f32
}
