use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

use super::vector::Vec3;

/// A position in 3D world space (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3d {
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Widen a single-precision host vertex.
    pub fn from_f32(x: f32, y: f32, z: f32) -> Self {
        Self::new(f64::from(x), f64::from(y), f64::from(z))
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        self.distance_squared_to(other).sqrt()
    }

    pub fn distance_squared_to(&self, other: &Self) -> f64 {
        (*self - *other).length_squared()
    }

    /// Coordinate by axis index (0 = x, 1 = y, 2 = z).
    pub fn axis(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }
}

impl Add<Vec3> for Point3d {
    type Output = Point3d;
    fn add(self, rhs: Vec3) -> Self::Output {
        Point3d::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3d {
    type Output = Vec3;
    fn sub(self, rhs: Self) -> Self::Output {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// A point on the ground plane (footprint coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2d {
    pub x: f64,
    pub y: f64,
}

impl Point2d {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Lift onto the `z = 0` plane.
    pub fn to_3d(&self) -> Point3d {
        Point3d::new(self.x, self.y, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_and_squared_agree() {
        let a = Point3d::new(1.0, 2.0, 2.0);
        assert!((Point3d::ORIGIN.distance_to(&a) - 3.0).abs() < 1e-12);
        assert!((Point3d::ORIGIN.distance_squared_to(&a) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_vector_arithmetic() {
        let p = Point3d::new(1.0, 1.0, 1.0) + Vec3::new(0.5, -1.0, 2.0);
        assert_eq!(p, Point3d::new(1.5, 0.0, 3.0));
        let v = p - Point3d::new(1.5, 0.0, 0.0);
        assert_eq!(v, Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn test_from_f32_and_axis() {
        let p = Point3d::from_f32(1.5, -2.0, 4.25);
        assert_eq!(p.axis(0), 1.5);
        assert_eq!(p.axis(1), -2.0);
        assert_eq!(p.axis(2), 4.25);
    }
}
