use super::point::Point3d;
use super::vector::Vec3;

/// A half-line with a unit-length direction. Hit distances along it are
/// world-space distances from the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3d,
    pub direction: Vec3,
}

impl Ray {
    /// Build a ray, normalizing `direction`. Returns `None` for a zero direction.
    pub fn new(origin: Point3d, direction: Vec3) -> Option<Self> {
        direction.normalized().map(|direction| Self { origin, direction })
    }

    pub fn at(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }
}
