use super::Intersectable;
use crate::geometry::intersection::ray_triangle;
use crate::geometry::{Point3d, Ray, RayHit};
use crate::mesh::TriangleBuffer;

/// Brute-force scene: every query tests every triangle.
#[derive(Debug, Clone, Default)]
pub struct LinearScene {
    triangles: Vec<[Point3d; 3]>,
}

impl LinearScene {
    pub fn new(mesh: &TriangleBuffer) -> Self {
        Self {
            triangles: mesh.triangles().collect(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

impl Intersectable for LinearScene {
    fn intersect(&self, ray: &Ray) -> Option<RayHit> {
        self.triangles
            .iter()
            .filter_map(|tri| ray_triangle(ray, tri))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}
