//! Flat triangle-vertex buffers as delivered by the host.

use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Point3d};

/// Triangle soup: sequential `x, y, z` triples, three vertices per triangle,
/// no shared index buffer. Trailing values that do not complete a triangle
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleBuffer {
    pub positions: Vec<f32>,
}

impl TriangleBuffer {
    pub fn new(positions: Vec<f32>) -> Self {
        Self { positions }
    }

    /// Concatenate several host chunks into one buffer.
    pub fn flatten<I>(chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<[f32]>,
    {
        let mut positions = Vec::new();
        for chunk in chunks {
            positions.extend_from_slice(chunk.as_ref());
        }
        Self { positions }
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 9
    }

    pub fn is_empty(&self) -> bool {
        self.triangle_count() == 0
    }

    pub fn triangle(&self, index: usize) -> [Point3d; 3] {
        let p = &self.positions[index * 9..index * 9 + 9];
        [
            Point3d::from_f32(p[0], p[1], p[2]),
            Point3d::from_f32(p[3], p[4], p[5]),
            Point3d::from_f32(p[6], p[7], p[8]),
        ]
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Point3d; 3]> + '_ {
        (0..self.triangle_count()).map(move |i| self.triangle(i))
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bb = BoundingBox::empty();
        for tri in self.triangles() {
            for p in &tri {
                bb.expand_to_include(p);
            }
        }
        bb
    }

    /// Append a triangle. Used by tests and fixtures.
    pub fn push_triangle(&mut self, tri: [Point3d; 3]) {
        for p in tri {
            self.positions.push(p.x as f32);
            self.positions.push(p.y as f32);
            self.positions.push(p.z as f32);
        }
    }

    /// Append an axis-aligned quad as two triangles, corners in winding order.
    pub fn push_quad(&mut self, corners: [Point3d; 4]) {
        self.push_triangle([corners[0], corners[1], corners[2]]);
        self.push_triangle([corners[0], corners[2], corners[3]]);
    }

    pub fn extend(&mut self, other: &TriangleBuffer) {
        self.positions.extend_from_slice(&other.positions);
    }
}
