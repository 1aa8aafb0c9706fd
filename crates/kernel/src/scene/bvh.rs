//! Bounding-volume hierarchy over a triangle soup.

use tracing::{debug, instrument};

use super::{Intersectable, SceneError};
use crate::geometry::intersection::{ray_aabb, ray_triangle};
use crate::geometry::{BoundingBox, Point3d, Ray, RayHit, Vec3};
use crate::mesh::TriangleBuffer;

/// Node bounds are inflated by this much so that hits on a box face are not
/// lost to rounding in the slab test.
const BOUNDS_PADDING: f64 = 1e-7;

#[derive(Debug, Clone)]
enum BvhNode {
    Leaf {
        bounds: BoundingBox,
        start: usize,
        count: usize,
    },
    Interior {
        bounds: BoundingBox,
        left: usize,
        right: usize,
    },
}

impl BvhNode {
    fn bounds(&self) -> &BoundingBox {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Interior { bounds, .. } => bounds,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BuildItem {
    triangle: usize,
    centroid: Point3d,
}

/// Binary BVH with median splits along the longest centroid axis.
/// Triangles are stored reordered so every leaf owns a contiguous run.
#[derive(Debug, Clone)]
pub struct BvhScene {
    nodes: Vec<BvhNode>,
    triangles: Vec<[Point3d; 3]>,
}

impl BvhScene {
    #[instrument(skip(mesh), fields(triangles = mesh.triangle_count()))]
    pub fn build(mesh: &TriangleBuffer, leaf_size: usize) -> Result<Self, SceneError> {
        if leaf_size == 0 {
            return Err(SceneError::InvalidLeafSize);
        }
        let source: Vec<[Point3d; 3]> = mesh.triangles().collect();
        let mut items: Vec<BuildItem> = source
            .iter()
            .enumerate()
            .map(|(triangle, [a, b, c])| BuildItem {
                triangle,
                centroid: Point3d::new(
                    (a.x + b.x + c.x) / 3.0,
                    (a.y + b.y + c.y) / 3.0,
                    (a.z + b.z + c.z) / 3.0,
                ),
            })
            .collect();

        let mut nodes = Vec::new();
        if !items.is_empty() {
            build_node(&mut nodes, &source, &mut items, 0, leaf_size);
        }
        let triangles = items.iter().map(|item| source[item.triangle]).collect();

        debug!(nodes = nodes.len(), "BVH built");
        Ok(Self { nodes, triangles })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        self.nodes.first().map(|n| *n.bounds())
    }
}

fn padded_bounds(source: &[[Point3d; 3]], items: &[BuildItem]) -> BoundingBox {
    let mut bb = BoundingBox::empty();
    for item in items {
        for p in &source[item.triangle] {
            bb.expand_to_include(p);
        }
    }
    let pad = Vec3::new(BOUNDS_PADDING, BOUNDS_PADDING, BOUNDS_PADDING);
    BoundingBox::new(bb.min + -pad, bb.max + pad)
}

/// Recursively build the subtree over `items`, whose first triangle sits at
/// `offset` in the final triangle order. Returns the node index.
fn build_node(
    nodes: &mut Vec<BvhNode>,
    source: &[[Point3d; 3]],
    items: &mut [BuildItem],
    offset: usize,
    leaf_size: usize,
) -> usize {
    let bounds = padded_bounds(source, items);
    let index = nodes.len();

    if items.len() <= leaf_size {
        nodes.push(BvhNode::Leaf {
            bounds,
            start: offset,
            count: items.len(),
        });
        return index;
    }

    let centroids: Vec<Point3d> = items.iter().map(|i| i.centroid).collect();
    let axis = BoundingBox::from_points(&centroids).longest_axis();
    let mid = items.len() / 2;
    items.select_nth_unstable_by(mid, |a, b| a.centroid.axis(axis).total_cmp(&b.centroid.axis(axis)));

    // Reserve the slot; children are appended after it.
    nodes.push(BvhNode::Leaf {
        bounds,
        start: offset,
        count: 0,
    });
    let (lo, hi) = items.split_at_mut(mid);
    let left = build_node(nodes, source, lo, offset, leaf_size);
    let right = build_node(nodes, source, hi, offset + mid, leaf_size);
    nodes[index] = BvhNode::Interior { bounds, left, right };
    index
}

impl Intersectable for BvhScene {
    fn intersect(&self, ray: &Ray) -> Option<RayHit> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut best: Option<RayHit> = None;
        let mut stack = vec![0usize];

        while let Some(i) = stack.pop() {
            let node = &self.nodes[i];
            let Some(entry) = ray_aabb(ray, node.bounds()) else {
                continue;
            };
            if best.is_some_and(|b| entry > b.distance) {
                continue;
            }
            match node {
                BvhNode::Leaf { start, count, .. } => {
                    for tri in &self.triangles[*start..*start + *count] {
                        if let Some(hit) = ray_triangle(ray, tri) {
                            if best.map_or(true, |b| hit.distance < b.distance) {
                                best = Some(hit);
                            }
                        }
                    }
                }
                BvhNode::Interior { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }
        best
    }
}
