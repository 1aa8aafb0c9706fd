use rand::Rng;
use tracing::{debug, info, instrument};

use super::{MeasurementPoint, SamplingError};
use crate::geometry::intersection::{triangle_area, triangle_normal};
use crate::geometry::{Point3d, Vec3};
use crate::mesh::TriangleBuffer;
use crate::spatial_hash::SpatialHashIndex;

/// Area-weighted uniform sampler over the surface of a triangle soup.
#[derive(Debug, Clone)]
pub struct SurfaceSampler {
    triangles: Vec<([Point3d; 3], Vec3)>,
    /// Running sum of triangle areas, parallel to `triangles`.
    cumulative: Vec<f64>,
}

impl SurfaceSampler {
    /// Build the sampler. Returns `None` when the mesh has no surface area.
    pub fn new(mesh: &TriangleBuffer) -> Option<Self> {
        let mut triangles = Vec::with_capacity(mesh.triangle_count());
        let mut cumulative = Vec::with_capacity(mesh.triangle_count());
        let mut total = 0.0;
        for tri in mesh.triangles() {
            let area = triangle_area(&tri);
            if area <= 0.0 {
                continue;
            }
            let Some(normal) = triangle_normal(&tri) else {
                continue;
            };
            total += area;
            triangles.push((tri, normal));
            cumulative.push(total);
        }
        if triangles.is_empty() {
            None
        } else {
            Some(Self {
                triangles,
                cumulative,
            })
        }
    }

    pub fn total_area(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Draw one point, uniformly distributed over the surface area.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> MeasurementPoint {
        let r = rng.random::<f64>() * self.total_area();
        let index = self
            .cumulative
            .partition_point(|&c| c <= r)
            .min(self.triangles.len() - 1);
        let ([a, b, c], normal) = self.triangles[index];

        let mut u = rng.random::<f64>();
        let mut v = rng.random::<f64>();
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        MeasurementPoint::new(a + (b - a) * u + (c - a) * v, normal)
    }
}

/// Poisson-disk sampling by dart throwing over the mesh surface.
///
/// Accepted points are at least `min_distance` apart. The sample count is
/// capped at `ceil(aabb_volume / min_distance^3)`, so a perfectly flat mesh
/// yields only its seed point. Returns an empty set for a mesh without
/// surface area.
#[instrument(skip(mesh, rng), fields(triangles = mesh.triangle_count()))]
pub fn poisson_disk_sample<R: Rng>(
    mesh: &TriangleBuffer,
    min_distance: f64,
    max_attempts: u32,
    rng: &mut R,
) -> Result<Vec<MeasurementPoint>, SamplingError> {
    let mut index = SpatialHashIndex::for_min_distance(min_distance)?;
    let Some(sampler) = SurfaceSampler::new(mesh) else {
        debug!("mesh has no surface area, nothing to sample");
        return Ok(Vec::new());
    };

    let bound = (mesh.bounding_box().volume() / min_distance.powi(3)).ceil();
    let max_samples = if bound.is_finite() { bound as usize } else { usize::MAX };
    let min_distance_sq = min_distance * min_distance;

    let mut accepted = Vec::new();
    // Only the size of the active list matters; entries are never read.
    let mut active: Vec<usize> = Vec::new();

    let seed = sampler.sample(rng);
    index.insert(seed);
    active.push(accepted.len());
    accepted.push(seed);

    while !active.is_empty() && accepted.len() < max_samples {
        let chosen = rng.random_range(0..active.len());
        let mut found = false;
        for _ in 0..max_attempts {
            let candidate = sampler.sample(rng);
            let too_close = index
                .neighbors(&candidate.position, min_distance)
                .iter()
                .any(|n| n.position.distance_squared_to(&candidate.position) < min_distance_sq);
            if !too_close {
                index.insert(candidate);
                active.push(accepted.len());
                accepted.push(candidate);
                found = true;
                break;
            }
        }
        if !found {
            active.swap_remove(chosen);
        }
    }

    info!(points = accepted.len(), max_samples, "surface sampling complete");
    Ok(accepted)
}
