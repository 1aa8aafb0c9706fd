//! Measurement point generation: Poisson-disk surface sampling for volumes
//! and grid sampling with terrain projection for ground footprints.

pub mod area;
pub mod surface;

use serde::{Deserialize, Serialize};
use sightline_types::DensityError;

use crate::geometry::{Point3d, Vec3};
use crate::scene::SceneError;

pub use area::{grid_points, point_in_polygon, project_to_terrain, sample_footprints, Footprint};
pub use surface::{poisson_disk_sample, SurfaceSampler};

/// A sampled surface location with its face normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPoint {
    pub position: Point3d,
    pub normal: Vec3,
}

impl MeasurementPoint {
    pub fn new(position: Point3d, normal: Vec3) -> Self {
        Self { position, normal }
    }
}

/// Errors from point sampling.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SamplingError {
    #[error("invalid spatial hash cell size {0}")]
    InvalidCellSize(f64),

    #[error("invalid density parameters: {0}")]
    Density(#[from] DensityError),

    #[error("footprint has no outer ring")]
    EmptyFootprint,

    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Tunables for terrain projection and the acceleration structure built
/// around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Height the downward terrain rays start from.
    pub terrain_ray_height: f64,
    /// Maximum triangles per BVH leaf.
    pub bvh_leaf_size: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            terrain_ray_height: 1000.0,
            bvh_leaf_size: 4,
        }
    }
}

impl SamplingConfig {
    /// Start terrain rays from a different height, e.g. for mountainous sites.
    pub fn with_terrain_ray_height(height: f64) -> Self {
        Self {
            terrain_ray_height: height,
            ..Self::default()
        }
    }
}
