pub mod geometry;
pub mod mesh;
pub mod sampling;
pub mod scene;
pub mod spatial_hash;
pub mod visibility;

// Re-export the pieces the analysis layer works with.
pub use geometry::{BoundingBox, Point2d, Point3d, Ray, RayHit, Transform, Vec3};
pub use mesh::TriangleBuffer;
pub use sampling::{Footprint, MeasurementPoint, SamplingConfig, SamplingError};
pub use scene::{BvhScene, Intersectable, LinearScene, SceneError};
pub use spatial_hash::SpatialHashIndex;
pub use visibility::{test_visibility, VisibilityTolerance};
