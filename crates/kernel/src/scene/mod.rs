//! Ray-queryable triangle scenes.

pub mod bvh;
pub mod linear;

use crate::geometry::{Ray, RayHit};

pub use bvh::BvhScene;
pub use linear::LinearScene;

/// Anything that can answer a nearest-hit ray query.
///
/// Implementations report the closest intersection strictly in front of the
/// ray origin, treating triangles as double-sided.
pub trait Intersectable {
    fn intersect(&self, ray: &Ray) -> Option<RayHit>;
}

impl<T: Intersectable + ?Sized> Intersectable for &T {
    fn intersect(&self, ray: &Ray) -> Option<RayHit> {
        (**self).intersect(ray)
    }
}

/// Errors from building a scene.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("BVH leaf size must be at least 1")]
    InvalidLeafSize,
}
