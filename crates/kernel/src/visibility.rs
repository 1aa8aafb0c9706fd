//! Line-of-sight test between two surface points.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point3d, Ray};
use crate::scene::Intersectable;

/// Offsets used to keep a ray from hitting the surface it starts on and to
/// accept a hit as the destination surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibilityTolerance {
    /// Distance the ray origin is pushed along the ray before casting.
    pub origin_offset: f64,
    /// Maximum mismatch between the first hit and the destination distance.
    pub hit_tolerance: f64,
}

impl Default for VisibilityTolerance {
    fn default() -> Self {
        Self {
            origin_offset: 0.001,
            hit_tolerance: 0.003,
        }
    }
}

/// True when the first surface hit travelling from `from` toward `to` lies
/// at `to`.
///
/// The distance check is against the full `from`-`to` length even though the
/// ray starts `origin_offset` further along; the hit tolerance absorbs the
/// difference. The test is not symmetric: a destination that does not lie
/// on scene geometry is never visible.
pub fn test_visibility<S: Intersectable + ?Sized>(
    scene: &S,
    from: &Point3d,
    to: &Point3d,
    tolerance: &VisibilityTolerance,
) -> bool {
    let direction = *to - *from;
    let Some(unit) = direction.normalized() else {
        return false;
    };
    let origin = *from + unit * tolerance.origin_offset;
    let Some(ray) = Ray::new(origin, unit) else {
        return false;
    };
    match scene.intersect(&ray) {
        Some(hit) => (hit.distance - direction.length()).abs() < tolerance.hit_tolerance,
        None => false,
    }
}
