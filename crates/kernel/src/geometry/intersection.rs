use super::point::Point3d;
use super::ray::Ray;
use super::transform::BoundingBox;
use super::vector::Vec3;

/// Result of a ray-triangle intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Point3d,
    /// Distance from the ray origin to `point`.
    pub distance: f64,
    /// Unit face normal following the triangle's winding order.
    pub normal: Vec3,
}

/// Unit normal of a triangle from its winding order, `None` if degenerate.
pub fn triangle_normal(tri: &[Point3d; 3]) -> Option<Vec3> {
    (tri[1] - tri[0]).cross(&(tri[2] - tri[0])).normalized()
}

/// Triangle area; zero for degenerate triangles.
pub fn triangle_area(tri: &[Point3d; 3]) -> f64 {
    (tri[1] - tri[0]).cross(&(tri[2] - tri[0])).length() * 0.5
}

// ─── Ray-Triangle Intersection ─────────────────────────────────────────────

/// Double-sided Möller–Trumbore test. Only hits strictly in front of the
/// origin (`distance > 0`) are reported.
pub fn ray_triangle(ray: &Ray, tri: &[Point3d; 3]) -> Option<RayHit> {
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];
    let pvec = ray.direction.cross(&edge2);
    let det = edge1.dot(&pvec);
    if det.abs() < 1e-12 {
        return None; // parallel or degenerate
    }
    let inv_det = 1.0 / det;

    let tvec = ray.origin - tri[0];
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(&edge1);
    let v = ray.direction.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(&qvec) * inv_det;
    if t <= 0.0 {
        return None;
    }

    let normal = triangle_normal(tri)?;
    Some(RayHit {
        point: ray.at(t),
        distance: t,
        normal,
    })
}

// ─── Ray-AABB Intersection (for BVH) ──────────────────────────────────────

/// Entry distance of `ray` into the box, clamped to 0 when the origin is inside.
pub fn ray_aabb(ray: &Ray, bb: &BoundingBox) -> Option<f64> {
    let mut tmin = f64::NEG_INFINITY;
    let mut tmax = f64::INFINITY;

    for i in 0..3 {
        let origin = ray.origin.axis(i);
        let dir = ray.direction.axis(i);
        let (lo, hi) = (bb.min.axis(i), bb.max.axis(i));
        if dir.abs() < 1e-15 {
            if origin < lo || origin > hi {
                return None;
            }
        } else {
            let inv_d = 1.0 / dir;
            let mut t0 = (lo - origin) * inv_d;
            let mut t1 = (hi - origin) * inv_d;
            if inv_d < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            tmin = tmin.max(t0);
            tmax = tmax.min(t1);
            if tmax < tmin {
                return None;
            }
        }
    }

    if tmax < 0.0 {
        None
    } else {
        Some(tmin.max(0.0))
    }
}
