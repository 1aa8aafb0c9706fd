//! Regular-grid sampling of ground footprints, projected onto terrain.

use serde::{Deserialize, Serialize};
use sightline_types::DensityError;
use tracing::{debug, info, instrument, warn};

use super::{MeasurementPoint, SamplingConfig, SamplingError};
use crate::geometry::{Point2d, Point3d, Ray, Transform, Vec3};
use crate::mesh::TriangleBuffer;
use crate::scene::{BvhScene, Intersectable};

/// A ground polygon in GeoJSON ring layout: the first ring is the outer
/// boundary, any further rings are holes. Coordinates are in the element's
/// local frame; `transform` maps them to world space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub rings: Vec<Vec<[f64; 2]>>,
    #[serde(default)]
    pub transform: Option<Transform>,
}

impl Footprint {
    pub fn new(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Self {
            rings,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// 2D bounds over every ring.
    pub fn bounds(&self) -> Result<(Point2d, Point2d), SamplingError> {
        let mut coords = self.rings.iter().flatten().peekable();
        if coords.peek().is_none() {
            return Err(SamplingError::EmptyFootprint);
        }
        let mut min = Point2d::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2d::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for [x, y] in coords {
            min.x = min.x.min(*x);
            min.y = min.y.min(*y);
            max.x = max.x.max(*x);
            max.y = max.y.max(*y);
        }
        Ok((min, max))
    }

    pub fn contains(&self, p: &Point2d) -> bool {
        point_in_polygon(p, &self.rings)
    }

    /// Grid points inside the footprint, in its local frame.
    pub fn sample_local(&self, resolution: f64) -> Result<Vec<Point2d>, SamplingError> {
        let (min, max) = self.bounds()?;
        let mut points = grid_points(&min, &max, resolution)?;
        points.retain(|p| self.contains(p));
        Ok(points)
    }

    /// Grid points inside the footprint, mapped to world x/y.
    pub fn sample_world(&self, resolution: f64) -> Result<Vec<Point2d>, SamplingError> {
        let local = self.sample_local(resolution)?;
        Ok(match &self.transform {
            Some(t) => local
                .iter()
                .map(|p| {
                    let w = t.transform_point(&p.to_3d());
                    Point2d::new(w.x, w.y)
                })
                .collect(),
            None => local,
        })
    }
}

/// Regular grid anchored at `min` with spacing `1 / resolution`.
///
/// The x extent contributes `round(width * resolution)` columns and the
/// y extent `round(height * resolution)` rows, so the far edges are not
/// necessarily reached.
pub fn grid_points(min: &Point2d, max: &Point2d, resolution: f64) -> Result<Vec<Point2d>, SamplingError> {
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(DensityError::InvalidResolution(resolution).into());
    }
    let nx = ((max.x - min.x).abs() * resolution).round() as usize;
    let ny = ((max.y - min.y).abs() * resolution).round() as usize;
    let step = 1.0 / resolution;

    let mut points = Vec::with_capacity(nx * ny);
    for i in 0..nx {
        for j in 0..ny {
            points.push(Point2d::new(min.x + i as f64 * step, min.y + j as f64 * step));
        }
    }
    Ok(points)
}

const BOUNDARY_EPS: f64 = 1e-9;

/// Crossing-number test against one ring. A point on an edge is reported as
/// `Boundary` regardless of parity.
fn classify_in_ring(p: &Point2d, ring: &[[f64; 2]]) -> RingSide {
    let mut ring = ring;
    if ring.len() > 1 && ring[0] == ring[ring.len() - 1] {
        ring = &ring[..ring.len() - 1];
    }
    let n = ring.len();
    if n == 0 {
        return RingSide::Outside;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];

        let cross = p.y * (xi - xj) + yi * (xj - p.x) + yj * (p.x - xi);
        if cross.abs() <= BOUNDARY_EPS
            && (xi - p.x) * (xj - p.x) <= 0.0
            && (yi - p.y) * (yj - p.y) <= 0.0
        {
            return RingSide::Boundary;
        }

        if ((yi > p.y) != (yj > p.y)) && (p.x < (xj - xi) * (p.y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    if inside {
        RingSide::Inside
    } else {
        RingSide::Outside
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RingSide {
    Inside,
    Boundary,
    Outside,
}

/// Point-in-polygon with holes. Points on any ring boundary count as inside
/// the polygon; points strictly inside a hole count as outside.
pub fn point_in_polygon(p: &Point2d, rings: &[Vec<[f64; 2]>]) -> bool {
    let Some((outer, holes)) = rings.split_first() else {
        return false;
    };
    match classify_in_ring(p, outer) {
        RingSide::Outside => false,
        RingSide::Boundary => true,
        RingSide::Inside => !holes
            .iter()
            .any(|hole| classify_in_ring(p, hole) == RingSide::Inside),
    }
}

/// World-space grid points of several footprints, concatenated in order.
/// Footprints without coordinates are skipped.
pub fn sample_footprints(footprints: &[Footprint], resolution: f64) -> Result<Vec<Point2d>, SamplingError> {
    let mut points = Vec::new();
    for (i, footprint) in footprints.iter().enumerate() {
        match footprint.sample_world(resolution) {
            Ok(mut pts) => points.append(&mut pts),
            Err(SamplingError::EmptyFootprint) => {
                warn!(footprint = i, "skipping footprint without coordinates");
            }
            Err(e) => return Err(e),
        }
    }
    debug!(footprints = footprints.len(), points = points.len(), "footprints sampled");
    Ok(points)
}

/// Drop each point onto the terrain along `-Z`. Points whose ray misses the
/// terrain are dropped.
#[instrument(skip_all, fields(points = points.len(), triangles = terrain.triangle_count()))]
pub fn project_to_terrain(
    points: &[Point2d],
    terrain: &TriangleBuffer,
    config: &SamplingConfig,
) -> Result<Vec<MeasurementPoint>, SamplingError> {
    if points.is_empty() || terrain.is_empty() {
        return Ok(Vec::new());
    }
    let scene = BvhScene::build(terrain, config.bvh_leaf_size)?;
    let down = -Vec3::Z;

    let projected: Vec<MeasurementPoint> = points
        .iter()
        .filter_map(|p| {
            let ray = Ray::new(Point3d::new(p.x, p.y, config.terrain_ray_height), down)?;
            scene
                .intersect(&ray)
                .map(|hit| MeasurementPoint::new(hit.point, hit.normal))
        })
        .collect();

    info!(
        projected = projected.len(),
        dropped = points.len() - projected.len(),
        "terrain projection complete"
    );
    Ok(projected)
}
