use sightline_kernel::{test_visibility, BvhScene, Intersectable, MeasurementPoint, Point3d, TriangleBuffer};
use tracing::{info, instrument};

use crate::progress::{ProgressSink, ProgressTracker};
use crate::types::{AnalysisConfig, AnalysisError, PointAnalysis};

/// Partition `targets` into those visible from `source` and the rest.
/// Rays go from the source toward each target; every target is tested.
pub fn point_to_many<S, P>(
    scene: &S,
    source: Point3d,
    targets: &[MeasurementPoint],
    config: &AnalysisConfig,
    tracker: &mut ProgressTracker<'_, P>,
) -> Result<PointAnalysis, AnalysisError>
where
    S: Intersectable + ?Sized,
    P: ProgressSink + ?Sized,
{
    let mut hits = Vec::new();
    let mut misses = Vec::new();
    for target in targets {
        tracker.check_cancelled()?;
        if test_visibility(scene, &source, &target.position, &config.tolerance) {
            hits.push(target.position);
        } else {
            misses.push(target.position);
        }
    }
    Ok(PointAnalysis {
        source_point: source,
        hits,
        misses,
    })
}

/// Build a BVH over the scene vertices and inspect one source point.
#[instrument(skip_all, fields(targets = targets.len(), triangles = scene_vertices.triangle_count()))]
pub fn analyze_view_from_point<P: ProgressSink + ?Sized>(
    scene_vertices: &TriangleBuffer,
    source: Point3d,
    targets: &[MeasurementPoint],
    config: &AnalysisConfig,
    sink: &mut P,
) -> Result<PointAnalysis, AnalysisError> {
    let scene = BvhScene::build(scene_vertices, config.bvh_leaf_size)?;
    let mut tracker = ProgressTracker::new(sink);
    let analysis = point_to_many(&scene, source, targets, config, &mut tracker)?;
    info!(
        hits = analysis.hits.len(),
        misses = analysis.misses.len(),
        "point analysis complete"
    );
    Ok(analysis)
}
