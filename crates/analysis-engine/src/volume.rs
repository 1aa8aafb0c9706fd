//! Many-to-many visibility between source and target point sets.
//!
//! Every line-of-sight test casts from the target toward the source.

use sightline_kernel::{
    test_visibility, BvhScene, Intersectable, MeasurementPoint, TriangleBuffer, VisibilityTolerance,
};
use tracing::{debug, info, instrument};

use crate::progress::{PhaseProgress, ProgressSink, ProgressTracker};
use crate::types::{AnalysisConfig, AnalysisError, ProgressBand, SourcePointCoverage, VolumeAnalysis};

fn sees<S: Intersectable + ?Sized>(
    scene: &S,
    target: &MeasurementPoint,
    source: &MeasurementPoint,
    tolerance: &VisibilityTolerance,
) -> bool {
    test_visibility(scene, &target.position, &source.position, tolerance)
}

/// Sources seen by at least one target.
pub fn visible_sources<S, P>(
    scene: &S,
    sources: &[MeasurementPoint],
    targets: &[MeasurementPoint],
    tolerance: &VisibilityTolerance,
    band: ProgressBand,
    tracker: &mut ProgressTracker<'_, P>,
) -> Result<Vec<MeasurementPoint>, AnalysisError>
where
    S: Intersectable + ?Sized,
    P: ProgressSink + ?Sized,
{
    let phase = PhaseProgress::new(band, sources.len());
    let mut visible = Vec::new();
    for (i, source) in sources.iter().enumerate() {
        tracker.check_cancelled()?;
        if targets.iter().any(|t| sees(scene, t, source, tolerance)) {
            visible.push(*source);
        }
        tracker.item_done(&phase, i);
    }
    Ok(visible)
}

/// Targets that see at least one of `sources`.
///
/// Called with the visible sources only; a target that would only see a
/// source pruned in the first phase is dropped. Because both phases cast in
/// the same direction, such a target cannot exist.
pub fn visible_targets<S, P>(
    scene: &S,
    sources: &[MeasurementPoint],
    targets: &[MeasurementPoint],
    tolerance: &VisibilityTolerance,
    band: ProgressBand,
    tracker: &mut ProgressTracker<'_, P>,
) -> Result<Vec<MeasurementPoint>, AnalysisError>
where
    S: Intersectable + ?Sized,
    P: ProgressSink + ?Sized,
{
    let phase = PhaseProgress::new(band, targets.len());
    let mut visible = Vec::new();
    for (i, target) in targets.iter().enumerate() {
        tracker.check_cancelled()?;
        if sources.iter().any(|s| sees(scene, target, s, tolerance)) {
            visible.push(*target);
        }
        tracker.item_done(&phase, i);
    }
    Ok(visible)
}

/// For each source, the fraction of `targets` that see it. Zero when there
/// are no targets.
pub fn view_coverage<S, P>(
    scene: &S,
    sources: &[MeasurementPoint],
    targets: &[MeasurementPoint],
    tolerance: &VisibilityTolerance,
    band: ProgressBand,
    tracker: &mut ProgressTracker<'_, P>,
) -> Result<Vec<SourcePointCoverage>, AnalysisError>
where
    S: Intersectable + ?Sized,
    P: ProgressSink + ?Sized,
{
    let phase = PhaseProgress::new(band, sources.len());
    let mut coverage = Vec::with_capacity(sources.len());
    for (i, source) in sources.iter().enumerate() {
        tracker.check_cancelled()?;
        let seen = targets
            .iter()
            .filter(|t| sees(scene, t, source, tolerance))
            .count();
        let percentage = if targets.is_empty() {
            0.0
        } else {
            seen as f64 / targets.len() as f64
        };
        coverage.push(SourcePointCoverage {
            position: source.position,
            percentage,
        });
        tracker.item_done(&phase, i);
    }
    Ok(coverage)
}

/// Run the three phases against a prepared scene.
pub fn mutual_visibility<S, P>(
    scene: &S,
    sources: &[MeasurementPoint],
    targets: &[MeasurementPoint],
    config: &AnalysisConfig,
    sink: &mut P,
) -> Result<VolumeAnalysis, AnalysisError>
where
    S: Intersectable + ?Sized,
    P: ProgressSink + ?Sized,
{
    config.bands.validate()?;
    let tol = &config.tolerance;
    let mut tracker = ProgressTracker::new(sink);
    tracker.report(0);

    let sources = visible_sources(scene, sources, targets, tol, config.bands.visible_sources, &mut tracker)?;
    debug!(visible_sources = sources.len(), "phase 1 complete");

    let targets = visible_targets(scene, &sources, targets, tol, config.bands.visible_targets, &mut tracker)?;
    debug!(visible_targets = targets.len(), "phase 2 complete");

    let coverage = view_coverage(scene, &sources, &targets, tol, config.bands.coverage, &mut tracker)?;
    debug!(covered_sources = coverage.len(), "phase 3 complete");

    Ok(VolumeAnalysis {
        source_point_coverage: coverage,
        visible_target_points: targets,
    })
}

/// Build a BVH over the scene vertices and run the mutual-visibility
/// analysis. The scene lives only for the duration of the call.
#[instrument(skip_all, fields(
    sources = sources.len(),
    targets = targets.len(),
    triangles = scene_vertices.triangle_count(),
))]
pub fn analyze_view_from_volume<P: ProgressSink + ?Sized>(
    scene_vertices: &TriangleBuffer,
    sources: &[MeasurementPoint],
    targets: &[MeasurementPoint],
    config: &AnalysisConfig,
    sink: &mut P,
) -> Result<VolumeAnalysis, AnalysisError> {
    let scene = BvhScene::build(scene_vertices, config.bvh_leaf_size)?;
    let analysis = mutual_visibility(&scene, sources, targets, config, sink)?;

    info!(
        visible_sources = analysis.source_point_coverage.len(),
        visible_targets = analysis.visible_target_points.len(),
        "volume analysis complete"
    );
    Ok(analysis)
}
