use std::time::Duration;

use analysis_engine::{Envelope, Lane, NoProgress, ProgressEvent, VolumeAnalysis, WorkerMessage};
use approx::assert_relative_eq;
use sightline_kernel::{Footprint, Point3d, TriangleBuffer};
use sightline_types::*;
use wasm_bridge::dispatch::{point_message, volume_message};
use wasm_bridge::messages::*;
use wasm_bridge::render::{SOURCE_COLOR, TARGET_COLOR};
use wasm_bridge::worker::progress_envelope;
use wasm_bridge::*;

const WAIT: Duration = Duration::from_secs(20);

// ── Helper functions ─────────────────────────────────────────────────────

/// Two triangles covering an axis-aligned rectangle at height `z`.
fn quad_chunk(z: f32, (x0, x1): (f32, f32), (y0, y1): (f32, f32)) -> Vec<f32> {
    vec![
        x0, y0, z, x1, y0, z, x1, y1, z, //
        x0, y0, z, x1, y1, z, x0, y1, z,
    ]
}

fn ground() -> Vec<f32> {
    quad_chunk(0.0, (-20.0, 20.0), (-20.0, 20.0))
}

fn roof() -> Vec<f32> {
    quad_chunk(5.0, (0.0, 2.0), (0.0, 2.0))
}

fn element(path: &str) -> ElementRef {
    ElementRef {
        path: path.to_string(),
        urn: format!("urn:{path}"),
    }
}

fn volume_selection(role: Role, path: &str, chunk: Vec<f32>) -> UiToEngine {
    UiToEngine::SetSelection {
        role,
        selection: ElementSelection {
            volume_elements: vec![element(path)],
            area_elements: Vec::new(),
        },
        volume_chunks: vec![chunk],
        footprints: Vec::new(),
    }
}

/// Square footprint offset so no grid point lands on a terrain diagonal.
fn area_selection(role: Role) -> UiToEngine {
    let ring = vec![[0.3, 0.1], [10.3, 0.1], [10.3, 10.1], [0.3, 10.1], [0.3, 0.1]];
    UiToEngine::SetSelection {
        role,
        selection: ElementSelection {
            volume_elements: Vec::new(),
            area_elements: vec![element("root/site")],
        },
        volume_chunks: Vec::new(),
        footprints: vec![Footprint::new(vec![ring])],
    }
}

/// Scene of ground and roof, one sample on the roof as source, one on the
/// ground as target.
fn ready_state() -> EngineState {
    let mut state = EngineState::with_config(EngineConfig::with_seed(7), DensitySettings::default());
    dispatch(&mut state, UiToEngine::SetScene { chunks: vec![ground(), roof()] });
    dispatch(&mut state, volume_selection(Role::Source, "root/roof", roof()));
    dispatch(
        &mut state,
        volume_selection(Role::Target, "root/ground", quad_chunk(0.0, (-10.0, 10.0), (-10.0, 10.0))),
    );
    state
}

/// Same as `ready_state`, with jobs handed back to the caller.
fn external_state() -> EngineState {
    let config = EngineConfig::with_seed(7).with_execution(Execution::External);
    let mut state = EngineState::with_config(config, DensitySettings::default());
    dispatch(&mut state, UiToEngine::SetScene { chunks: vec![ground(), roof()] });
    dispatch(&mut state, volume_selection(Role::Source, "root/roof", roof()));
    dispatch(
        &mut state,
        volume_selection(Role::Target, "root/ground", quad_chunk(0.0, (-10.0, 10.0), (-10.0, 10.0))),
    );
    state
}

fn scene_buffer() -> TriangleBuffer {
    TriangleBuffer::flatten(vec![ground(), roof()])
}

fn started_job(response: EngineToUi) -> (u64, WorkerJob) {
    match response {
        EngineToUi::AnalysisStarted {
            generation,
            job: Some(job),
            ..
        } => (generation, job),
        other => panic!("expected AnalysisStarted with a job, got {other:?}"),
    }
}

fn run_volume(state: &mut EngineState) -> Vec<EngineToUi> {
    match dispatch(state, UiToEngine::RunVolumeAnalysis) {
        EngineToUi::AnalysisStarted { lane, .. } => assert_eq!(lane, Lane::Volume),
        other => panic!("expected AnalysisStarted, got {other:?}"),
    }
    state
        .wait_volume(WAIT)
        .into_iter()
        .map(|msg| volume_message(state, msg))
        .collect()
}

fn run_point(state: &mut EngineState, point: Point3d) -> Vec<EngineToUi> {
    match dispatch(state, UiToEngine::InspectPoint { point }) {
        EngineToUi::AnalysisStarted { lane, render, .. } => {
            assert_eq!(lane, Lane::Point);
            assert_eq!(render[0].layer, Layer::SourcePoint);
        }
        other => panic!("expected AnalysisStarted, got {other:?}"),
    }
    state
        .wait_point(WAIT)
        .into_iter()
        .map(|msg| point_message(state, msg))
        .collect()
}

// ── Serde Tests ──────────────────────────────────────────────────────────

#[test]
fn serde_ui_messages_are_tagged() {
    let msg: UiToEngine =
        serde_json::from_str(r#"{"type":"ChangeSetting","key":"showViewLines","value":"false"}"#).unwrap();
    assert!(matches!(msg, UiToEngine::ChangeSetting { ref key, .. } if key == SHOW_VIEW_LINES_KEY));

    let msg: UiToEngine = serde_json::from_str(
        r#"{"type":"SetSelection","role":"target","selection":{"volumeElements":[],"areaElements":[]}}"#,
    )
    .unwrap();
    assert!(matches!(msg, UiToEngine::SetSelection { role: Role::Target, .. }));
}

#[test]
fn serde_engine_error() {
    let json = serde_json::to_value(EngineToUi::Error {
        message: "boom".to_string(),
    })
    .unwrap();
    assert_eq!(json["type"], "Error");
    assert_eq!(json["message"], "boom");
}

#[test]
fn serde_render_update_uses_layer_ids() {
    let json = serde_json::to_value(RenderUpdate::empty(Layer::TargetPoints)).unwrap();
    assert_eq!(json["layer"], "target-points");
}

// ── Dispatch Tests ───────────────────────────────────────────────────────

#[test]
fn dispatch_set_scene_counts_triangles() {
    let mut state = EngineState::new();
    let response = dispatch(&mut state, UiToEngine::SetScene { chunks: vec![ground(), roof()] });
    assert!(matches!(response, EngineToUi::SceneUpdated { triangles: 4 }));
    assert!(state.has_scene());
}

#[test]
fn dispatch_resolve_scene_paths() {
    let mut state = EngineState::new();
    let response = dispatch(
        &mut state,
        UiToEngine::ResolveScenePaths {
            paths: vec![
                CategorizedPath {
                    path: "root/b/f1".into(),
                    category: Some("floor".into()),
                },
                CategorizedPath {
                    path: "root/b".into(),
                    category: None,
                },
            ],
        },
    );
    match response {
        EngineToUi::ScenePaths { paths } => assert_eq!(paths, vec!["root/b"]),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn dispatch_empty_selection_is_ignored() {
    let mut state = EngineState::new();
    let response = dispatch(
        &mut state,
        UiToEngine::SetSelection {
            role: Role::Source,
            selection: ElementSelection::default(),
            volume_chunks: Vec::new(),
            footprints: Vec::new(),
        },
    );
    assert!(matches!(response, EngineToUi::Ignored { .. }));
    assert!(state.points(Role::Source).is_none());
}

#[test]
fn dispatch_area_selection_samples_terrain() {
    let mut state = EngineState::new();
    dispatch(&mut state, UiToEngine::SetTerrain { chunks: vec![ground()] });
    let response = dispatch(&mut state, area_selection(Role::Source));

    match response {
        EngineToUi::PointsUpdated {
            role,
            count,
            element_colors,
            render,
        } => {
            assert_eq!(role, Role::Source);
            // medium preset: 0.4 samples per meter over 10 m in each direction
            assert_eq!(count, 16);
            assert_eq!(element_colors[0].path, "root/site");
            assert_eq!(render.len(), 1);
            assert_eq!(render[0].layer, Layer::SourcePoints);
            assert_eq!(render[0].points[0].color, SOURCE_COLOR);
            assert_eq!(render[0].points[0].marker, Marker::Sphere);
        }
        other => panic!("unexpected {other:?}"),
    }
    for p in state.points(Role::Source).unwrap() {
        assert_relative_eq!(p.position.z, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn dispatch_area_selection_without_terrain_yields_no_points() {
    let mut state = EngineState::new();
    let response = dispatch(&mut state, area_selection(Role::Target));
    assert!(matches!(response, EngineToUi::PointsUpdated { count: 0, .. }));
}

#[test]
fn dispatch_density_change_resamples() {
    let mut state = EngineState::new();
    dispatch(&mut state, UiToEngine::SetTerrain { chunks: vec![ground()] });
    dispatch(&mut state, area_selection(Role::Target));
    assert_eq!(state.points(Role::Target).unwrap().len(), 16);

    let response = dispatch(
        &mut state,
        UiToEngine::ChangeSetting {
            key: TARGET_DENSITY_KEY.to_string(),
            value: Some("high".to_string()),
        },
    );
    match response {
        EngineToUi::SettingsChanged { settings, render } => {
            assert_eq!(settings.target, DensityPreset::High);
            assert_eq!(render[0].layer, Layer::TargetPoints);
            assert_eq!(render[0].points[0].color, TARGET_COLOR);
        }
        other => panic!("unexpected {other:?}"),
    }
    // high preset: 0.5 samples per meter
    assert_eq!(state.points(Role::Target).unwrap().len(), 25);
}

#[test]
fn dispatch_run_without_inputs_is_ignored() {
    let mut state = EngineState::new();
    dispatch(&mut state, volume_selection(Role::Source, "root/roof", roof()));
    let response = dispatch(&mut state, UiToEngine::RunVolumeAnalysis);
    assert!(matches!(response, EngineToUi::Ignored { .. }));
}

#[test]
fn dispatch_cancel_idle_lane() {
    let mut state = EngineState::new();
    let response = dispatch(&mut state, UiToEngine::CancelVolumeAnalysis);
    assert!(matches!(
        response,
        EngineToUi::AnalysisCancelled {
            lane: Lane::Volume,
            was_running: false
        }
    ));
}

#[test]
fn dispatch_poll_idle_returns_empty_batch() {
    let mut state = EngineState::new();
    match dispatch(&mut state, UiToEngine::Poll) {
        EngineToUi::Batch { messages } => assert!(messages.is_empty()),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn dispatch_inspect_before_volume_analysis_is_ignored() {
    let mut state = ready_state();
    let response = dispatch(
        &mut state,
        UiToEngine::InspectPoint {
            point: Point3d::new(1.0, 1.0, 8.0),
        },
    );
    assert!(matches!(response, EngineToUi::Ignored { .. }));
    assert!(!state.is_inspecting());
}

#[test]
fn dispatch_inspect_rejects_non_finite_point() {
    let mut state = ready_state();
    let response = dispatch(
        &mut state,
        UiToEngine::InspectPoint {
            point: Point3d::new(f64::NAN, 0.0, 0.0),
        },
    );
    assert!(matches!(response, EngineToUi::Error { .. }));
}

// ── Pipeline Tests ───────────────────────────────────────────────────────

#[test]
fn flat_volumes_sample_one_point_each() {
    let state = ready_state();
    assert_eq!(state.points(Role::Source).unwrap().len(), 1);
    assert_eq!(state.points(Role::Target).unwrap().len(), 1);
}

#[test]
fn volume_analysis_reports_progress_then_result() {
    let mut state = ready_state();
    let messages = run_volume(&mut state);

    let progress: Vec<u8> = messages
        .iter()
        .filter_map(|m| match m {
            EngineToUi::AnalysisProgress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(progress.first(), Some(&0));
    assert!(progress.windows(2).all(|w| w[0] < w[1]));

    match messages.last() {
        Some(EngineToUi::VolumeAnalysisComplete {
            stats,
            visible_targets,
            render,
        }) => {
            assert_eq!(*visible_targets, 1);
            assert_eq!(stats.len(), 1);
            assert_eq!(stats[0].level, VisibilityLevel::Complete);
            assert_relative_eq!(stats[0].ratio, 1.0);
            let layers: Vec<Layer> = render.iter().map(|r| r.layer).collect();
            assert_eq!(layers, vec![Layer::TargetPoints, Layer::SourcePoints]);
        }
        other => panic!("expected VolumeAnalysisComplete, got {other:?}"),
    }
    assert!(state.stats().is_some());
    assert_eq!(state.visible_targets().map(<[_]>::len), Some(1));
}

#[test]
fn changing_targets_after_analysis_clears_stats() {
    let mut state = ready_state();
    run_volume(&mut state);
    assert!(state.stats().is_some());

    let response = dispatch(
        &mut state,
        volume_selection(Role::Target, "root/ground", quad_chunk(0.0, (-5.0, 5.0), (-5.0, 5.0))),
    );
    assert!(state.stats().is_none());
    match response {
        EngineToUi::PointsUpdated { render, .. } => {
            let layers: Vec<Layer> = render.iter().map(|r| r.layer).collect();
            assert_eq!(layers, vec![Layer::TargetPoints, Layer::SourcePoints]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn inspection_draws_hits_and_hitlines() {
    let mut state = ready_state();
    run_volume(&mut state);

    let messages = run_point(&mut state, Point3d::new(-15.0, 0.3, 3.0));
    match messages.last() {
        Some(EngineToUi::PointAnalysisComplete {
            analysis,
            percentage,
            render,
        }) => {
            assert_eq!(analysis.hits.len(), 1);
            assert_eq!(*percentage, Some(100.0));
            assert_eq!(render[0].layer, Layer::TargetPoints);
            assert_eq!(render[0].points[0].color, VisibilityLevel::Complete.color());
            assert_eq!(render[1].layer, Layer::Hitlines);
            assert_eq!(render[1].lines[0].segments.len(), 1);
        }
        other => panic!("expected PointAnalysisComplete, got {other:?}"),
    }
    assert!(state.is_inspecting());
    assert!(state.last_inspection().is_some());
}

#[test]
fn hiding_view_lines_clears_hitlines_during_inspection() {
    let mut state = ready_state();
    run_volume(&mut state);
    run_point(&mut state, Point3d::new(-15.0, 0.3, 3.0));

    let response = dispatch(
        &mut state,
        UiToEngine::ChangeSetting {
            key: SHOW_VIEW_LINES_KEY.to_string(),
            value: Some("false".to_string()),
        },
    );
    match response {
        EngineToUi::SettingsChanged { settings, render } => {
            assert!(!settings.show_view_lines);
            assert_eq!(render.len(), 1);
            assert_eq!(render[0].layer, Layer::Hitlines);
            assert!(render[0].is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn ending_inspection_restores_target_preview() {
    let mut state = ready_state();
    run_volume(&mut state);
    run_point(&mut state, Point3d::new(-15.0, 0.3, 3.0));

    match dispatch(&mut state, UiToEngine::EndInspection) {
        EngineToUi::InspectionCleared { render } => {
            let layers: Vec<Layer> = render.iter().map(|r| r.layer).collect();
            assert_eq!(layers, vec![Layer::Hitlines, Layer::SourcePoint, Layer::TargetPoints]);
            assert!(render[0].is_empty());
            assert!(render[1].is_empty());
            assert_eq!(render[2].points[0].color, TARGET_COLOR);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!state.is_inspecting());
    assert!(state.last_inspection().is_none());
}

#[test]
fn same_seed_gives_same_points() {
    let a = ready_state();
    let b = ready_state();
    assert_eq!(a.points(Role::Source), b.points(Role::Source));
    assert_eq!(a.points(Role::Target), b.points(Role::Target));
}

// ── External Execution Tests ─────────────────────────────────────────────

#[test]
fn threaded_start_carries_no_job() {
    let mut state = ready_state();
    match dispatch(&mut state, UiToEngine::RunVolumeAnalysis) {
        EngineToUi::AnalysisStarted { job, .. } => assert!(job.is_none()),
        other => panic!("unexpected {other:?}"),
    }
    state.wait_volume(WAIT);
}

#[test]
fn external_volume_job_round_trip() {
    let mut state = external_state();
    let (generation, job) = started_job(dispatch(&mut state, UiToEngine::RunVolumeAnalysis));
    let WorkerJob::Volume(job) = job else {
        panic!("expected a volume job");
    };
    assert_eq!(job.generation, generation);
    assert_eq!(job.source_points.len(), 1);
    assert_eq!(job.target_points.len(), 1);

    let mut progress: Vec<ProgressEvent> = Vec::new();
    let envelope = job.run(&scene_buffer(), &mut progress);
    assert_eq!(progress.first().map(|e| e.percent), Some(0));

    let response = dispatch(
        &mut state,
        UiToEngine::VolumeWorkerEnvelope {
            envelope: progress_envelope(generation, 40),
        },
    );
    assert!(matches!(response, EngineToUi::AnalysisProgress { percent: 40, .. }));

    match dispatch(&mut state, UiToEngine::VolumeWorkerEnvelope { envelope }) {
        EngineToUi::VolumeAnalysisComplete {
            stats, visible_targets, ..
        } => {
            assert_eq!(visible_targets, 1);
            assert_eq!(stats[0].level, VisibilityLevel::Complete);
        }
        other => panic!("expected VolumeAnalysisComplete, got {other:?}"),
    }
    assert!(state.stats().is_some());
}

#[test]
fn external_envelope_from_superseded_run_is_ignored() {
    let mut state = external_state();
    let (first, _) = started_job(dispatch(&mut state, UiToEngine::RunVolumeAnalysis));
    let (second, _) = started_job(dispatch(&mut state, UiToEngine::RunVolumeAnalysis));
    assert!(second > first);

    let stale: Envelope<VolumeAnalysis> = Envelope {
        generation: first,
        message: WorkerMessage::Result(VolumeAnalysis::default()),
    };
    let response = dispatch(&mut state, UiToEngine::VolumeWorkerEnvelope { envelope: stale });
    assert!(matches!(response, EngineToUi::Ignored { .. }));
    assert!(state.stats().is_none());
}

#[test]
fn external_envelope_after_cancel_is_ignored() {
    let mut state = external_state();
    let (generation, job) = started_job(dispatch(&mut state, UiToEngine::RunVolumeAnalysis));
    let response = dispatch(&mut state, UiToEngine::CancelVolumeAnalysis);
    assert!(matches!(response, EngineToUi::AnalysisCancelled { was_running: true, .. }));

    let WorkerJob::Volume(job) = job else {
        panic!("expected a volume job");
    };
    let envelope = job.run(&scene_buffer(), &mut NoProgress);
    assert_eq!(envelope.generation, generation);
    let response = dispatch(&mut state, UiToEngine::VolumeWorkerEnvelope { envelope });
    assert!(matches!(response, EngineToUi::Ignored { .. }));
}

#[test]
fn external_inspection_round_trip() {
    let mut state = external_state();
    let (_, job) = started_job(dispatch(&mut state, UiToEngine::RunVolumeAnalysis));
    let WorkerJob::Volume(job) = job else {
        panic!("expected a volume job");
    };
    let envelope = job.run(&scene_buffer(), &mut NoProgress);
    dispatch(&mut state, UiToEngine::VolumeWorkerEnvelope { envelope });

    let point = Point3d::new(-15.0, 0.3, 3.0);
    let (generation, job) = started_job(dispatch(&mut state, UiToEngine::InspectPoint { point }));
    let WorkerJob::Point(job) = job else {
        panic!("expected a point job");
    };
    assert_eq!(job.generation, generation);
    assert_eq!(job.source_point, point);
    assert_eq!(job.visible_target_points.len(), 1);
    assert!(state.is_inspecting());

    let envelope = job.run(&scene_buffer(), &mut NoProgress);
    match dispatch(&mut state, UiToEngine::PointWorkerEnvelope { envelope }) {
        EngineToUi::PointAnalysisComplete { percentage, render, .. } => {
            assert_eq!(percentage, Some(100.0));
            assert_eq!(render[1].layer, Layer::Hitlines);
        }
        other => panic!("expected PointAnalysisComplete, got {other:?}"),
    }
    assert!(state.last_inspection().is_some());
}

#[test]
fn serde_worker_envelope_message() {
    let json = r#"{"type":"VolumeWorkerEnvelope","envelope":{"generation":3,"message":{"type":"Progress","percent":12}}}"#;
    let msg: UiToEngine = serde_json::from_str(json).unwrap();
    match msg {
        UiToEngine::VolumeWorkerEnvelope { envelope } => {
            assert_eq!(envelope.generation, 3);
            assert_eq!(envelope.message, WorkerMessage::Progress(ProgressEvent::new(12)));
        }
        other => panic!("unexpected {other:?}"),
    }
}
