use analysis_engine::{Lane, PointAnalysis, VolumeAnalysis, WorkerMessage};
use sightline_kernel::TriangleBuffer;
use sightline_types::{scene_paths, Role};
use tracing::debug;

use crate::engine_state::{BridgeError, EngineState, Resample, RoleInput};
use crate::messages::{ElementColor, EngineToUi, UiToEngine};
use crate::render::{self, RenderUpdate, SOURCE_COLOR_TRANSPARENT, TARGET_COLOR_TRANSPARENT};

/// Dispatch a UI message to the engine and return a response.
///
/// Errors are reported to the UI as `EngineToUi::Error`.
pub fn dispatch(state: &mut EngineState, msg: UiToEngine) -> EngineToUi {
    match handle_message(state, msg) {
        Ok(response) => response,
        Err(e) => EngineToUi::Error {
            message: e.to_string(),
        },
    }
}

fn handle_message(state: &mut EngineState, msg: UiToEngine) -> Result<EngineToUi, BridgeError> {
    match msg {
        // -- Scene --
        UiToEngine::SetScene { chunks } => {
            let triangles = state.set_scene(TriangleBuffer::flatten(chunks));
            Ok(EngineToUi::SceneUpdated { triangles })
        }

        UiToEngine::SetTerrain { chunks } => {
            let triangles = state.set_terrain(TriangleBuffer::flatten(chunks));
            Ok(EngineToUi::TerrainUpdated { triangles })
        }

        UiToEngine::ResolveScenePaths { paths } => Ok(EngineToUi::ScenePaths {
            paths: scene_paths(&paths),
        }),

        // -- Selection --
        UiToEngine::SetSelection {
            role,
            selection,
            volume_chunks,
            footprints,
        } => {
            if selection.is_empty() {
                return Ok(ignored("selection has no volume or area elements"));
            }
            let element_colors = element_colors(role, &selection);
            let input = RoleInput {
                selection,
                volume_mesh: TriangleBuffer::flatten(volume_chunks),
                footprints,
            };
            let resample = state.set_selection(role, input)?;
            Ok(points_updated(state, resample, element_colors))
        }

        // -- Settings --
        UiToEngine::ChangeSetting { key, value } => {
            let changed = state.change_setting(&key, value.as_deref());
            let mut render = Vec::new();

            if let Some(role) = changed {
                if state.input(role).is_some() {
                    let resample = state.resample(role)?;
                    render.extend(preview_updates(state, resample));
                }
            }

            if state.is_inspecting() {
                if let Some(analysis) = state.last_inspection() {
                    render.push(if state.settings.show_view_lines {
                        render::hitlines(analysis)
                    } else {
                        RenderUpdate::empty(render::Layer::Hitlines)
                    });
                }
            } else if !state.settings.show_view_lines {
                render.push(RenderUpdate::empty(render::Layer::Hitlines));
            }

            Ok(EngineToUi::SettingsChanged {
                settings: state.settings,
                render,
            })
        }

        // -- Volume analysis --
        UiToEngine::RunVolumeAnalysis => match state.start_volume_analysis()? {
            Some(started) => Ok(EngineToUi::AnalysisStarted {
                lane: Lane::Volume,
                generation: started.generation,
                render: Vec::new(),
                job: started.job,
            }),
            None => Ok(ignored("source points, target points and scene are required")),
        },

        UiToEngine::CancelVolumeAnalysis => Ok(EngineToUi::AnalysisCancelled {
            lane: Lane::Volume,
            was_running: state.cancel_volume_analysis(),
        }),

        // -- Inspection --
        UiToEngine::InspectPoint { point } => match state.start_point_analysis(point)? {
            Some(started) => Ok(EngineToUi::AnalysisStarted {
                lane: Lane::Point,
                generation: started.generation,
                render: vec![render::source_point(point)],
                job: started.job,
            }),
            None => Ok(ignored("run a volume analysis before inspecting")),
        },

        UiToEngine::EndInspection => {
            state.end_inspection();
            let mut render = render::clear_inspection();
            if let Some(targets) = state.visible_targets() {
                render.push(render::preview_target_points(targets));
            }
            Ok(EngineToUi::InspectionCleared { render })
        }

        UiToEngine::VolumeWorkerEnvelope { envelope } => match state.ingest_volume(envelope) {
            Some(msg) => Ok(volume_message(state, msg)),
            None => Ok(ignored("envelope from a superseded volume job")),
        },

        UiToEngine::PointWorkerEnvelope { envelope } => match state.ingest_point(envelope) {
            Some(msg) => Ok(point_message(state, msg)),
            None => Ok(ignored("envelope from a superseded point job")),
        },

        UiToEngine::Poll => {
            let mut messages = Vec::new();
            for msg in state.poll_volume() {
                messages.push(volume_message(state, msg));
            }
            for msg in state.poll_point() {
                messages.push(point_message(state, msg));
            }
            Ok(EngineToUi::Batch { messages })
        }
    }
}

fn ignored(reason: &str) -> EngineToUi {
    debug!(reason, "request ignored");
    EngineToUi::Ignored {
        reason: reason.to_string(),
    }
}

fn element_colors(role: Role, selection: &sightline_types::ElementSelection) -> Vec<ElementColor> {
    let color = match role {
        Role::Source => SOURCE_COLOR_TRANSPARENT,
        Role::Target => TARGET_COLOR_TRANSPARENT,
    };
    selection
        .volume_elements
        .iter()
        .chain(&selection.area_elements)
        .map(|e| ElementColor {
            path: e.path.clone(),
            color: color.to_string(),
        })
        .collect()
}

fn preview(state: &EngineState, role: Role) -> Option<RenderUpdate> {
    let points = state.points(role)?;
    Some(match role {
        Role::Source => render::preview_source_points(points),
        Role::Target => render::preview_target_points(points),
    })
}

/// Preview of the resampled role, plus the opposite role's preview when a
/// stale volume result was cleared.
fn preview_updates(state: &EngineState, resample: Resample) -> Vec<RenderUpdate> {
    std::iter::once(resample.role)
        .chain(resample.stale)
        .filter_map(|role| preview(state, role))
        .collect()
}

fn points_updated(state: &EngineState, resample: Resample, element_colors: Vec<ElementColor>) -> EngineToUi {
    EngineToUi::PointsUpdated {
        role: resample.role,
        count: state.points(resample.role).map_or(0, <[_]>::len),
        element_colors,
        render: preview_updates(state, resample),
    }
}

/// Translate a volume lane message, recording results in the state.
pub fn volume_message(state: &mut EngineState, msg: WorkerMessage<VolumeAnalysis>) -> EngineToUi {
    match msg {
        WorkerMessage::Progress(event) => EngineToUi::AnalysisProgress {
            lane: Lane::Volume,
            percent: event.percent,
        },
        WorkerMessage::Result(analysis) => {
            let stats = state.record_volume_result(&analysis);
            EngineToUi::VolumeAnalysisComplete {
                stats,
                visible_targets: analysis.visible_target_points.len(),
                render: vec![
                    render::preview_target_points(&analysis.visible_target_points),
                    render::volume_result(&analysis),
                ],
            }
        }
        WorkerMessage::Failed { reason } => EngineToUi::AnalysisFailed {
            lane: Lane::Volume,
            reason,
        },
    }
}

/// Translate a point lane message, recording results in the state.
pub fn point_message(state: &mut EngineState, msg: WorkerMessage<PointAnalysis>) -> EngineToUi {
    match msg {
        WorkerMessage::Progress(event) => EngineToUi::AnalysisProgress {
            lane: Lane::Point,
            percent: event.percent,
        },
        WorkerMessage::Result(analysis) => {
            state.record_point_result(&analysis);
            let mut render = vec![render::point_result(&analysis)];
            if state.settings.show_view_lines && state.is_inspecting() {
                render.push(render::hitlines(&analysis));
            }
            EngineToUi::PointAnalysisComplete {
                percentage: analysis.inspection_percentage(),
                analysis,
                render,
            }
        }
        WorkerMessage::Failed { reason } => EngineToUi::AnalysisFailed {
            lane: Lane::Point,
            reason,
        },
    }
}
