//! WASM entry points.
//!
//! This module is only compiled for the `wasm32` target. The UI worker calls
//! `init` and `process_message`; the two analysis workers call the
//! stateless `analyze_view_from_*` functions with the job from
//! `AnalysisStarted`, one job per call.

use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use analysis_engine::{ProgressEvent, ProgressSink};
use sightline_kernel::TriangleBuffer;

use crate::dispatch;
use crate::engine_state::EngineState;
use crate::messages::{EngineToUi, UiToEngine};
use crate::worker::{progress_envelope, PointJob, VolumeJob};

// Global engine state, single-threaded in the web worker.
thread_local! {
    static ENGINE_STATE: std::cell::RefCell<Option<EngineState>> = std::cell::RefCell::new(None);
}

/// Initialize the engine. Must be called once before `process_message`.
#[wasm_bindgen]
pub fn init() {
    console_error_panic_hook::set_once();

    ENGINE_STATE.with(|cell| {
        *cell.borrow_mut() = Some(EngineState::new());
    });
}

/// Process a JSON `UiToEngine` message and return a JSON `EngineToUi`
/// response.
#[wasm_bindgen]
pub fn process_message(json_input: &str) -> String {
    let response = ENGINE_STATE.with(|cell| {
        let mut engine = cell.borrow_mut();
        let Some(state) = engine.as_mut() else {
            return EngineToUi::Error {
                message: "engine not initialized, call init() first".to_string(),
            };
        };

        match serde_json::from_str::<UiToEngine>(json_input) {
            Ok(msg) => dispatch::dispatch(state, msg),
            Err(e) => {
                web_sys::console::warn_1(&JsValue::from_str(&format!("bad message: {e}")));
                EngineToUi::Error {
                    message: format!("Failed to parse message: {}", e),
                }
            }
        }
    });

    to_json(&response)
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        format!(r#"{{"type":"Error","message":"Serialization failed: {}"}}"#, e)
    })
}

/// Forwards progress to a JS callback as a JSON progress envelope, ready to
/// be posted back as the `envelope` of a `*WorkerEnvelope` message.
struct JsProgress<'a> {
    generation: u64,
    callback: &'a js_sys::Function,
}

impl ProgressSink for JsProgress<'_> {
    fn progress(&mut self, event: ProgressEvent) {
        let json = to_json(&progress_envelope::<()>(self.generation, event.percent));
        if let Err(e) = self.callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
            web_sys::console::warn_1(&JsValue::from_str(&format!(
                "progress callback failed for job {}: {e:?}",
                self.generation
            )));
        }
    }
}

fn parse_job<T: DeserializeOwned>(request_json: &str, what: &str) -> Result<T, String> {
    serde_json::from_str(request_json).map_err(|e| {
        to_json(&EngineToUi::Error {
            message: format!("Failed to parse {what} job: {e}"),
        })
    })
}

/// Worker entry point for the mutual-visibility analysis. Takes the
/// `VolumeJob` from `AnalysisStarted` and returns a JSON `Envelope` to post
/// back as `VolumeWorkerEnvelope`.
#[wasm_bindgen]
pub fn analyze_view_from_volume(
    scene_vertex_positions: &[f32],
    request_json: &str,
    progress: &js_sys::Function,
) -> String {
    let job: VolumeJob = match parse_job(request_json, "volume") {
        Ok(job) => job,
        Err(response) => return response,
    };
    let scene = TriangleBuffer::new(scene_vertex_positions.to_vec());
    let mut sink = JsProgress {
        generation: job.generation,
        callback: progress,
    };
    to_json(&job.run(&scene, &mut sink))
}

/// Worker entry point for the single-point inspection; the reply goes back
/// as `PointWorkerEnvelope`.
#[wasm_bindgen]
pub fn analyze_view_from_point(
    scene_vertex_positions: &[f32],
    request_json: &str,
    progress: &js_sys::Function,
) -> String {
    let job: PointJob = match parse_job(request_json, "point") {
        Ok(job) => job,
        Err(response) => return response,
    };
    let scene = TriangleBuffer::new(scene_vertex_positions.to_vec());
    let mut sink = JsProgress {
        generation: job.generation,
        callback: progress,
    };
    to_json(&job.run(&scene, &mut sink))
}
