//! JSON bridge between the host UI and the visibility engine.
//!
//! The UI sends [`UiToEngine`] messages and receives [`EngineToUi`]
//! responses. Analyses run on background lanes; the UI drains them with
//! `Poll`. On `wasm32` there are no threads: a started analysis comes back as
//! a [`WorkerJob`] for a Web Worker, which runs it through `wasm_api` and
//! posts the envelope back.

pub mod dispatch;
pub mod engine_state;
pub mod messages;
pub mod render;
pub mod worker;

#[cfg(target_arch = "wasm32")]
pub mod wasm_api;

pub use dispatch::dispatch;
pub use engine_state::{BridgeError, EngineConfig, EngineState, Resample, RoleInput, Started};
pub use messages::{ElementColor, EngineToUi, UiToEngine};
pub use render::{Layer, LineGroup, Marker, PointGroup, RenderUpdate};
pub use worker::{Execution, PointJob, VolumeJob, WorkerJob};
