//! Analysis jobs handed to an out-of-process worker.
//!
//! With [`Execution::External`] the engine does not spawn threads. Starting
//! an analysis returns a [`WorkerJob`]; the host runs it in a Web Worker
//! against the scene buffer it already holds and posts the resulting
//! [`Envelope`] back as a `*WorkerEnvelope` message.

use serde::{Deserialize, Serialize};

use analysis_engine::{
    analyze_view_from_point, analyze_view_from_volume, AnalysisConfig, AnalysisError, Envelope,
    PointAnalysis, ProgressEvent, ProgressSink, VolumeAnalysis, WorkerMessage,
};
use sightline_kernel::{MeasurementPoint, Point3d, TriangleBuffer};

/// Where lane jobs execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Execution {
    /// On background threads owned by the engine.
    Threads,
    /// In a host worker; results come back as envelopes.
    External,
}

impl Default for Execution {
    fn default() -> Self {
        if cfg!(target_arch = "wasm32") {
            Execution::External
        } else {
            Execution::Threads
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeJob {
    pub generation: u64,
    pub source_points: Vec<MeasurementPoint>,
    pub target_points: Vec<MeasurementPoint>,
    #[serde(default)]
    pub config: AnalysisConfig,
}

impl VolumeJob {
    pub fn run<P: ProgressSink + ?Sized>(&self, scene: &TriangleBuffer, sink: &mut P) -> Envelope<VolumeAnalysis> {
        let result = analyze_view_from_volume(scene, &self.source_points, &self.target_points, &self.config, sink);
        envelope(self.generation, result)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointJob {
    pub generation: u64,
    pub source_point: Point3d,
    pub visible_target_points: Vec<MeasurementPoint>,
    #[serde(default)]
    pub config: AnalysisConfig,
}

impl PointJob {
    pub fn run<P: ProgressSink + ?Sized>(&self, scene: &TriangleBuffer, sink: &mut P) -> Envelope<PointAnalysis> {
        let result = analyze_view_from_point(
            scene,
            self.source_point,
            &self.visible_target_points,
            &self.config,
            sink,
        );
        envelope(self.generation, result)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum WorkerJob {
    Volume(VolumeJob),
    Point(PointJob),
}

/// Wrap a finished run. Cancellation has no terminal message of its own, so
/// it is reported like any other failure here; the lane drops it anyway
/// once the job is superseded.
pub fn envelope<R>(generation: u64, result: Result<R, AnalysisError>) -> Envelope<R> {
    let message = match result {
        Ok(r) => WorkerMessage::Result(r),
        Err(e) => WorkerMessage::Failed {
            reason: e.to_string(),
        },
    };
    Envelope {
        generation,
        message,
    }
}

/// Progress envelope for a worker's progress callback.
pub fn progress_envelope<R>(generation: u64, percent: u8) -> Envelope<R> {
    Envelope {
        generation,
        message: WorkerMessage::Progress(ProgressEvent::new(percent)),
    }
}
