use serde::{Deserialize, Serialize};

use analysis_engine::{Envelope, Lane, PointAnalysis, VolumeAnalysis};
use sightline_kernel::{Footprint, Point3d};
use sightline_types::{CategorizedPath, DensitySettings, ElementSelection, LevelShare, Role};

use crate::render::RenderUpdate;
use crate::worker::WorkerJob;

/// Messages from the UI (JavaScript main thread) to the engine.
/// Serialized as JSON for postMessage transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UiToEngine {
    // -- Scene --
    /// Replace the occluding scene. Chunks are concatenated in order.
    SetScene { chunks: Vec<Vec<f32>> },
    /// Replace the terrain used to project area samples.
    SetTerrain { chunks: Vec<Vec<f32>> },
    /// Normalize host paths before fetching scene geometry.
    ResolveScenePaths { paths: Vec<CategorizedPath> },

    // -- Selection --
    /// New selection for one role, with the geometry the host resolved for it.
    SetSelection {
        role: Role,
        selection: ElementSelection,
        #[serde(default)]
        volume_chunks: Vec<Vec<f32>>,
        #[serde(default)]
        footprints: Vec<Footprint>,
    },

    // -- Settings --
    /// A persisted setting changed. `value` is `None` when the key was removed.
    ChangeSetting { key: String, value: Option<String> },

    // -- Volume analysis --
    RunVolumeAnalysis,
    CancelVolumeAnalysis,

    // -- Inspection --
    /// Analyze the view from one picked point against the visible targets.
    InspectPoint { point: Point3d },
    EndInspection,

    // -- External execution --
    /// Progress or outcome of a volume job the host ran in a worker.
    VolumeWorkerEnvelope { envelope: Envelope<VolumeAnalysis> },
    PointWorkerEnvelope { envelope: Envelope<PointAnalysis> },

    /// Drain progress and results of both lanes.
    Poll,
}

/// Messages from the engine to the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineToUi {
    SceneUpdated { triangles: usize },

    TerrainUpdated { triangles: usize },

    ScenePaths { paths: Vec<String> },

    /// Point set of a role was resampled.
    PointsUpdated {
        role: Role,
        count: usize,
        element_colors: Vec<ElementColor>,
        render: Vec<RenderUpdate>,
    },

    SettingsChanged {
        settings: DensitySettings,
        render: Vec<RenderUpdate>,
    },

    AnalysisStarted {
        lane: Lane,
        generation: u64,
        render: Vec<RenderUpdate>,
        /// Set when the host must run the job itself.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job: Option<WorkerJob>,
    },

    AnalysisCancelled { lane: Lane, was_running: bool },

    AnalysisProgress { lane: Lane, percent: u8 },

    VolumeAnalysisComplete {
        stats: Vec<LevelShare>,
        visible_targets: usize,
        render: Vec<RenderUpdate>,
    },

    PointAnalysisComplete {
        analysis: PointAnalysis,
        /// Share of visible targets, `None` without targets.
        percentage: Option<f64>,
        render: Vec<RenderUpdate>,
    },

    AnalysisFailed { lane: Lane, reason: String },

    InspectionCleared { render: Vec<RenderUpdate> },

    /// The request was valid but there was nothing to do.
    Ignored { reason: String },

    /// Several responses at once, in order.
    Batch { messages: Vec<EngineToUi> },

    /// An error occurred in the engine.
    Error { message: String },
}

/// Highlight color for a selected host element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementColor {
    pub path: String,
    pub color: String,
}
