use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use analysis_engine::{
    analyze_view_from_point, analyze_view_from_volume, AnalysisConfig, AnalysisError, Envelope, Lane,
    LaneController, PointAnalysis, VolumeAnalysis, WorkerMessage,
};
use sightline_kernel::sampling::{poisson_disk_sample, project_to_terrain, sample_footprints};
use sightline_kernel::{Footprint, MeasurementPoint, Point3d, SamplingConfig, SamplingError, TriangleBuffer};
use sightline_types::{DensityError, DensityPresets, DensitySettings, ElementSelection, LevelShare, Role};

use crate::worker::{Execution, PointJob, VolumeJob, WorkerJob};

/// Engine-wide knobs. A fixed seed makes sampling reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub analysis: AnalysisConfig,
    pub sampling: SamplingConfig,
    pub presets: DensityPresets,
    pub seed: u64,
    #[serde(default)]
    pub execution: Execution,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            sampling: SamplingConfig::default(),
            presets: DensityPresets::default(),
            seed: 0x5167_471e,
            execution: Execution::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }
}

/// What the host resolved for one role's selection.
#[derive(Debug, Clone, Default)]
pub struct RoleInput {
    pub selection: ElementSelection,
    pub volume_mesh: TriangleBuffer,
    pub footprints: Vec<Footprint>,
}

/// Orchestrator state behind the bridge.
///
/// Holds the scene, the per-role selections and point sets, the two
/// analysis lanes and the results the UI still shows.
pub struct EngineState {
    pub config: EngineConfig,
    pub settings: DensitySettings,
    scene: Option<Arc<TriangleBuffer>>,
    terrain: TriangleBuffer,
    inputs: HashMap<Role, RoleInput>,
    points: HashMap<Role, Arc<Vec<MeasurementPoint>>>,
    volume_lane: LaneController<VolumeAnalysis>,
    point_lane: LaneController<PointAnalysis>,
    /// Targets seen by at least one source in the last volume analysis.
    visible_targets: Option<Arc<Vec<MeasurementPoint>>>,
    stats: Option<Vec<LevelShare>>,
    last_inspection: Option<PointAnalysis>,
    inspecting: bool,
    rng: StdRng,
}

impl EngineState {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default(), DensitySettings::default())
    }

    pub fn with_config(config: EngineConfig, settings: DensitySettings) -> Self {
        Self {
            config,
            settings,
            scene: None,
            terrain: TriangleBuffer::default(),
            inputs: HashMap::new(),
            points: HashMap::new(),
            volume_lane: LaneController::new(Lane::Volume),
            point_lane: LaneController::new(Lane::Point),
            visible_targets: None,
            stats: None,
            last_inspection: None,
            inspecting: false,
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    // -- Scene --

    pub fn set_scene(&mut self, scene: TriangleBuffer) -> usize {
        let triangles = scene.triangle_count();
        self.scene = if scene.is_empty() { None } else { Some(Arc::new(scene)) };
        debug!(triangles, "scene replaced");
        triangles
    }

    pub fn has_scene(&self) -> bool {
        self.scene.is_some()
    }

    pub fn set_terrain(&mut self, terrain: TriangleBuffer) -> usize {
        let triangles = terrain.triangle_count();
        self.terrain = terrain;
        debug!(triangles, "terrain replaced");
        triangles
    }

    // -- Point sets --

    pub fn input(&self, role: Role) -> Option<&RoleInput> {
        self.inputs.get(&role)
    }

    pub fn points(&self, role: Role) -> Option<&[MeasurementPoint]> {
        self.points.get(&role).map(|p| p.as_slice())
    }

    pub fn visible_targets(&self) -> Option<&[MeasurementPoint]> {
        self.visible_targets.as_deref().map(Vec::as_slice)
    }

    pub fn stats(&self) -> Option<&[LevelShare]> {
        self.stats.as_deref()
    }

    /// Store a role's selection and resample its points.
    pub fn set_selection(&mut self, role: Role, input: RoleInput) -> Result<Resample, BridgeError> {
        self.inputs.insert(role, input);
        self.resample(role)
    }

    /// Recompute the point set of `role` from its stored selection with the
    /// current density preset. Area samples come first, then volume samples.
    #[instrument(skip(self))]
    pub fn resample(&mut self, role: Role) -> Result<Resample, BridgeError> {
        let Some(input) = self.inputs.get(&role) else {
            return Err(BridgeError::NoSelection { role });
        };
        let params = self
            .config
            .presets
            .resolve(role, self.settings.preset_for(role));
        params.validate()?;

        let grid = sample_footprints(&input.footprints, params.resolution)?;
        let mut points = project_to_terrain(&grid, &self.terrain, &self.config.sampling)?;
        let volume = poisson_disk_sample(
            &input.volume_mesh,
            params.min_distance,
            params.max_attempts,
            &mut self.rng,
        )?;
        points.extend(volume);

        info!(role = ?role, points = points.len(), "point set resampled");
        self.points.insert(role, Arc::new(points));

        // A finished volume analysis no longer matches the point sets.
        let other = match role {
            Role::Source => Role::Target,
            Role::Target => Role::Source,
        };
        let stale = if self.stats.is_some() && self.points.contains_key(&other) {
            self.stats = None;
            Some(other)
        } else {
            None
        };
        Ok(Resample { role, stale })
    }

    // -- Settings --

    /// Apply a changed setting. Returns the role whose density changed, if
    /// any, so the caller can resample it.
    pub fn change_setting(&mut self, key: &str, value: Option<&str>) -> Option<Role> {
        let before = self.settings;
        self.settings.apply_change(key, value);
        [Role::Source, Role::Target]
            .into_iter()
            .find(|&role| before.preset_for(role) != self.settings.preset_for(role))
    }

    // -- Volume lane --

    /// Start a mutual-visibility run over the current point sets. Returns
    /// `Ok(None)` when an input is missing.
    pub fn start_volume_analysis(&mut self) -> Result<Option<Started>, BridgeError> {
        let (Some(scene), Some(sources), Some(targets)) = (
            self.scene.clone(),
            self.points.get(&Role::Source).cloned(),
            self.points.get(&Role::Target).cloned(),
        ) else {
            warn!("volume analysis requested without scene or point sets");
            return Ok(None);
        };
        self.stats = None;
        let config = self.config.analysis;
        if self.config.execution == Execution::External {
            let generation = self.volume_lane.begin_external();
            let job = WorkerJob::Volume(VolumeJob {
                generation,
                source_points: sources.to_vec(),
                target_points: targets.to_vec(),
                config,
            });
            return Ok(Some(Started::external(generation, job)));
        }
        let generation = self.volume_lane.start(move |ctx| {
            analyze_view_from_volume(&scene, &sources, &targets, &config, ctx)
        })?;
        Ok(Some(Started::threaded(generation)))
    }

    pub fn cancel_volume_analysis(&mut self) -> bool {
        self.volume_lane.cancel()
    }

    pub fn poll_volume(&mut self) -> Vec<WorkerMessage<VolumeAnalysis>> {
        self.volume_lane.poll()
    }

    /// Accept a volume envelope from an external worker.
    pub fn ingest_volume(&mut self, envelope: Envelope<VolumeAnalysis>) -> Option<WorkerMessage<VolumeAnalysis>> {
        self.volume_lane.ingest(envelope)
    }

    /// Block until the running volume job ends or `timeout` elapses.
    pub fn wait_volume(&mut self, timeout: Duration) -> Vec<WorkerMessage<VolumeAnalysis>> {
        self.volume_lane.wait(timeout)
    }

    /// Keep what the UI needs from a finished volume run.
    pub fn record_volume_result(&mut self, analysis: &VolumeAnalysis) -> Vec<LevelShare> {
        let stats = analysis.level_breakdown();
        self.visible_targets = Some(Arc::new(analysis.visible_target_points.clone()));
        self.stats = Some(stats.clone());
        stats
    }

    // -- Point lane --

    pub fn is_inspecting(&self) -> bool {
        self.inspecting
    }

    pub fn last_inspection(&self) -> Option<&PointAnalysis> {
        self.last_inspection.as_ref()
    }

    /// Start inspecting from `source` against the visible targets. Returns
    /// `Ok(None)` when there is no scene or no previous volume result.
    pub fn start_point_analysis(&mut self, source: Point3d) -> Result<Option<Started>, BridgeError> {
        if ![source.x, source.y, source.z].iter().all(|c| c.is_finite()) {
            return Err(BridgeError::InvalidPoint);
        }
        let (Some(scene), Some(targets)) = (self.scene.clone(), self.visible_targets.clone()) else {
            warn!("point analysis requested before a volume analysis");
            return Ok(None);
        };
        self.inspecting = true;
        let config = self.config.analysis;
        if self.config.execution == Execution::External {
            let generation = self.point_lane.begin_external();
            let job = WorkerJob::Point(PointJob {
                generation,
                source_point: source,
                visible_target_points: targets.to_vec(),
                config,
            });
            return Ok(Some(Started::external(generation, job)));
        }
        let generation = self.point_lane.start(move |ctx| {
            analyze_view_from_point(&scene, source, &targets, &config, ctx)
        })?;
        Ok(Some(Started::threaded(generation)))
    }

    pub fn poll_point(&mut self) -> Vec<WorkerMessage<PointAnalysis>> {
        self.point_lane.poll()
    }

    pub fn ingest_point(&mut self, envelope: Envelope<PointAnalysis>) -> Option<WorkerMessage<PointAnalysis>> {
        self.point_lane.ingest(envelope)
    }

    pub fn wait_point(&mut self, timeout: Duration) -> Vec<WorkerMessage<PointAnalysis>> {
        self.point_lane.wait(timeout)
    }

    pub fn record_point_result(&mut self, analysis: &PointAnalysis) {
        self.last_inspection = Some(analysis.clone());
    }

    /// Stop inspecting and forget the last inspection result.
    pub fn end_inspection(&mut self) {
        self.point_lane.cancel();
        self.inspecting = false;
        self.last_inspection = None;
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

/// A lane job that was just started.
#[derive(Debug, Clone, PartialEq)]
pub struct Started {
    pub generation: u64,
    /// Work for the host to run, with [`Execution::External`].
    pub job: Option<WorkerJob>,
}

impl Started {
    fn threaded(generation: u64) -> Self {
        Self { generation, job: None }
    }

    fn external(generation: u64, job: WorkerJob) -> Self {
        Self {
            generation,
            job: Some(job),
        }
    }
}

/// Outcome of resampling one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resample {
    pub role: Role,
    /// The opposite role, when a stale volume result was cleared and its
    /// preview must be redrawn.
    pub stale: Option<Role>,
}

/// Errors from the WASM bridge layer.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("no selection for {role:?}")]
    NoSelection { role: Role },

    #[error("point coordinates must be finite")]
    InvalidPoint,

    #[error("sampling error: {0}")]
    Sampling(#[from] SamplingError),

    #[error("invalid density parameters: {0}")]
    Density(#[from] DensityError),

    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}
