use serde::{Deserialize, Serialize};
use sightline_kernel::{MeasurementPoint, Point3d, SceneError, VisibilityTolerance};
use sightline_types::{coverage_breakdown, LevelShare};

/// Which target points one source point can see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointAnalysis {
    pub source_point: Point3d,
    pub hits: Vec<Point3d>,
    pub misses: Vec<Point3d>,
}

impl PointAnalysis {
    /// Share of targets that are visible, as a percentage. `None` when there
    /// were no targets to inspect.
    pub fn inspection_percentage(&self) -> Option<f64> {
        let total = self.hits.len() + self.misses.len();
        if total == 0 {
            None
        } else {
            Some(self.hits.len() as f64 / total as f64 * 100.0)
        }
    }
}

/// Fraction of the visible targets a visible source point can see.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePointCoverage {
    pub position: Point3d,
    /// In `[0, 1]`.
    pub percentage: f64,
}

/// Result of a many-to-many visibility analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeAnalysis {
    pub source_point_coverage: Vec<SourcePointCoverage>,
    pub visible_target_points: Vec<MeasurementPoint>,
}

impl VolumeAnalysis {
    pub fn coverages(&self) -> Vec<f64> {
        self.source_point_coverage.iter().map(|c| c.percentage).collect()
    }

    /// Share of visible sources in each visibility level.
    pub fn level_breakdown(&self) -> Vec<LevelShare> {
        coverage_breakdown(&self.coverages())
    }
}

/// Progress of a running analysis, `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub percent: u8,
}

impl ProgressEvent {
    pub fn new(percent: u8) -> Self {
        Self {
            percent: percent.min(100),
        }
    }
}

/// A slice of the overall progress range assigned to one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressBand {
    pub start: u8,
    pub end: u8,
}

impl ProgressBand {
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    pub fn width(&self) -> usize {
        usize::from(self.end.saturating_sub(self.start))
    }
}

/// Progress bands of the three mutual-visibility phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressBands {
    pub visible_sources: ProgressBand,
    pub visible_targets: ProgressBand,
    pub coverage: ProgressBand,
}

impl Default for ProgressBands {
    fn default() -> Self {
        Self {
            visible_sources: ProgressBand::new(0, 30),
            visible_targets: ProgressBand::new(30, 60),
            coverage: ProgressBand::new(60, 100),
        }
    }
}

impl ProgressBands {
    /// Bands must follow phase order without overlapping and end by 100.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let bands = [self.visible_sources, self.visible_targets, self.coverage];
        let mut floor = 0;
        for band in bands {
            if band.start > band.end || band.end > 100 || band.start < floor {
                return Err(AnalysisError::InvalidBand {
                    start: band.start,
                    end: band.end,
                });
            }
            floor = band.end;
        }
        Ok(())
    }
}

/// Knobs shared by both analyses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    pub tolerance: VisibilityTolerance,
    pub bands: ProgressBands,
    /// Maximum triangles per BVH leaf for the per-run scene.
    pub bvh_leaf_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tolerance: VisibilityTolerance::default(),
            bands: ProgressBands::default(),
            bvh_leaf_size: 4,
        }
    }
}

/// Errors from running an analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The run was superseded or stopped. Not a failure from the user's view.
    #[error("analysis cancelled")]
    Cancelled,

    #[error("scene build failed: {0}")]
    Scene(#[from] SceneError),

    #[error("invalid progress band {start}..{end}")]
    InvalidBand { start: u8, end: u8 },

    #[error("failed to spawn analysis worker: {0}")]
    Spawn(#[from] std::io::Error),
}
