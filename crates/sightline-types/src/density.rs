use serde::{Deserialize, Serialize};

/// Persisted setting key for the source density preset.
pub const SOURCE_DENSITY_KEY: &str = "tracingDensity-source";
/// Persisted setting key for the target density preset.
pub const TARGET_DENSITY_KEY: &str = "tracingDensity-target";
/// Persisted setting key for the view-lines toggle.
pub const SHOW_VIEW_LINES_KEY: &str = "showViewLines";

/// Which side of the analysis a point set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Source,
    Target,
}

impl Role {
    /// The settings key holding this role's density preset.
    pub fn density_key(&self) -> &'static str {
        match self {
            Role::Source => SOURCE_DENSITY_KEY,
            Role::Target => TARGET_DENSITY_KEY,
        }
    }
}

/// Named sampling density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityPreset {
    High,
    #[default]
    Medium,
    Low,
}

impl DensityPreset {
    /// Parse a persisted preset name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "high" => Some(DensityPreset::High),
            "medium" => Some(DensityPreset::Medium),
            "low" => Some(DensityPreset::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DensityPreset::High => "high",
            DensityPreset::Medium => "medium",
            DensityPreset::Low => "low",
        }
    }
}

/// Sampling parameters shared by the surface and area samplers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityParameters {
    /// Minimum separation between surface samples (meters).
    pub min_distance: f64,
    /// Rejection attempts per active point before it is exhausted.
    pub max_attempts: u32,
    /// Area grid samples per meter.
    pub resolution: f64,
}

impl DensityParameters {
    pub const fn new(min_distance: f64, max_attempts: u32, resolution: f64) -> Self {
        Self {
            min_distance,
            max_attempts,
            resolution,
        }
    }

    /// Check the positivity invariants.
    pub fn validate(&self) -> Result<(), DensityError> {
        if !(self.min_distance.is_finite() && self.min_distance > 0.0) {
            return Err(DensityError::InvalidMinDistance(self.min_distance));
        }
        if self.max_attempts == 0 {
            return Err(DensityError::ZeroAttempts);
        }
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(DensityError::InvalidResolution(self.resolution));
        }
        Ok(())
    }
}

/// Preset values for one role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityTable {
    pub high: DensityParameters,
    pub medium: DensityParameters,
    pub low: DensityParameters,
}

impl DensityTable {
    pub fn get(&self, preset: DensityPreset) -> DensityParameters {
        match preset {
            DensityPreset::High => self.high,
            DensityPreset::Medium => self.medium,
            DensityPreset::Low => self.low,
        }
    }
}

impl Default for DensityTable {
    fn default() -> Self {
        Self {
            high: DensityParameters::new(1.5, 5, 0.5),
            medium: DensityParameters::new(2.0, 5, 0.4),
            low: DensityParameters::new(3.0, 5, 0.3),
        }
    }
}

/// Per-role preset tables. Both roles currently carry the same numbers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DensityPresets {
    pub source: DensityTable,
    pub target: DensityTable,
}

impl DensityPresets {
    pub fn resolve(&self, role: Role, preset: DensityPreset) -> DensityParameters {
        match role {
            Role::Source => self.source.get(preset),
            Role::Target => self.target.get(preset),
        }
    }
}

/// User-facing settings resolved from the persisted key/value flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensitySettings {
    pub source: DensityPreset,
    pub target: DensityPreset,
    pub show_view_lines: bool,
}

impl Default for DensitySettings {
    fn default() -> Self {
        Self {
            source: DensityPreset::Medium,
            target: DensityPreset::Medium,
            show_view_lines: true,
        }
    }
}

impl DensitySettings {
    /// Resolve settings from a key/value lookup. Missing or unknown values
    /// fall back to the defaults; view lines are on unless stored as `"false"`.
    pub fn from_store<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let preset = |key: &str| {
            lookup(key)
                .as_deref()
                .and_then(DensityPreset::parse)
                .unwrap_or_default()
        };
        Self {
            source: preset(SOURCE_DENSITY_KEY),
            target: preset(TARGET_DENSITY_KEY),
            show_view_lines: lookup(SHOW_VIEW_LINES_KEY).as_deref() != Some("false"),
        }
    }

    /// Apply a single changed key, as delivered by a storage event.
    pub fn apply_change(&mut self, key: &str, value: Option<&str>) {
        match key {
            SOURCE_DENSITY_KEY => {
                self.source = value.and_then(DensityPreset::parse).unwrap_or_default();
            }
            TARGET_DENSITY_KEY => {
                self.target = value.and_then(DensityPreset::parse).unwrap_or_default();
            }
            SHOW_VIEW_LINES_KEY => self.show_view_lines = value != Some("false"),
            _ => {}
        }
    }

    pub fn preset_for(&self, role: Role) -> DensityPreset {
        match role {
            Role::Source => self.source,
            Role::Target => self.target,
        }
    }
}

/// Invalid density parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DensityError {
    #[error("minimum distance must be positive, got {0}")]
    InvalidMinDistance(f64),

    #[error("max attempts must be at least 1")]
    ZeroAttempts,

    #[error("resolution must be positive, got {0}")]
    InvalidResolution(f64),
}
