//! Renderer-agnostic scene output.
//!
//! The host turns each [`RenderUpdate`] into whatever its viewer needs and
//! replaces the previous content of the named layer.

use serde::{Deserialize, Serialize};

use analysis_engine::{PointAnalysis, VolumeAnalysis};
use sightline_kernel::{MeasurementPoint, Point3d};
use sightline_types::VisibilityLevel;

pub const SOURCE_COLOR: &str = "#CE55BA";
pub const SOURCE_COLOR_TRANSPARENT: &str = "#ce55ba22";
pub const TARGET_COLOR: &str = "#35A7A7";
pub const TARGET_COLOR_TRANSPARENT: &str = "#cdeaf766";
pub const INSPECTED_SOURCE_COLOR: &str = "#B37BFC";

/// Radius of the sphere and octahedron markers.
pub const MARKER_RADIUS: f64 = 0.6;

/// Overlay layers the engine draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layer {
    SourcePoints,
    TargetPoints,
    SourcePoint,
    Hitlines,
}

impl Layer {
    pub fn id(&self) -> &'static str {
        match self {
            Layer::SourcePoints => "source-points",
            Layer::TargetPoints => "target-points",
            Layer::SourcePoint => "source-point",
            Layer::Hitlines => "hitlines",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    Sphere,
    Octahedron,
}

/// Same-colored markers, drawn as one instanced batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGroup {
    pub color: String,
    pub marker: Marker,
    pub radius: f64,
    pub positions: Vec<Point3d>,
}

/// Same-colored line segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineGroup {
    pub color: String,
    pub segments: Vec<[Point3d; 2]>,
}

/// New content for one layer. An update with no groups clears the layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderUpdate {
    pub layer: Layer,
    pub points: Vec<PointGroup>,
    pub lines: Vec<LineGroup>,
}

impl RenderUpdate {
    pub fn empty(layer: Layer) -> Self {
        Self {
            layer,
            points: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.iter().all(|g| g.positions.is_empty())
            && self.lines.iter().all(|g| g.segments.is_empty())
    }
}

/// Group colored positions by color, keeping first-seen color order.
pub fn group_by_color<I>(points: I, marker: Marker) -> Vec<PointGroup>
where
    I: IntoIterator<Item = (Point3d, &'static str)>,
{
    let mut groups: Vec<PointGroup> = Vec::new();
    for (position, color) in points {
        match groups.iter_mut().find(|g| g.color == color) {
            Some(group) => group.positions.push(position),
            None => groups.push(PointGroup {
                color: color.to_string(),
                marker,
                radius: MARKER_RADIUS,
                positions: vec![position],
            }),
        }
    }
    groups
}

pub fn preview_source_points(points: &[MeasurementPoint]) -> RenderUpdate {
    RenderUpdate {
        layer: Layer::SourcePoints,
        points: group_by_color(points.iter().map(|p| (p.position, SOURCE_COLOR)), Marker::Sphere),
        lines: Vec::new(),
    }
}

pub fn preview_target_points(points: &[MeasurementPoint]) -> RenderUpdate {
    RenderUpdate {
        layer: Layer::TargetPoints,
        points: group_by_color(
            points.iter().map(|p| (p.position, TARGET_COLOR)),
            Marker::Octahedron,
        ),
        lines: Vec::new(),
    }
}

/// Source points colored by their visibility level.
pub fn volume_result(analysis: &VolumeAnalysis) -> RenderUpdate {
    let colored = analysis
        .source_point_coverage
        .iter()
        .map(|c| (c.position, VisibilityLevel::from_coverage(c.percentage).color()));
    RenderUpdate {
        layer: Layer::SourcePoints,
        points: group_by_color(colored, Marker::Sphere),
        lines: Vec::new(),
    }
}

/// Targets of a point inspection: hits in the `Complete` color, misses in
/// the `None` color.
pub fn point_result(analysis: &PointAnalysis) -> RenderUpdate {
    let hits = analysis
        .hits
        .iter()
        .map(|p| (*p, VisibilityLevel::Complete.color()));
    let misses = analysis
        .misses
        .iter()
        .map(|p| (*p, VisibilityLevel::None.color()));
    RenderUpdate {
        layer: Layer::TargetPoints,
        points: group_by_color(hits.chain(misses), Marker::Octahedron),
        lines: Vec::new(),
    }
}

/// One segment from the inspected source to each visible target.
pub fn hitlines(analysis: &PointAnalysis) -> RenderUpdate {
    let mut update = RenderUpdate::empty(Layer::Hitlines);
    if !analysis.hits.is_empty() {
        update.lines.push(LineGroup {
            color: VisibilityLevel::Complete.color().to_string(),
            segments: analysis
                .hits
                .iter()
                .map(|hit| [analysis.source_point, *hit])
                .collect(),
        });
    }
    update
}

pub fn source_point(position: Point3d) -> RenderUpdate {
    RenderUpdate {
        layer: Layer::SourcePoint,
        points: vec![PointGroup {
            color: INSPECTED_SOURCE_COLOR.to_string(),
            marker: Marker::Sphere,
            radius: MARKER_RADIUS,
            positions: vec![position],
        }],
        lines: Vec::new(),
    }
}

pub fn clear_inspection() -> Vec<RenderUpdate> {
    vec![
        RenderUpdate::empty(Layer::Hitlines),
        RenderUpdate::empty(Layer::SourcePoint),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_engine::SourcePointCoverage;

    fn p(x: f64) -> Point3d {
        Point3d::new(x, 0.0, 0.0)
    }

    #[test]
    fn test_volume_result_groups_by_level() {
        let analysis = VolumeAnalysis {
            source_point_coverage: vec![
                SourcePointCoverage { position: p(0.0), percentage: 1.0 },
                SourcePointCoverage { position: p(1.0), percentage: 0.2 },
                SourcePointCoverage { position: p(2.0), percentage: 0.95 },
            ],
            visible_target_points: Vec::new(),
        };
        let update = volume_result(&analysis);
        assert_eq!(update.layer, Layer::SourcePoints);
        assert_eq!(update.points.len(), 2);
        assert_eq!(update.points[0].color, "#9BD5EF");
        assert_eq!(update.points[0].positions, vec![p(0.0), p(2.0)]);
        assert_eq!(update.points[1].color, "#007FC6");
        assert!(update.points.iter().all(|g| g.marker == Marker::Sphere));
    }

    #[test]
    fn test_point_result_and_hitlines() {
        let analysis = PointAnalysis {
            source_point: p(-1.0),
            hits: vec![p(1.0), p(2.0)],
            misses: vec![p(3.0)],
        };
        let targets = point_result(&analysis);
        assert_eq!(targets.layer, Layer::TargetPoints);
        assert_eq!(targets.points[0].positions.len(), 2);
        assert_eq!(targets.points[1].color, "#0A324D");
        assert_eq!(targets.points[1].marker, Marker::Octahedron);

        let lines = hitlines(&analysis);
        assert_eq!(lines.lines[0].segments, vec![[p(-1.0), p(1.0)], [p(-1.0), p(2.0)]]);
    }

    #[test]
    fn test_hitlines_without_hits_is_empty() {
        let analysis = PointAnalysis {
            source_point: p(0.0),
            hits: Vec::new(),
            misses: vec![p(1.0)],
        };
        assert!(hitlines(&analysis).is_empty());
    }

    #[test]
    fn test_layer_ids_match_serde_names() {
        for layer in [Layer::SourcePoints, Layer::TargetPoints, Layer::SourcePoint, Layer::Hitlines] {
            let json = serde_json::to_string(&layer).unwrap();
            assert_eq!(json, format!("\"{}\"", layer.id()));
        }
    }
}
