use serde::{Deserialize, Serialize};

/// Discretized visibility bucket derived from a coverage fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisibilityLevel {
    Complete,
    High,
    Medium,
    Low,
    None,
}

impl VisibilityLevel {
    /// Display order, most visible first.
    pub const ORDER: [VisibilityLevel; 5] = [
        VisibilityLevel::Complete,
        VisibilityLevel::High,
        VisibilityLevel::Medium,
        VisibilityLevel::Low,
        VisibilityLevel::None,
    ];

    /// Bucket a coverage fraction in `[0, 1]`. Thresholds are exclusive.
    pub fn from_coverage(coverage: f64) -> Self {
        if coverage > 0.9 {
            VisibilityLevel::Complete
        } else if coverage > 0.5 {
            VisibilityLevel::High
        } else if coverage > 0.1 {
            VisibilityLevel::Medium
        } else if coverage > 0.0 {
            VisibilityLevel::Low
        } else {
            VisibilityLevel::None
        }
    }

    /// Display color, lightest for `Complete`, darkest for `None`.
    pub fn color(&self) -> &'static str {
        match self {
            VisibilityLevel::Complete => "#9BD5EF",
            VisibilityLevel::High => "#38ABDF",
            VisibilityLevel::Medium => "#007FC6",
            VisibilityLevel::Low => "#074B78",
            VisibilityLevel::None => "#0A324D",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VisibilityLevel::Complete => "Complete",
            VisibilityLevel::High => "High",
            VisibilityLevel::Medium => "Medium",
            VisibilityLevel::Low => "Low",
            VisibilityLevel::None => "None",
        }
    }
}

/// Share of analyzed points falling into one visibility level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelShare {
    pub level: VisibilityLevel,
    pub ratio: f64,
    pub color: String,
    pub text: String,
}

/// Summarize coverage values into per-level ratios.
///
/// Only levels that occur are listed, ordered `Complete` to `None`.
/// An empty input yields an empty summary.
pub fn coverage_breakdown(coverages: &[f64]) -> Vec<LevelShare> {
    if coverages.is_empty() {
        return Vec::new();
    }

    let mut counts = [0usize; 5];
    for &c in coverages {
        let level = VisibilityLevel::from_coverage(c);
        if let Some(slot) = VisibilityLevel::ORDER.iter().position(|l| *l == level) {
            counts[slot] += 1;
        }
    }

    let total = coverages.len() as f64;
    VisibilityLevel::ORDER
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(level, count)| LevelShare {
            level: *level,
            ratio: count as f64 / total,
            color: level.color().to_string(),
            text: level.label().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucketing_boundaries() {
        let inputs = [0.0, 0.05, 0.1, 0.3, 0.5, 0.7, 0.9, 0.95, 1.0];
        let expected = [
            VisibilityLevel::None,
            VisibilityLevel::Low,
            VisibilityLevel::Low,
            VisibilityLevel::Medium,
            VisibilityLevel::Medium,
            VisibilityLevel::High,
            VisibilityLevel::High,
            VisibilityLevel::Complete,
            VisibilityLevel::Complete,
        ];
        for (c, level) in inputs.iter().zip(expected) {
            assert_eq!(VisibilityLevel::from_coverage(*c), level, "coverage {c}");
        }
    }

    #[test]
    fn test_breakdown_orders_and_skips_missing_levels() {
        let shares = coverage_breakdown(&[0.0, 1.0, 1.0, 0.3]);
        let labels: Vec<_> = shares.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(labels, vec!["Complete", "Medium", "None"]);
        assert!((shares[0].ratio - 0.5).abs() < 1e-12);
        assert!((shares[1].ratio - 0.25).abs() < 1e-12);
        assert_eq!(shares[2].color, "#0A324D");
    }

    #[test]
    fn test_breakdown_empty() {
        assert!(coverage_breakdown(&[]).is_empty());
    }
}
