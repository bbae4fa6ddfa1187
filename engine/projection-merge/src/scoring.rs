//! League scoring rules

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{MergeError, Result};

/// Stat key to projected or actual value
pub type StatLine = BTreeMap<String, f64>;

/// Common stat keys
pub mod stats {
    pub const PASSING_YARDS: &str = "passing_yards";
    pub const PASSING_TDS: &str = "passing_tds";
    pub const INTERCEPTIONS: &str = "interceptions";
    pub const RUSHING_YARDS: &str = "rushing_yards";
    pub const RUSHING_TDS: &str = "rushing_tds";
    pub const RECEPTIONS: &str = "receptions";
    pub const RECEIVING_YARDS: &str = "receiving_yards";
    pub const RECEIVING_TDS: &str = "receiving_tds";
    pub const FUMBLES_LOST: &str = "fumbles_lost";
    pub const TWO_POINT_CONVERSIONS: &str = "two_point_conversions";
    pub const FIELD_GOALS: &str = "field_goals";
    pub const EXTRA_POINTS: &str = "extra_points";
}

/// Points awarded per unit of each stat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub format_id: String,
    pub points: BTreeMap<String, f64>,
}

impl ScoringRules {
    /// Validated rules
    pub fn new(format_id: impl Into<String>, points: BTreeMap<String, f64>) -> Result<Self> {
        let rules = Self { format_id: format_id.into(), points };
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> Result<()> {
        for (stat, value) in &self.points {
            if stat.is_empty() {
                return Err(MergeError::InvalidScoringRule {
                    format_id: self.format_id.clone(),
                    stat: stat.clone(),
                    reason: "empty stat key".to_string(),
                });
            }
            if !value.is_finite() {
                return Err(MergeError::InvalidScoringRule {
                    format_id: self.format_id.clone(),
                    stat: stat.clone(),
                    reason: format!("non-finite points value {value}"),
                });
            }
        }
        Ok(())
    }

    /// Standard scoring: no points per reception
    pub fn standard() -> Self {
        Self::with_reception_points("standard", 0.0)
    }

    pub fn half_ppr() -> Self {
        Self::with_reception_points("half_ppr", 0.5)
    }

    pub fn ppr() -> Self {
        Self::with_reception_points("ppr", 1.0)
    }

    /// Built-in preset by format id
    pub fn preset(format_id: &str) -> Option<Self> {
        match format_id {
            "standard" => Some(Self::standard()),
            "half_ppr" | "half-ppr" => Some(Self::half_ppr()),
            "ppr" => Some(Self::ppr()),
            _ => None,
        }
    }

    fn with_reception_points(format_id: &str, reception: f64) -> Self {
        let points = [
            (stats::PASSING_YARDS, 0.04),
            (stats::PASSING_TDS, 4.0),
            (stats::INTERCEPTIONS, -2.0),
            (stats::RUSHING_YARDS, 0.1),
            (stats::RUSHING_TDS, 6.0),
            (stats::RECEPTIONS, reception),
            (stats::RECEIVING_YARDS, 0.1),
            (stats::RECEIVING_TDS, 6.0),
            (stats::FUMBLES_LOST, -2.0),
            (stats::TWO_POINT_CONVERSIONS, 2.0),
            (stats::FIELD_GOALS, 3.0),
            (stats::EXTRA_POINTS, 1.0),
        ]
        .into_iter()
        .map(|(stat, value)| (stat.to_string(), value))
        .collect();

        Self { format_id: format_id.to_string(), points }
    }

    /// Whether the stat contributes to fantasy points
    pub fn is_scoring_stat(&self, stat: &str) -> bool {
        self.points.contains_key(stat)
    }

    /// Fantasy points for a stat line; unscored stats are ignored
    pub fn score(&self, line: &StatLine) -> f64 {
        line.iter()
            .filter_map(|(stat, value)| self.points.get(stat).map(|points| points * value))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(entries: &[(&str, f64)]) -> StatLine {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_ppr_scoring() {
        let rules = ScoringRules::ppr();
        let wr = line(&[
            (stats::RECEPTIONS, 6.0),
            (stats::RECEIVING_YARDS, 85.0),
            (stats::RECEIVING_TDS, 1.0),
        ]);
        assert!((rules.score(&wr) - 20.5).abs() < 1e-9);
        assert!((ScoringRules::standard().score(&wr) - 14.5).abs() < 1e-9);
        assert!((ScoringRules::half_ppr().score(&wr) - 17.5).abs() < 1e-9);
    }

    #[test]
    fn test_unscored_stats_ignored() {
        let rules = ScoringRules::standard();
        let qb = line(&[(stats::PASSING_YARDS, 300.0), ("sacks_taken", 4.0)]);
        assert!((rules.score(&qb) - 12.0).abs() < 1e-9);
        assert!(!rules.is_scoring_stat("sacks_taken"));
    }

    #[test]
    fn test_presets() {
        assert_eq!(ScoringRules::preset("half-ppr").unwrap().format_id, "half_ppr");
        assert!(ScoringRules::preset("superflex_te_premium").is_none());
    }

    #[test]
    fn test_invalid_rule_rejected() {
        let points = BTreeMap::from([(stats::PASSING_TDS.to_string(), f64::NAN)]);
        let err = ScoringRules::new("custom", points).unwrap_err();
        assert!(matches!(err, MergeError::InvalidScoringRule { ref format_id, .. } if format_id == "custom"));
    }
}
