//! Sportsbook market-implied stat lines

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::{MergeError, Result};
use crate::scoring::StatLine;
use crate::PlayerId;

/// Market data for one player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketLine {
    pub player_id: PlayerId,
    /// Implied mean per stat (e.g. a yardage over/under)
    pub lines: StatLine,
    /// Threshold ladders per stat: `[P(1+), P(2+), ...]`
    pub touchdown_ladders: BTreeMap<String, Vec<f64>>,
}

impl MarketLine {
    pub fn new(player_id: PlayerId) -> Self {
        Self { player_id, ..Default::default() }
    }

    pub fn with_line(mut self, stat: &str, value: f64) -> Self {
        self.lines.insert(stat.to_string(), value);
        self
    }

    pub fn with_ladder(mut self, stat: &str, probabilities: Vec<f64>) -> Self {
        self.touchdown_ladders.insert(stat.to_string(), probabilities);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.touchdown_ladders.is_empty()
    }

    /// Implied stat values; a ladder overrides a direct line for the same stat
    pub fn implied_stats(&self) -> Result<StatLine> {
        let mut implied: StatLine = self
            .lines
            .iter()
            .filter(|(_, value)| value.is_finite())
            .map(|(stat, value)| (stat.clone(), *value))
            .collect();

        for (stat, ladder) in &self.touchdown_ladders {
            let expected = expected_from_ladder(ladder).map_err(|(threshold, value)| {
                MergeError::InvalidProbability {
                    player_id: self.player_id,
                    stat: stat.clone(),
                    threshold,
                    value,
                }
            })?;
            if expected.repaired {
                warn!(
                    player_id = self.player_id,
                    stat = stat.as_str(),
                    "touchdown ladder was not monotone; clamped"
                );
            }
            implied.insert(stat.clone(), expected.value);
        }
        Ok(implied)
    }
}

/// Expected count from a threshold ladder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderExpectation {
    pub value: f64,
    /// Probabilities had to be clamped or made non-increasing
    pub repaired: bool,
}

/// `E[N] = sum_k P(N >= k)`.
///
/// Probabilities are clamped to [0, 1] and forced non-increasing in the
/// threshold. A non-finite entry fails with its 1-based threshold and value.
pub fn expected_from_ladder(ladder: &[f64]) -> std::result::Result<LadderExpectation, (usize, f64)> {
    let mut ceiling: f64 = 1.0;
    let mut value = 0.0;
    let mut repaired = false;

    for (idx, p) in ladder.iter().enumerate() {
        if !p.is_finite() {
            return Err((idx + 1, *p));
        }
        let bounded = p.clamp(0.0, ceiling);
        if bounded != *p {
            repaired = true;
        }
        ceiling = bounded;
        value += bounded;
    }
    Ok(LadderExpectation { value, repaired })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_sum() {
        let expected = expected_from_ladder(&[0.7, 0.35, 0.1]).unwrap();
        assert!((expected.value - 1.15).abs() < 1e-12);
        assert!(!expected.repaired);
    }

    #[test]
    fn test_non_monotone_ladder_is_repaired() {
        let expected = expected_from_ladder(&[0.4, 0.5, 1.2]).unwrap();
        assert!((expected.value - 1.2).abs() < 1e-12);
        assert!(expected.repaired);
    }

    #[test]
    fn test_nan_probability_rejected() {
        assert_eq!(expected_from_ladder(&[0.5, f64::NAN]).unwrap_err().0, 2);

        let line = MarketLine::new(9).with_ladder("rushing_tds", vec![f64::NAN]);
        let err = line.implied_stats().unwrap_err();
        assert!(matches!(err, MergeError::InvalidProbability { player_id: 9, threshold: 1, .. }));
    }

    #[test]
    fn test_ladder_overrides_direct_line() {
        let line = MarketLine::new(1)
            .with_line("receiving_tds", 0.9)
            .with_line("receiving_yards", 64.5)
            .with_ladder("receiving_tds", vec![0.45, 0.12]);
        let implied = line.implied_stats().unwrap();
        assert!((implied["receiving_tds"] - 0.57).abs() < 1e-12);
        assert_eq!(implied["receiving_yards"], 64.5);
    }
}
