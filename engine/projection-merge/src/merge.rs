//! Merge policy: market lines override projected stats, points recomputed once

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::error::Result;
use crate::market::MarketLine;
use crate::scoring::{ScoringRules, StatLine};
use crate::PlayerId;

/// Which sources fed a merged projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Merged,
    TraditionalOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedProjection {
    pub player_id: PlayerId,
    pub stats: StatLine,
    pub fantasy_points: f64,
    pub provenance: Provenance,
    /// Stats whose value came from the market
    pub overridden: Vec<String>,
}

/// Applies the merge policy under one set of scoring rules
#[derive(Debug, Clone)]
pub struct ProjectionMerger {
    rules: ScoringRules,
}

impl ProjectionMerger {
    pub fn new(rules: ScoringRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ScoringRules {
        &self.rules
    }

    /// Merge one player's traditional line with its market line
    pub fn merge_player(
        &self,
        player_id: PlayerId,
        traditional: Option<&StatLine>,
        market: Option<&MarketLine>,
    ) -> Result<MergedProjection> {
        let mut stats = traditional.cloned().unwrap_or_default();
        let mut overridden = Vec::new();

        if let Some(market) = market {
            for (stat, value) in market.implied_stats()? {
                if !self.rules.is_scoring_stat(&stat) {
                    continue;
                }
                stats.insert(stat.clone(), value);
                overridden.push(stat);
            }
        }

        let provenance = if overridden.is_empty() {
            Provenance::TraditionalOnly
        } else {
            Provenance::Merged
        };
        let fantasy_points = self.rules.score(&stats);

        Ok(MergedProjection { player_id, stats, fantasy_points, provenance, overridden })
    }

    /// Merge every player with a traditional line; market-only entries are ignored
    pub fn merge_all(
        &self,
        traditional: &HashMap<PlayerId, StatLine>,
        market: &HashMap<PlayerId, MarketLine>,
    ) -> Result<BTreeMap<PlayerId, MergedProjection>> {
        for id in market.keys().filter(|id| !traditional.contains_key(id)) {
            debug!(player_id = *id, "market line ignored without traditional projection");
        }

        let mut merged = BTreeMap::new();
        for (id, stats) in traditional {
            let projection = self.merge_player(*id, Some(stats), market.get(id))?;
            if projection.provenance == Provenance::Merged {
                debug!(player_id = *id, overridden = ?projection.overridden, "market lines applied");
            }
            merged.insert(*id, projection);
        }

        let with_market = merged.values().filter(|p| p.provenance == Provenance::Merged).count();
        info!(
            players = merged.len(),
            with_market,
            format = self.rules.format_id.as_str(),
            "projections merged"
        );
        Ok(merged)
    }

    /// Score completed-game stat lines
    pub fn score_actuals(&self, actuals: &HashMap<PlayerId, StatLine>) -> HashMap<PlayerId, f64> {
        actuals.iter().map(|(id, line)| (*id, self.rules.score(line))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::stats;

    fn line(entries: &[(&str, f64)]) -> StatLine {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_market_line_replaces_projected_stat() {
        let merger = ProjectionMerger::new(ScoringRules::standard());
        let traditional = line(&[(stats::PASSING_YARDS, 250.0), (stats::PASSING_TDS, 1.5)]);
        let market = MarketLine::new(7).with_line(stats::PASSING_TDS, 2.1);

        let merged = merger.merge_player(7, Some(&traditional), Some(&market)).unwrap();
        assert_eq!(merged.stats, line(&[(stats::PASSING_YARDS, 250.0), (stats::PASSING_TDS, 2.1)]));
        assert!((merged.fantasy_points - (250.0 * 0.04 + 2.1 * 4.0)).abs() < 1e-9);
        assert_eq!(merged.provenance, Provenance::Merged);
        assert_eq!(merged.overridden, vec![stats::PASSING_TDS.to_string()]);
    }

    #[test]
    fn test_points_recomputed_not_averaged() {
        let merger = ProjectionMerger::new(ScoringRules::ppr());
        let traditional = line(&[
            (stats::RECEPTIONS, 5.0),
            (stats::RECEIVING_YARDS, 60.0),
            (stats::RECEIVING_TDS, 0.4),
        ]);
        let market = MarketLine::new(3)
            .with_line(stats::RECEIVING_YARDS, 72.5)
            .with_ladder(stats::RECEIVING_TDS, vec![0.5, 0.15, 0.03]);

        let merged = merger.merge_player(3, Some(&traditional), Some(&market)).unwrap();
        let expected = 5.0 + 7.25 + 0.68 * 6.0;
        assert!((merged.fantasy_points - expected).abs() < 1e-9);
    }

    #[test]
    fn test_traditional_only() {
        let merger = ProjectionMerger::new(ScoringRules::standard());
        let traditional = line(&[(stats::RUSHING_YARDS, 80.0)]);
        let merged = merger.merge_player(4, Some(&traditional), None).unwrap();
        assert_eq!(merged.provenance, Provenance::TraditionalOnly);
        assert!((merged.fantasy_points - 8.0).abs() < 1e-9);
        assert!(merged.overridden.is_empty());
    }

    #[test]
    fn test_non_scoring_market_stat_ignored() {
        let merger = ProjectionMerger::new(ScoringRules::standard());
        let market = MarketLine::new(4).with_line("longest_reception", 22.5);
        let merged = merger.merge_player(4, None, Some(&market)).unwrap();
        assert_eq!(merged.provenance, Provenance::TraditionalOnly);
        assert!(merged.stats.is_empty());
    }

    #[test]
    fn test_merge_all_ignores_market_only_players() {
        let merger = ProjectionMerger::new(ScoringRules::ppr());
        let traditional = HashMap::from([(1, line(&[(stats::RECEPTIONS, 4.0)]))]);
        let market = HashMap::from([(2, MarketLine::new(2).with_line(stats::RUSHING_YARDS, 55.5))]);

        let merged = merger.merge_all(&traditional, &market).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[&1].provenance, Provenance::TraditionalOnly);
        // no traditional line, so the player stays unprojected
        assert!(!merged.contains_key(&2));
    }

    #[test]
    fn test_actuals_scored_with_same_rules() {
        let merger = ProjectionMerger::new(ScoringRules::half_ppr());
        let actuals = HashMap::from([(8, line(&[(stats::RECEPTIONS, 7.0), (stats::RECEIVING_YARDS, 93.0)]))]);
        let scores = merger.score_actuals(&actuals);
        assert!((scores[&8] - 12.8).abs() < 1e-9);
    }

    #[test]
    fn test_provenance_serialization() {
        let json = serde_json::to_string(&Provenance::TraditionalOnly).unwrap();
        assert_eq!(json, "\"traditional-only\"");
    }
}
