//! Read-only data source seam

use std::collections::HashMap;
use std::ops::RangeInclusive;

use forecast_core::{
    CorrelationDefaults, CorrelationPair, LeagueConfig, Matchup, NflTeam, Player, PlayerId,
    Roster, ScheduleEntry, TeamId, TeamRecord, VarianceProfile,
};
use projection_merge::{MarketLine, ScoringRules, StatLine};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A weekly projection as delivered by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectionRecord {
    /// Fantasy points already computed under the league's scoring
    Points(f64),
    /// Projected stat line, scored during the merge
    Stats(StatLine),
}

/// Read-only calls returning plain keyed mappings.
///
/// League-scoped calls take the league id; NFL-wide calls take the season
/// and week. Implementations return empty collections for absent optional
/// data and errors only for absent required data.
#[async_trait::async_trait]
pub trait ForecastDataSource: Send + Sync {
    async fn league_config(&self, league_id: &str) -> Result<LeagueConfig>;

    /// Custom scoring rules; `None` falls back to the built-in presets
    async fn scoring_rules(&self, format_id: &str) -> Result<Option<ScoringRules>>;

    async fn players(&self, season: i32) -> Result<Vec<Player>>;

    async fn rosters(&self, league_id: &str, week: u32) -> Result<HashMap<TeamId, Roster>>;

    async fn schedule(&self, season: i32, week: u32) -> Result<HashMap<NflTeam, ScheduleEntry>>;

    async fn matchups(&self, league_id: &str, week: u32) -> Result<Vec<Matchup>>;

    async fn projections(&self, season: i32, week: u32) -> Result<HashMap<PlayerId, ProjectionRecord>>;

    async fn variance(&self, season: i32) -> Result<HashMap<PlayerId, VarianceProfile>>;

    async fn correlations(&self, seasons: RangeInclusive<i32>) -> Result<Vec<CorrelationPair>>;

    async fn correlation_defaults(&self) -> Result<CorrelationDefaults>;

    async fn market_lines(&self, season: i32, week: u32) -> Result<HashMap<PlayerId, MarketLine>>;

    /// Completed-game stat lines
    async fn actual_stats(&self, season: i32, week: u32) -> Result<HashMap<PlayerId, StatLine>>;

    /// Current standings
    async fn team_records(&self, league_id: &str) -> Result<HashMap<TeamId, TeamRecord>>;
}
