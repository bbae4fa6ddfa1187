//! In-memory data source backed by JSON snapshots

use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;
use std::path::Path;

use forecast_core::{
    CorrelationDefaults, CorrelationPair, LeagueConfig, Matchup, NflTeam, Player, PlayerId,
    Roster, ScheduleEntry, TeamId, TeamRecord, VarianceProfile,
};
use projection_merge::{MarketLine, ScoringRules, StatLine};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{LoaderError, Result};
use crate::source::{ForecastDataSource, ProjectionRecord};

/// NFL-wide data for one week
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NflWeekSnapshot {
    pub schedule: HashMap<NflTeam, ScheduleEntry>,
    pub projections: HashMap<PlayerId, ProjectionRecord>,
    pub market_lines: HashMap<PlayerId, MarketLine>,
    pub actual_stats: HashMap<PlayerId, StatLine>,
}

/// NFL-wide data for one season
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NflSeasonSnapshot {
    pub season: i32,
    pub players: Vec<Player>,
    pub variance: HashMap<PlayerId, VarianceProfile>,
    pub correlations: Vec<CorrelationPair>,
    pub weeks: BTreeMap<u32, NflWeekSnapshot>,
}

/// Everything needed to forecast one league, as a single document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueSnapshot {
    pub league: LeagueConfig,
    #[serde(default)]
    pub scoring_formats: Vec<ScoringRules>,
    #[serde(default)]
    pub rosters: BTreeMap<u32, HashMap<TeamId, Roster>>,
    #[serde(default)]
    pub matchups: BTreeMap<u32, Vec<Matchup>>,
    #[serde(default)]
    pub records: HashMap<TeamId, TeamRecord>,
    #[serde(default)]
    pub correlation_defaults: Option<CorrelationDefaults>,
    pub nfl: NflSeasonSnapshot,
}

#[derive(Debug, Default)]
struct SourceState {
    leagues: HashMap<String, LeagueSnapshot>,
    nfl: HashMap<i32, NflSeasonSnapshot>,
    scoring_formats: HashMap<String, ScoringRules>,
    defaults: Option<CorrelationDefaults>,
}

/// Data source holding snapshots in memory
#[derive(Debug, Default)]
pub struct InMemorySource {
    state: RwLock<SourceState>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LeagueSnapshot) -> Self {
        let mut state = SourceState::default();
        state.insert(snapshot);
        Self { state: RwLock::new(state) }
    }

    /// Read a snapshot document from disk
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let snapshot: LeagueSnapshot = serde_json::from_slice(&bytes)?;
        info!(
            path = %path.display(),
            league_id = snapshot.league.league_id.as_str(),
            season = snapshot.nfl.season,
            weeks = snapshot.nfl.weeks.len(),
            "snapshot loaded"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Add or replace a league snapshot
    pub async fn insert(&self, snapshot: LeagueSnapshot) {
        self.state.write().await.insert(snapshot);
    }

    async fn nfl_week<T>(
        &self,
        season: i32,
        week: u32,
        f: impl FnOnce(&NflWeekSnapshot) -> T,
    ) -> Result<Option<T>> {
        let state = self.state.read().await;
        let nfl = state.season(season)?;
        Ok(nfl.weeks.get(&week).map(f))
    }
}

impl SourceState {
    fn insert(&mut self, snapshot: LeagueSnapshot) {
        for rules in &snapshot.scoring_formats {
            self.scoring_formats.insert(rules.format_id.clone(), rules.clone());
        }
        if snapshot.correlation_defaults.is_some() {
            self.defaults = snapshot.correlation_defaults.clone();
        }
        self.nfl.insert(snapshot.nfl.season, snapshot.nfl.clone());
        self.leagues.insert(snapshot.league.league_id.clone(), snapshot);
    }

    fn league(&self, league_id: &str) -> Result<&LeagueSnapshot> {
        self.leagues
            .get(league_id)
            .ok_or_else(|| LoaderError::LeagueNotFound { league_id: league_id.to_string() })
    }

    fn season(&self, season: i32) -> Result<&NflSeasonSnapshot> {
        self.nfl.get(&season).ok_or_else(|| LoaderError::data_source(format!("no NFL data for season {season}")))
    }
}

#[async_trait::async_trait]
impl ForecastDataSource for InMemorySource {
    async fn league_config(&self, league_id: &str) -> Result<LeagueConfig> {
        Ok(self.state.read().await.league(league_id)?.league.clone())
    }

    async fn scoring_rules(&self, format_id: &str) -> Result<Option<ScoringRules>> {
        Ok(self.state.read().await.scoring_formats.get(format_id).cloned())
    }

    async fn players(&self, season: i32) -> Result<Vec<Player>> {
        Ok(self.state.read().await.season(season)?.players.clone())
    }

    async fn rosters(&self, league_id: &str, week: u32) -> Result<HashMap<TeamId, Roster>> {
        let state = self.state.read().await;
        Ok(state.league(league_id)?.rosters.get(&week).cloned().unwrap_or_default())
    }

    async fn schedule(&self, season: i32, week: u32) -> Result<HashMap<NflTeam, ScheduleEntry>> {
        self.nfl_week(season, week, |w| w.schedule.clone())
            .await?
            .ok_or_else(|| LoaderError::data_source(format!("no schedule for season {season} week {week}")))
    }

    async fn matchups(&self, league_id: &str, week: u32) -> Result<Vec<Matchup>> {
        let state = self.state.read().await;
        Ok(state.league(league_id)?.matchups.get(&week).cloned().unwrap_or_default())
    }

    async fn projections(&self, season: i32, week: u32) -> Result<HashMap<PlayerId, ProjectionRecord>> {
        Ok(self.nfl_week(season, week, |w| w.projections.clone()).await?.unwrap_or_default())
    }

    async fn variance(&self, season: i32) -> Result<HashMap<PlayerId, VarianceProfile>> {
        Ok(self.state.read().await.season(season)?.variance.clone())
    }

    async fn correlations(&self, seasons: RangeInclusive<i32>) -> Result<Vec<CorrelationPair>> {
        let state = self.state.read().await;
        let mut pairs: Vec<CorrelationPair> = state
            .nfl
            .values()
            .flat_map(|nfl| nfl.correlations.iter())
            .filter(|pair| seasons.contains(&pair.data_year))
            .cloned()
            .collect();
        pairs.sort_by(|a, b| a.key().cmp(&b.key()).then(b.data_year.cmp(&a.data_year)));
        pairs.dedup();
        Ok(pairs)
    }

    async fn correlation_defaults(&self) -> Result<CorrelationDefaults> {
        Ok(self.state.read().await.defaults.clone().unwrap_or_else(CorrelationDefaults::standard))
    }

    async fn market_lines(&self, season: i32, week: u32) -> Result<HashMap<PlayerId, MarketLine>> {
        Ok(self.nfl_week(season, week, |w| w.market_lines.clone()).await?.unwrap_or_default())
    }

    async fn actual_stats(&self, season: i32, week: u32) -> Result<HashMap<PlayerId, StatLine>> {
        Ok(self.nfl_week(season, week, |w| w.actual_stats.clone()).await?.unwrap_or_default())
    }

    async fn team_records(&self, league_id: &str) -> Result<HashMap<TeamId, TeamRecord>> {
        Ok(self.state.read().await.league(league_id)?.records.clone())
    }
}
