//! Prefetch phase: gather every input for a run, then freeze it into a context

use std::collections::HashMap;
use std::sync::Arc;

use forecast_core::{
    ChampionshipRequest, LeagueConfig, PlayerId, ScheduleEntry, SeasonRequest, SimulationConfig,
    SimulationContext, TeamId, WeekInput,
};
use futures::future::try_join_all;
use projection_merge::{MarketLine, ProjectionMerger, ScoringRules, StatLine};
use tracing::{debug, info, instrument, warn};

use crate::error::{LoaderError, Result};
use crate::source::{ForecastDataSource, ProjectionRecord};

/// Loads league data and produces immutable simulation contexts
#[derive(Clone)]
pub struct Prefetcher {
    source: Arc<dyn ForecastDataSource>,
    config: SimulationConfig,
}

impl Prefetcher {
    pub fn new(source: Arc<dyn ForecastDataSource>, config: SimulationConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Scoring rules for a league: source-defined first, then built-in presets
    pub async fn scoring_rules(&self, league: &LeagueConfig) -> Result<ScoringRules> {
        let format_id = league.scoring_format.as_str();
        if let Some(rules) = self.source.scoring_rules(format_id).await? {
            return Ok(rules);
        }
        ScoringRules::preset(format_id).ok_or_else(|| LoaderError::ScoringFormatNotFound {
            league_id: league.league_id.clone(),
            format_id: format_id.to_string(),
        })
    }

    /// Load one league week into a context
    #[instrument(skip(self))]
    pub async fn load_week(&self, league_id: &str, week: u32) -> Result<SimulationContext> {
        let league = self.source.league_config(league_id).await?;
        let rules = self.scoring_rules(&league).await?;
        self.week_context(&league, &rules, week).await
    }

    /// Load the remaining regular season starting at `from_week`
    #[instrument(skip(self))]
    pub async fn load_season(&self, league_id: &str, from_week: u32) -> Result<SeasonRequest> {
        let league = self.source.league_config(league_id).await?;
        let settings = league.season_settings.clone().ok_or_else(|| {
            forecast_core::ForecastError::MissingSeasonConfig { league_id: league_id.to_string() }
        })?;
        let rules = self.scoring_rules(&league).await?;

        let weeks: Vec<u32> = (from_week..=settings.regular_season_weeks).collect();
        let (records, remaining_weeks) = tokio::try_join!(
            self.source.team_records(league_id),
            try_join_all(weeks.iter().map(|week| self.week_context(&league, &rules, *week))),
        )?;

        info!(league_id, from_week, remaining = remaining_weeks.len(), "season loaded");
        Ok(SeasonRequest {
            league,
            records,
            remaining_weeks,
            trials: self.config.season.clone(),
        })
    }

    /// Load a championship round; fully final weeks use actual team scores
    #[instrument(skip(self))]
    pub async fn load_championship(
        &self,
        league_id: &str,
        teams: Vec<TeamId>,
        weeks: &[u32],
    ) -> Result<ChampionshipRequest> {
        let league = self.source.league_config(league_id).await?;
        let rules = self.scoring_rules(&league).await?;
        let contexts =
            try_join_all(weeks.iter().map(|week| self.week_context(&league, &rules, *week))).await?;

        let mut inputs = Vec::with_capacity(contexts.len());
        for ctx in contexts {
            if week_is_final(ctx.schedule()) {
                let mut scores = HashMap::with_capacity(teams.len());
                for team_id in &teams {
                    let roster = ctx.roster(*team_id)?;
                    let total: f64 = roster
                        .starters
                        .iter()
                        .filter_map(|id| ctx.locked_scores().get(id))
                        .sum();
                    scores.insert(*team_id, total);
                }
                debug!(week = ctx.week(), "week final, using actual scores");
                inputs.push(WeekInput::Actual { week: ctx.week(), scores });
            } else {
                inputs.push(WeekInput::Simulated(Box::new(ctx)));
            }
        }

        Ok(ChampionshipRequest { teams, weeks: inputs, expected_teams: None })
    }

    async fn week_context(
        &self,
        league: &LeagueConfig,
        rules: &ScoringRules,
        week: u32,
    ) -> Result<SimulationContext> {
        let season = league.season;
        let league_id = league.league_id.as_str();
        let lookback = self.config.correlation.lookback_years.max(0);
        let source = self.source.as_ref();

        let (
            players,
            rosters,
            schedule,
            matchups,
            projections,
            variance,
            correlations,
            defaults,
            market_lines,
            actual_stats,
        ) = tokio::try_join!(
            source.players(season),
            source.rosters(league_id, week),
            source.schedule(season, week),
            source.matchups(league_id, week),
            source.projections(season, week),
            source.variance(season),
            source.correlations(season - lookback..=season),
            source.correlation_defaults(),
            source.market_lines(season, week),
            source.actual_stats(season, week),
        )?;

        let merger = ProjectionMerger::new(rules.clone());
        let points = merged_points(&merger, projections, market_lines)?;
        let locked = locked_scores(&merger, &players, &schedule, &actual_stats);

        debug!(
            league_id,
            week,
            players = players.len(),
            projected = points.len(),
            locked = locked.len(),
            correlations = correlations.len(),
            "week prefetched"
        );

        let ctx = SimulationContext::builder(league_id, season, week)
            .players(players)
            .projections(points)
            .variance(variance)
            .correlations(correlations)
            .correlation_defaults(defaults)
            .schedule(schedule)
            .rosters(rosters)
            .matchups(matchups)
            .locked_scores(locked)
            .config(self.config.clone())
            .build()?;
        Ok(ctx)
    }
}

/// Every NFL game of the week is final
fn week_is_final(schedule: &HashMap<String, ScheduleEntry>) -> bool {
    !schedule.is_empty() && schedule.values().all(|entry| entry.status.is_final())
}

/// Projected fantasy points per player after applying market lines.
///
/// Point-only projections cannot absorb stat-level market data and pass
/// through unchanged.
fn merged_points(
    merger: &ProjectionMerger,
    projections: HashMap<PlayerId, ProjectionRecord>,
    mut market_lines: HashMap<PlayerId, MarketLine>,
) -> Result<HashMap<PlayerId, f64>> {
    let mut points = HashMap::new();
    let mut stat_lines: HashMap<PlayerId, StatLine> = HashMap::new();

    for (player_id, record) in projections {
        match record {
            ProjectionRecord::Points(value) => {
                if market_lines.remove(&player_id).is_some() {
                    debug!(player_id, "market line ignored for point-only projection");
                }
                points.insert(player_id, value);
            }
            ProjectionRecord::Stats(line) => {
                stat_lines.insert(player_id, line);
            }
        }
    }

    let merged = merger.merge_all(&stat_lines, &market_lines)?;
    points.extend(merged.into_iter().map(|(id, projection)| (id, projection.fantasy_points)));
    Ok(points)
}

/// Actual scores for players whose game is final
fn locked_scores(
    merger: &ProjectionMerger,
    players: &[forecast_core::Player],
    schedule: &HashMap<String, ScheduleEntry>,
    actual_stats: &HashMap<PlayerId, StatLine>,
) -> HashMap<PlayerId, f64> {
    let finished: HashMap<PlayerId, StatLine> = players
        .iter()
        .filter(|p| schedule.get(&p.nfl_team).map(|e| e.status.is_final()).unwrap_or(false))
        .filter_map(|p| match actual_stats.get(&p.id) {
            Some(line) => Some((p.id, line.clone())),
            None => {
                warn!(player_id = p.id, "final game without actual stats");
                None
            }
        })
        .collect();
    merger.score_actuals(&finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection_merge::stats;

    #[test]
    fn test_point_projection_passes_through() {
        let merger = ProjectionMerger::new(ScoringRules::ppr());
        let projections = HashMap::from([
            (1, ProjectionRecord::Points(17.5)),
            (
                2,
                ProjectionRecord::Stats(StatLine::from([(stats::RECEPTIONS.to_string(), 6.0)])),
            ),
        ]);
        let market = HashMap::from([
            (1, MarketLine::new(1).with_line(stats::PASSING_YARDS, 300.0)),
            (2, MarketLine::new(2).with_line(stats::RECEIVING_YARDS, 70.5)),
        ]);

        let points = merged_points(&merger, projections, market).unwrap();
        assert_eq!(points[&1], 17.5);
        assert!((points[&2] - 13.05).abs() < 1e-9);
    }

    #[test]
    fn test_market_only_player_left_unprojected() {
        let merger = ProjectionMerger::new(ScoringRules::ppr());
        let projections = HashMap::from([(1, ProjectionRecord::Points(15.0))]);
        let market = HashMap::from([(2, MarketLine::new(2).with_line(stats::RECEIVING_YARDS, 40.5))]);

        let points = merged_points(&merger, projections, market).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[&1], 15.0);
        assert!(!points.contains_key(&2));
    }

    #[test]
    fn test_week_final_requires_games() {
        assert!(!week_is_final(&HashMap::new()));
    }
}
