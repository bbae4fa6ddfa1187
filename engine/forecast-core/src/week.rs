//! League-week simulation
//!
//! All matchups of a week are scored from one shared pool so each NFL game
//! is sampled exactly once no matter how many rosters hold its players.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, instrument};

use crate::context::{SimulationContext, TrialPlan};
use crate::control::RunControl;
use crate::error::Result;
use crate::matchup::{matchup_from_pool, matchup_lineups, MatchupResult};
use crate::pool::{simulate_player_pool, PoolSimulation, RunDiagnostics};
use crate::types::{PlayerId, TeamId};

/// Every matchup of one league week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekResult {
    pub league_id: String,
    pub week: u32,
    pub matchups: Vec<MatchupResult>,
    pub diagnostics: RunDiagnostics,
}

impl WeekResult {
    /// Win probability for a team in whichever matchup it plays
    pub fn win_probability(&self, team_id: TeamId) -> Option<f64> {
        self.matchups.iter().find_map(|m| m.win_probability(team_id))
    }

    /// Mean simulated score for a team
    pub fn mean_score(&self, team_id: TeamId) -> Option<f64> {
        self.matchups
            .iter()
            .find_map(|m| m.team(team_id))
            .map(|t| t.score_distribution.mean)
    }
}

/// Simulate every starter of the given teams once; used by multi-week runs
pub fn simulate_team_totals(
    ctx: &SimulationContext,
    team_ids: &[TeamId],
    plan: &TrialPlan,
    control: &RunControl,
) -> Result<(Vec<Vec<f64>>, RunDiagnostics)> {
    let mut starters = Vec::with_capacity(team_ids.len());
    for team_id in team_ids {
        starters.push(ctx.roster(*team_id)?.starters.clone());
    }
    let players: BTreeSet<PlayerId> = starters.iter().flatten().copied().collect();
    let pool = simulate_player_pool(ctx, &players, plan, control)?;
    let totals = starters.iter().map(|s| pool.team_totals(s)).collect();
    Ok((totals, pool.diagnostics))
}

/// Simulate all matchups in the context's week
#[instrument(skip(ctx, plan, control), fields(league = ctx.league_id(), week = ctx.week()))]
pub fn simulate_week(
    ctx: &SimulationContext,
    plan: &TrialPlan,
    control: &RunControl,
) -> Result<WeekResult> {
    let mut lineups = Vec::with_capacity(ctx.matchups().len());
    for matchup in ctx.matchups() {
        lineups.push((matchup.matchup_id, matchup_lineups(ctx, matchup)?));
    }

    let players: BTreeSet<PlayerId> = lineups
        .iter()
        .flat_map(|(_, teams)| teams.iter().flat_map(|(_, starters)| starters.iter().copied()))
        .collect();
    let pool: PoolSimulation = simulate_player_pool(ctx, &players, plan, control)?;

    let matchups: Vec<MatchupResult> = lineups
        .iter()
        .map(|(matchup_id, teams)| {
            matchup_from_pool(*matchup_id, teams, &pool, plan.keep_trial_vectors)
        })
        .collect();

    info!(
        matchups = matchups.len(),
        games = pool.diagnostics.games_simulated,
        seed = plan.seed,
        "week simulated"
    );

    Ok(WeekResult {
        league_id: ctx.league_id().to_string(),
        week: ctx.week(),
        matchups,
        diagnostics: pool.diagnostics,
    })
}

