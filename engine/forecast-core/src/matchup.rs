//! Fantasy matchup simulation

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument};

use crate::context::{SimulationContext, TrialPlan};
use crate::control::RunControl;
use crate::error::{ForecastError, Result};
use crate::pool::{simulate_player_pool, PoolSimulation, RunDiagnostics};
use crate::stats::{ScoreDistribution, WinTally};
use crate::types::{Matchup, MatchupId, PlayerId, TeamId};

/// Outcome for one fantasy team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamResult {
    pub team_id: TeamId,
    /// Wins with ties split equally among tied teams
    pub win_probability: f64,
    pub outright_win_fraction: f64,
    /// Trials where this team tied for the top
    pub tie_fraction: f64,
    pub score_distribution: ScoreDistribution,
}

/// Outcome of a single fantasy matchup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupResult {
    pub matchup_id: MatchupId,
    /// In matchup order
    pub teams: Vec<TeamResult>,
    /// Trials with any tie for the top
    pub tie_fraction: f64,
    /// Mean of (first team total - second team total)
    pub expected_margin: f64,
    pub diagnostics: RunDiagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_vectors: Option<BTreeMap<TeamId, Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_vectors: Option<BTreeMap<PlayerId, Vec<f64>>>,
}

impl MatchupResult {
    pub fn team(&self, team_id: TeamId) -> Option<&TeamResult> {
        self.teams.iter().find(|t| t.team_id == team_id)
    }

    pub fn win_probability(&self, team_id: TeamId) -> Option<f64> {
        self.team(team_id).map(|t| t.win_probability)
    }
}

/// Aggregate per-team totals into team results
pub(crate) fn summarize_teams(team_ids: &[TeamId], totals: &[Vec<f64>]) -> (Vec<TeamResult>, f64, f64) {
    let views: Vec<&[f64]> = totals.iter().map(Vec::as_slice).collect();
    let tally = WinTally::tally(&views);
    let teams = team_ids
        .iter()
        .enumerate()
        .map(|(idx, team_id)| TeamResult {
            team_id: *team_id,
            win_probability: tally.win_probability(idx),
            outright_win_fraction: tally.outright_fraction(idx),
            tie_fraction: tally.tie_fraction(idx),
            score_distribution: ScoreDistribution::from_samples(&totals[idx]),
        })
        .collect();

    let expected_margin = match totals {
        [first, second, ..] if !first.is_empty() => {
            first.iter().zip(second).map(|(a, b)| a - b).sum::<f64>() / first.len() as f64
        }
        _ => 0.0,
    };
    (teams, tally.any_tie_fraction(), expected_margin)
}

/// Build a matchup result from an already simulated pool
pub(crate) fn matchup_from_pool(
    matchup_id: MatchupId,
    lineups: &[(TeamId, Vec<PlayerId>)],
    pool: &PoolSimulation,
    keep_trial_vectors: bool,
) -> MatchupResult {
    let team_ids: Vec<TeamId> = lineups.iter().map(|(team_id, _)| *team_id).collect();
    let totals: Vec<Vec<f64>> = lineups.iter().map(|(_, starters)| pool.team_totals(starters)).collect();
    let (teams, tie_fraction, expected_margin) = summarize_teams(&team_ids, &totals);

    let (team_vectors, player_vectors) = if keep_trial_vectors {
        let players = lineups
            .iter()
            .flat_map(|(_, starters)| starters.iter())
            .filter_map(|id| pool.scores.get(id).map(|v| (*id, v.clone())))
            .collect();
        (Some(team_ids.iter().copied().zip(totals).collect()), Some(players))
    } else {
        (None, None)
    };

    MatchupResult {
        matchup_id,
        teams,
        tie_fraction,
        expected_margin,
        diagnostics: pool.diagnostics.clone(),
        team_vectors,
        player_vectors,
    }
}

/// Starting lineups for a matchup's teams, in matchup order
pub fn matchup_lineups(ctx: &SimulationContext, matchup: &Matchup) -> Result<Vec<(TeamId, Vec<PlayerId>)>> {
    matchup
        .teams
        .iter()
        .map(|team_id| Ok((*team_id, ctx.roster(*team_id)?.starters.clone())))
        .collect()
}

/// Simulate a matchup from the context's rosters
#[instrument(skip(ctx, plan, control), fields(league = ctx.league_id(), week = ctx.week()))]
pub fn simulate_matchup(
    ctx: &SimulationContext,
    matchup_id: MatchupId,
    plan: &TrialPlan,
    control: &RunControl,
) -> Result<MatchupResult> {
    let matchup = ctx
        .matchups()
        .iter()
        .find(|m| m.matchup_id == matchup_id)
        .ok_or_else(|| ForecastError::InvalidInput(format!("unknown matchup {matchup_id}")))?;
    let lineups = matchup_lineups(ctx, matchup)?;
    simulate_lineups(ctx, matchup_id, &lineups, plan, control)
}

/// Simulate explicit lineups against each other
pub fn simulate_lineups(
    ctx: &SimulationContext,
    matchup_id: MatchupId,
    lineups: &[(TeamId, Vec<PlayerId>)],
    plan: &TrialPlan,
    control: &RunControl,
) -> Result<MatchupResult> {
    if lineups.len() < 2 {
        return Err(ForecastError::InvalidTeamCount { matchup_id, count: lineups.len() });
    }

    let players: BTreeSet<PlayerId> =
        lineups.iter().flat_map(|(_, starters)| starters.iter().copied()).collect();
    let pool = simulate_player_pool(ctx, &players, plan, control)?;
    let result = matchup_from_pool(matchup_id, lineups, &pool, plan.keep_trial_vectors);

    info!(
        matchup_id,
        trials = plan.n_trials,
        seed = plan.seed,
        tie_fraction = result.tie_fraction,
        "matchup simulated"
    );
    Ok(result)
}
