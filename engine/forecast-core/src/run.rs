//! Single-call simulation entry point over plain keyed inputs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::config::SimulationConfig;
use crate::context::SimulationContext;
use crate::control::RunControl;
use crate::error::{ForecastError, Result};
use crate::matchup::simulate_matchup;
use crate::pool::RunDiagnostics;
use crate::stats::ScoreDistribution;
use crate::types::{
    CorrelationPair, Matchup, NflTeam, Player, PlayerId, Roster, ScheduleEntry, TeamId,
    VarianceProfile,
};

const RUN_MATCHUP_ID: u32 = 0;

/// Everything needed for one matchup-style run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationInput {
    pub league_id: String,
    pub season: i32,
    pub week: u32,
    pub players: Vec<Player>,
    pub projections: HashMap<PlayerId, f64>,
    pub variance_cache: HashMap<PlayerId, VarianceProfile>,
    pub correlation_cache: Vec<CorrelationPair>,
    pub schedule: HashMap<NflTeam, ScheduleEntry>,
    /// Starters per team; the first team listed is the home side
    pub teams: Vec<(TeamId, Vec<PlayerId>)>,
    pub n_simulations: usize,
    pub seed: Option<u64>,
    pub locked_scores: HashMap<PlayerId, f64>,
    pub keep_trial_vectors: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub win_probabilities: BTreeMap<TeamId, f64>,
    pub score_distributions: BTreeMap<TeamId, ScoreDistribution>,
    pub tie_fraction: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_vectors: Option<BTreeMap<TeamId, Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_vectors: Option<BTreeMap<PlayerId, Vec<f64>>>,
    pub diagnostics: RunDiagnostics,
}

/// Simulate the given teams against each other.
///
/// `base` supplies everything not carried by the input (distribution and
/// correlation tuning, chunk size, thread pool).
pub fn run_simulation(
    input: SimulationInput,
    base: &SimulationConfig,
    control: &RunControl,
) -> Result<SimulationOutput> {
    if input.teams.len() < 2 {
        return Err(ForecastError::InvalidTeamCount {
            matchup_id: RUN_MATCHUP_ID,
            count: input.teams.len(),
        });
    }

    let mut config = base.clone();
    if input.n_simulations > 0 {
        config.n_trials = input.n_simulations;
    }
    config.seed = input.seed.or(base.seed);
    config.keep_trial_vectors = input.keep_trial_vectors;

    let team_ids: Vec<TeamId> = input.teams.iter().map(|(team_id, _)| *team_id).collect();
    let rosters = input
        .teams
        .into_iter()
        .map(|(team_id, starters)| (team_id, Roster::new(starters)))
        .collect();

    let ctx = SimulationContext::builder(input.league_id, input.season, input.week)
        .players(input.players)
        .projections(input.projections)
        .variance(input.variance_cache)
        .correlations(input.correlation_cache)
        .schedule(input.schedule)
        .rosters(rosters)
        .matchups([Matchup { matchup_id: RUN_MATCHUP_ID, teams: team_ids }])
        .locked_scores(input.locked_scores)
        .config(config)
        .build()?;

    let plan = ctx.trial_plan();
    let result = ctx.install(|| simulate_matchup(&ctx, RUN_MATCHUP_ID, &plan, control))?;

    Ok(SimulationOutput {
        win_probabilities: result.teams.iter().map(|t| (t.team_id, t.win_probability)).collect(),
        score_distributions: result
            .teams
            .iter()
            .map(|t| (t.team_id, t.score_distribution))
            .collect(),
        tie_fraction: result.tie_fraction,
        team_vectors: result.team_vectors,
        player_vectors: result.player_vectors,
        diagnostics: result.diagnostics,
    })
}
