//! Multi-week championship forecast
//!
//! Weeks already played contribute each team's actual score to every trial;
//! remaining weeks are simulated. The champion of a trial is the team with the
//! highest cumulative total, ties going to the team listed first.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

use crate::context::{SimulationContext, TrialPlan};
use crate::control::RunControl;
use crate::error::{ForecastError, Result};
use crate::pool::RunDiagnostics;
use crate::sampler::derive_seed;
use crate::stats::ScoreDistribution;
use crate::types::TeamId;
use crate::week::simulate_team_totals;

/// Source of one week's team scores
#[derive(Debug, Clone)]
pub enum WeekInput {
    /// Week finished: team scores are known
    Actual { week: u32, scores: HashMap<TeamId, f64> },
    /// Week pending: simulated from the context's rosters
    Simulated(Box<SimulationContext>),
}

impl WeekInput {
    pub fn week(&self) -> u32 {
        match self {
            WeekInput::Actual { week, .. } => *week,
            WeekInput::Simulated(ctx) => ctx.week(),
        }
    }
}

/// Whether a week's totals came from results or simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekProvenance {
    Actual,
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSource {
    pub week: u32,
    pub provenance: WeekProvenance,
}

/// Championship request; `teams` order decides ties
#[derive(Debug, Clone)]
pub struct ChampionshipRequest {
    pub teams: Vec<TeamId>,
    pub weeks: Vec<WeekInput>,
    /// Required participant count for the round, if fixed
    pub expected_teams: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChampionshipTeamResult {
    pub team_id: TeamId,
    pub championship_probability: f64,
    pub cumulative_score: ScoreDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChampionshipResult {
    pub teams: Vec<ChampionshipTeamResult>,
    pub weeks: Vec<WeekSource>,
    pub trials: usize,
    pub seed: u64,
    /// Diagnostics of each simulated week, in week order
    pub week_diagnostics: Vec<RunDiagnostics>,
}

impl ChampionshipResult {
    pub fn probability(&self, team_id: TeamId) -> Option<f64> {
        self.teams
            .iter()
            .find(|t| t.team_id == team_id)
            .map(|t| t.championship_probability)
    }
}

impl ChampionshipRequest {
    fn validate(&self) -> Result<()> {
        if let Some(expected) = self.expected_teams {
            if self.teams.len() != expected {
                return Err(ForecastError::PlayoffTeamCount { expected, actual: self.teams.len() });
            }
        }
        if self.teams.len() < 2 {
            return Err(ForecastError::PlayoffTeamCount { expected: 2, actual: self.teams.len() });
        }
        if self.weeks.is_empty() {
            return Err(ForecastError::InvalidInput("championship has no weeks".to_string()));
        }
        let mut seen = HashSet::with_capacity(self.teams.len());
        if let Some(dup) = self.teams.iter().find(|id| !seen.insert(**id)) {
            return Err(ForecastError::InvalidInput(format!("team {dup} listed twice")));
        }

        for input in &self.weeks {
            for team_id in &self.teams {
                let covered = match input {
                    WeekInput::Actual { scores, .. } => scores.contains_key(team_id),
                    WeekInput::Simulated(ctx) => ctx.rosters().contains_key(team_id),
                };
                if !covered {
                    return Err(ForecastError::MissingWeekData {
                        week: input.week(),
                        team_id: *team_id,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Forecast championship odds over one or more weeks
#[instrument(skip_all, fields(teams = request.teams.len(), weeks = request.weeks.len()))]
pub fn simulate_championship(
    request: &ChampionshipRequest,
    plan: &TrialPlan,
    control: &RunControl,
) -> Result<ChampionshipResult> {
    request.validate()?;

    let n = plan.n_trials;
    let mut cumulative = vec![vec![0.0; n]; request.teams.len()];
    let mut weeks = Vec::with_capacity(request.weeks.len());
    let mut week_diagnostics = Vec::new();

    for input in &request.weeks {
        control.checkpoint()?;
        match input {
            WeekInput::Actual { week, scores } => {
                for (totals, team_id) in cumulative.iter_mut().zip(&request.teams) {
                    let score = scores.get(team_id).copied().unwrap_or_default();
                    totals.iter_mut().for_each(|t| *t += score);
                }
                weeks.push(WeekSource { week: *week, provenance: WeekProvenance::Actual });
            }
            WeekInput::Simulated(ctx) => {
                let week_plan = plan.with_seed(derive_seed(plan.seed, "week", u64::from(ctx.week())));
                let (totals, diagnostics) =
                    ctx.install(|| simulate_team_totals(ctx, &request.teams, &week_plan, control))?;
                for (acc, week_totals) in cumulative.iter_mut().zip(totals) {
                    for (a, w) in acc.iter_mut().zip(week_totals) {
                        *a += w;
                    }
                }
                if diagnostics.used_fallback {
                    warn!(week = ctx.week(), "default correlations used for championship week");
                }
                week_diagnostics.push(diagnostics);
                weeks.push(WeekSource { week: ctx.week(), provenance: WeekProvenance::Simulated });
            }
        }
    }

    let mut titles = vec![0u64; request.teams.len()];
    for trial in 0..n {
        let mut best = 0;
        for idx in 1..cumulative.len() {
            if cumulative[idx][trial] > cumulative[best][trial] {
                best = idx;
            }
        }
        titles[best] += 1;
    }

    let teams = request
        .teams
        .iter()
        .enumerate()
        .map(|(idx, team_id)| ChampionshipTeamResult {
            team_id: *team_id,
            championship_probability: if n == 0 { 0.0 } else { titles[idx] as f64 / n as f64 },
            cumulative_score: ScoreDistribution::from_samples(&cumulative[idx]),
        })
        .collect();

    info!(trials = n, seed = plan.seed, "championship simulated");

    Ok(ChampionshipResult { teams, weeks, trials: n, seed: plan.seed, week_diagnostics })
}
