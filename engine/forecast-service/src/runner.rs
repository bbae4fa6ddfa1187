//! Load, compute and serialize one forecast command

use anyhow::{Context, Result};
use forecast_core::{
    evaluate_lineup, evaluate_swaps, forecast_season, simulate_championship, simulate_matchup,
    simulate_week, ForecastError, GreedyOptimizer, MatchupId, Position, PositionEligibility,
    RunControl, SimulationContext, TeamId, TrialPlan,
};
use forecast_loader::Prefetcher;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::Command;

/// Positions sharing the flex slot
const FLEX: [Position; 3] = [Position::RB, Position::WR, Position::TE];

/// Run blocking compute off the async runtime.
///
/// When `budget` elapses the cancel flag is raised and the task is awaited
/// until it observes the flag, so no partial result escapes.
pub async fn compute<T, F>(control: &RunControl, budget: Option<Duration>, job: F) -> Result<T>
where
    F: FnOnce(RunControl) -> forecast_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let worker = control.clone();
    let mut handle = tokio::task::spawn_blocking(move || job(worker));

    let joined = match budget {
        Some(budget) => match tokio::time::timeout(budget, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(budget_ms = budget.as_millis() as u64, "compute budget exceeded, cancelling");
                control.cancel();
                return match handle.await.context("Compute task failed")? {
                    Ok(_) | Err(ForecastError::Cancelled) => Err(ForecastError::TimedOut {
                        budget_ms: budget.as_millis() as u64,
                    }
                    .into()),
                    Err(e) => Err(e.into()),
                };
            }
        },
        None => handle.await,
    };

    Ok(joined.context("Compute task failed")??)
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to serialize result")
}

fn matchup_for_team(ctx: &SimulationContext, team_id: TeamId) -> Result<MatchupId> {
    ctx.matchups()
        .iter()
        .find(|m| m.teams.contains(&team_id))
        .map(|m| m.matchup_id)
        .with_context(|| format!("Team {team_id} has no matchup in week {}", ctx.week()))
}

/// Execute a command against a prefetcher and return its JSON result
pub async fn execute(
    command: Command,
    prefetcher: &Prefetcher,
    league_id: &str,
    control: &RunControl,
) -> Result<Value> {
    let budget = prefetcher.config().timeout();
    info!(command = command.name(), league_id, "running forecast");

    match command {
        Command::Matchup { week, matchup_id } => {
            let ctx = prefetcher.load_week(league_id, week).await?;
            let plan = ctx.trial_plan();
            let result = compute(control, budget, move |control| {
                ctx.install(|| simulate_matchup(&ctx, matchup_id, &plan, &control))
            })
            .await?;
            to_json(&result)
        }
        Command::Week { week } => {
            let ctx = prefetcher.load_week(league_id, week).await?;
            let plan = ctx.trial_plan();
            let result = compute(control, budget, move |control| {
                ctx.install(|| simulate_week(&ctx, &plan, &control))
            })
            .await?;
            to_json(&result)
        }
        Command::Championship { weeks, teams, expected_teams } => {
            let mut request = prefetcher.load_championship(league_id, teams, &weeks).await?;
            request.expected_teams = expected_teams;
            let config = prefetcher.config().clone();
            let plan = TrialPlan::from_config(&config);
            let result = compute(control, budget, move |control| {
                config.install(|| simulate_championship(&request, &plan, &control))
            })
            .await?;
            to_json(&result)
        }
        Command::Season { from_week } => {
            let request = prefetcher.load_season(league_id, from_week).await?;
            let config = prefetcher.config().clone();
            let plan = TrialPlan::from_config(&config);
            let result = compute(control, budget, move |control| {
                config.install(|| forecast_season(&request, &plan, &control))
            })
            .await?;
            to_json(&result)
        }
        Command::Swaps { week, team } => {
            let ctx = prefetcher.load_week(league_id, week).await?;
            let matchup_id = matchup_for_team(&ctx, team)?;
            let plan = ctx.trial_plan();
            let result = compute(control, budget, move |control| {
                let eligibility = PositionEligibility::with_flex(FLEX);
                ctx.install(|| evaluate_swaps(&ctx, matchup_id, team, &eligibility, &plan, &control))
            })
            .await?;
            to_json(&result)
        }
        Command::Lineup { week, team } => {
            let ctx = prefetcher.load_week(league_id, week).await?;
            let matchup_id = matchup_for_team(&ctx, team)?;
            let plan = ctx.trial_plan();
            let result = compute(control, budget, move |control| {
                let eligibility = PositionEligibility::with_flex(FLEX);
                ctx.install(|| {
                    evaluate_lineup(&ctx, matchup_id, team, &GreedyOptimizer, &eligibility, &plan, &control)
                })
            })
            .await?;
            to_json(&result)
        }
    }
}
