//! Player-pool simulation: every NFL game touching the pool is run once

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

use crate::context::{PlayerState, SimulationContext, TrialPlan};
use crate::control::RunControl;
use crate::error::Result;
use crate::game::simulate_game;
use crate::types::{GameId, PlayerId};

/// Diagnostic counts for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub trials: usize,
    pub seed: u64,
    pub locked_players: usize,
    pub pending_players: usize,
    pub unprojected_players: usize,
    pub bye_players: usize,
    pub games_simulated: usize,
    pub games_fully_locked: usize,
    pub fallback_cells: usize,
    pub used_fallback: bool,
    pub matrices_regularized: usize,
}

/// Trial vectors for a set of players
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSimulation {
    pub scores: BTreeMap<PlayerId, Vec<f64>>,
    pub diagnostics: RunDiagnostics,
}

impl PoolSimulation {
    pub fn scores_for(&self, player_id: PlayerId) -> Option<&[f64]> {
        self.scores.get(&player_id).map(Vec::as_slice)
    }

    /// Per-trial sum of the given players; players outside the pool add zero
    pub fn team_totals(&self, starters: &[PlayerId]) -> Vec<f64> {
        let mut totals = vec![0.0; self.diagnostics.trials];
        for id in starters {
            if let Some(vector) = self.scores.get(id) {
                for (total, score) in totals.iter_mut().zip(vector) {
                    *total += score;
                }
            }
        }
        totals
    }
}

/// Simulate every player in `player_ids`, running each NFL game once
#[instrument(skip_all, fields(players = player_ids.len(), trials = plan.n_trials))]
pub fn simulate_player_pool(
    ctx: &SimulationContext,
    player_ids: &BTreeSet<PlayerId>,
    plan: &TrialPlan,
    control: &RunControl,
) -> Result<PoolSimulation> {
    control.checkpoint()?;

    let n = plan.n_trials;
    let mut diagnostics = RunDiagnostics { trials: n, seed: plan.seed, ..Default::default() };
    let mut scores = BTreeMap::new();
    let mut games: BTreeMap<GameId, Vec<PlayerId>> = BTreeMap::new();

    for id in player_ids {
        match (ctx.game_for(*id), ctx.player_state(*id)) {
            (Some(entry), _) => games.entry(entry.game_id).or_default().push(*id),
            (None, PlayerState::Locked { score }) => {
                diagnostics.locked_players += 1;
                scores.insert(*id, vec![score; n]);
            }
            (None, PlayerState::Unprojected) if ctx.player(*id).is_none() => {
                diagnostics.unprojected_players += 1;
                scores.insert(*id, vec![0.0; n]);
            }
            (None, _) => {
                diagnostics.bye_players += 1;
                scores.insert(*id, vec![0.0; n]);
            }
        }
    }

    let simulated = games
        .into_par_iter()
        .map(|(game_id, ids)| simulate_game(ctx, game_id, &ids, plan, control))
        .collect::<Result<Vec<_>>>()?;

    for game in simulated {
        diagnostics.locked_players += game.locked_players;
        diagnostics.pending_players += game.pending_players;
        diagnostics.unprojected_players += game.unprojected_players;
        diagnostics.fallback_cells += game.fallback_cells;
        diagnostics.used_fallback |= game.used_fallback;
        if game.regularized {
            diagnostics.matrices_regularized += 1;
        }
        if game.fully_locked {
            diagnostics.games_fully_locked += 1;
        } else {
            diagnostics.games_simulated += 1;
        }
        scores.extend(game.player_ids.into_iter().zip(game.scores));
    }

    debug!(
        games_simulated = diagnostics.games_simulated,
        games_fully_locked = diagnostics.games_fully_locked,
        pending = diagnostics.pending_players,
        "player pool simulated"
    );

    Ok(PoolSimulation { scores, diagnostics })
}
