//! Single NFL game simulation

use tracing::{debug, instrument};

use crate::context::{PlayerState, SimulationContext, TrialPlan};
use crate::control::RunControl;
use crate::distribution::DistributionParams;
use crate::error::Result;
use crate::sampler::CorrelatedSampler;
use crate::types::{GameId, Player, PlayerId};

/// Per-player score vectors for one NFL game
#[derive(Debug, Clone, PartialEq)]
pub struct GameSimulation {
    pub game_id: GameId,
    /// Players in id order
    pub player_ids: Vec<PlayerId>,
    /// `scores[i]` belongs to `player_ids[i]`
    pub scores: Vec<Vec<f64>>,
    pub locked_players: usize,
    pub pending_players: usize,
    pub unprojected_players: usize,
    /// Nothing was sampled
    pub fully_locked: bool,
    pub fallback_cells: usize,
    pub used_fallback: bool,
    pub regularized: bool,
}

impl GameSimulation {
    pub fn scores_for(&self, player_id: PlayerId) -> Option<&[f64]> {
        let idx = self.player_ids.iter().position(|id| *id == player_id)?;
        Some(&self.scores[idx])
    }
}

/// Simulate the given players of one NFL game.
///
/// Both sides of the game share one correlation matrix so bring-back
/// correlations are honored. Locked players get constant vectors and never
/// enter the matrix.
#[instrument(skip(ctx, player_ids, plan, control), fields(players = player_ids.len()))]
pub fn simulate_game(
    ctx: &SimulationContext,
    game_id: GameId,
    player_ids: &[PlayerId],
    plan: &TrialPlan,
    control: &RunControl,
) -> Result<GameSimulation> {
    control.checkpoint()?;

    let mut ids = player_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let n = plan.n_trials;
    let mut scores = vec![Vec::new(); ids.len()];
    let mut pending: Vec<(usize, &Player, DistributionParams)> = Vec::new();
    let mut locked_players = 0;
    let mut unprojected_players = 0;

    for (idx, id) in ids.iter().enumerate() {
        match ctx.player_state(*id) {
            PlayerState::Locked { score } => {
                locked_players += 1;
                scores[idx] = vec![score; n];
            }
            PlayerState::Pending { params, .. } => match ctx.player(*id) {
                Some(player) => pending.push((idx, player, params)),
                None => {
                    unprojected_players += 1;
                    scores[idx] = vec![0.0; n];
                }
            },
            PlayerState::Bye | PlayerState::Unprojected => {
                unprojected_players += 1;
                scores[idx] = vec![0.0; n];
            }
        }
    }

    if pending.is_empty() {
        debug!(game_id, locked_players, "game fully locked, skipping sampling");
        return Ok(GameSimulation {
            game_id,
            player_ids: ids,
            scores,
            locked_players,
            pending_players: 0,
            unprojected_players,
            fully_locked: true,
            fallback_cells: 0,
            used_fallback: false,
            regularized: false,
        });
    }

    let players: Vec<&Player> = pending.iter().map(|(_, p, _)| *p).collect();
    let matrix = ctx.correlation_builder().build(&players, ctx.schedule());
    let params = pending.iter().map(|(_, _, params)| *params).collect();
    let sampler = CorrelatedSampler::new(&matrix, params, &ctx.config().correlation)?;
    let sampled = sampler.sample(plan, u64::from(game_id), control)?;

    for ((idx, _, _), vector) in pending.iter().zip(sampled) {
        scores[*idx] = vector;
    }

    debug!(
        game_id,
        pending = pending.len(),
        locked_players,
        fallback_cells = matrix.fallback_cells(),
        "game simulated"
    );

    Ok(GameSimulation {
        game_id,
        player_ids: ids,
        scores,
        locked_players,
        pending_players: pending.len(),
        unprojected_players,
        fully_locked: false,
        fallback_cells: matrix.fallback_cells(),
        used_fallback: matrix.used_fallback(),
        regularized: matrix.regularized() || sampler.jitter() > 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::types::{GameStatus, Position};

    fn player(id: PlayerId, position: Position, team: &str) -> Player {
        Player { id, name: format!("P{id}"), position, nfl_team: team.to_string(), archetype: None }
    }

    #[test]
    fn test_fully_locked_game_skips_sampling() {
        let ctx = SimulationContext::builder("L", 2024, 5)
            .game(1, "KC", "BUF", GameStatus::Final)
            .players(vec![player(10, Position::QB, "KC"), player(11, Position::WR, "BUF")])
            .locked_score(10, 24.3)
            .locked_score(11, 9.1)
            .config(SimulationConfig::seeded(1, 500))
            .build()
            .unwrap();
        let plan = ctx.trial_plan();
        let game = simulate_game(&ctx, 1, &[11, 10], &plan, &RunControl::new()).unwrap();
        assert!(game.fully_locked);
        assert_eq!(game.player_ids, vec![10, 11]);
        assert!(game.scores_for(10).unwrap().iter().all(|s| *s == 24.3));
        assert!(game.scores_for(11).unwrap().iter().all(|s| *s == 9.1));
    }

    #[test]
    fn test_mixed_game_keeps_locked_constant() {
        let ctx = SimulationContext::builder("L", 2024, 5)
            .game(1, "KC", "BUF", GameStatus::InProgress)
            .players(vec![
                player(10, Position::QB, "KC"),
                player(11, Position::WR, "KC"),
                player(12, Position::WR, "BUF"),
            ])
            .projection(10, 30.0)
            .projection(11, 15.0)
            .projection(12, 12.0)
            .locked_score(10, 24.3)
            .config(SimulationConfig::seeded(9, 2000))
            .build()
            .unwrap();
        let plan = ctx.trial_plan();
        let game = simulate_game(&ctx, 1, &[10, 11, 12], &plan, &RunControl::new()).unwrap();
        assert!(!game.fully_locked);
        assert_eq!(game.locked_players, 1);
        assert_eq!(game.pending_players, 2);
        assert!(game.scores_for(10).unwrap().iter().all(|s| *s == 24.3));
        let wr = game.scores_for(11).unwrap();
        assert_eq!(wr.len(), 2000);
        let mean = wr.iter().sum::<f64>() / wr.len() as f64;
        assert!((mean - 15.0).abs() < 1.0, "mean = {mean}");
    }
}
