//! Lineup and swap decision support
//!
//! Every candidate lineup is re-simulated against the same opponents with the
//! baseline's trial plan and seed. Players in NFL games the swap does not touch
//! see identical draws in both runs. Adding or removing a player changes the
//! dimension of that game's correlation matrix, so every player in that game is
//! redrawn and the delta there carries ordinary sampling noise.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::context::{SimulationContext, TrialPlan};
use crate::control::RunControl;
use crate::error::{ForecastError, Result};
use crate::matchup::{matchup_lineups, simulate_lineups};
use crate::types::{MatchupId, Player, PlayerId, Position, TeamId};

/// Roster-slot eligibility rules
pub trait SlotEligibility: Send + Sync {
    /// Whether `incoming` may take the lineup slot currently held by `outgoing`
    fn can_replace(&self, incoming: &Player, outgoing: &Player) -> bool;
}

/// Same-position replacement, optionally with a flex group
#[derive(Debug, Clone, Default)]
pub struct PositionEligibility {
    flex: Vec<Position>,
}

impl PositionEligibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions that may replace one another (e.g. RB/WR/TE)
    pub fn with_flex(flex: impl IntoIterator<Item = Position>) -> Self {
        Self { flex: flex.into_iter().collect() }
    }
}

impl SlotEligibility for PositionEligibility {
    fn can_replace(&self, incoming: &Player, outgoing: &Player) -> bool {
        incoming.position == outgoing.position
            || (self.flex.contains(&incoming.position) && self.flex.contains(&outgoing.position))
    }
}

/// Chooses a starting set from candidates
pub trait LineupOptimizer: Send + Sync {
    /// Return the new starters, one per current starter slot, in slot order
    fn optimize(
        &self,
        ctx: &SimulationContext,
        current: &[PlayerId],
        bench: &[PlayerId],
        eligibility: &dyn SlotEligibility,
    ) -> Result<Vec<PlayerId>>;
}

/// Fills each slot with the highest-projected eligible player
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyOptimizer;

impl LineupOptimizer for GreedyOptimizer {
    fn optimize(
        &self,
        ctx: &SimulationContext,
        current: &[PlayerId],
        bench: &[PlayerId],
        eligibility: &dyn SlotEligibility,
    ) -> Result<Vec<PlayerId>> {
        let projected = |id: PlayerId| ctx.projection(id).unwrap_or(0.0);

        // Started players keep their slot; everyone else is up for grabs
        let mut pool: Vec<PlayerId> = current
            .iter()
            .chain(bench)
            .copied()
            .filter(|id| !ctx.has_started(*id))
            .collect();
        pool.sort_by(|a, b| projected(*b).total_cmp(&projected(*a)).then(a.cmp(b)));

        let mut lineup = Vec::with_capacity(current.len());
        for slot_holder in current {
            if ctx.has_started(*slot_holder) {
                lineup.push(*slot_holder);
                continue;
            }
            let holder = ctx.player(*slot_holder);
            let pick = pool.iter().position(|candidate| match (ctx.player(*candidate), holder) {
                (Some(incoming), Some(outgoing)) => eligibility.can_replace(incoming, outgoing),
                _ => candidate == slot_holder,
            });
            match pick {
                Some(idx) => lineup.push(pool.remove(idx)),
                None => lineup.push(*slot_holder),
            }
        }
        Ok(lineup)
    }
}

/// One evaluated bench-for-starter swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapEvaluation {
    pub player_out: PlayerId,
    pub player_in: PlayerId,
    pub win_probability: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapReport {
    pub matchup_id: MatchupId,
    pub team_id: TeamId,
    pub baseline_win_probability: f64,
    /// Most beneficial first
    pub swaps: Vec<SwapEvaluation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupEvaluation {
    pub matchup_id: MatchupId,
    pub team_id: TeamId,
    pub current: Vec<PlayerId>,
    pub proposed: Vec<PlayerId>,
    pub baseline_win_probability: f64,
    pub proposed_win_probability: f64,
    pub delta: f64,
}

fn team_position(lineups: &[(TeamId, Vec<PlayerId>)], matchup_id: MatchupId, team_id: TeamId) -> Result<usize> {
    lineups
        .iter()
        .position(|(t, _)| *t == team_id)
        .ok_or_else(|| ForecastError::InvalidInput(format!("team {team_id} is not in matchup {matchup_id}")))
}

fn matchup_setup(
    ctx: &SimulationContext,
    matchup_id: MatchupId,
    team_id: TeamId,
) -> Result<(Vec<(TeamId, Vec<PlayerId>)>, usize)> {
    let matchup = ctx
        .matchups()
        .iter()
        .find(|m| m.matchup_id == matchup_id)
        .ok_or_else(|| ForecastError::InvalidInput(format!("unknown matchup {matchup_id}")))?;
    let lineups = matchup_lineups(ctx, matchup)?;
    let slot = team_position(&lineups, matchup_id, team_id)?;
    Ok((lineups, slot))
}

fn win_probability(
    ctx: &SimulationContext,
    matchup_id: MatchupId,
    lineups: &[(TeamId, Vec<PlayerId>)],
    team_id: TeamId,
    plan: &TrialPlan,
    control: &RunControl,
) -> Result<f64> {
    let result = simulate_lineups(ctx, matchup_id, lineups, plan, control)?;
    Ok(result.win_probability(team_id).unwrap_or(0.0))
}

/// Evaluate every eligible bench-for-starter swap for one team
#[instrument(skip(ctx, eligibility, plan, control))]
pub fn evaluate_swaps(
    ctx: &SimulationContext,
    matchup_id: MatchupId,
    team_id: TeamId,
    eligibility: &dyn SlotEligibility,
    plan: &TrialPlan,
    control: &RunControl,
) -> Result<SwapReport> {
    let (lineups, slot) = matchup_setup(ctx, matchup_id, team_id)?;
    let baseline = win_probability(ctx, matchup_id, &lineups, team_id, plan, control)?;
    let roster = ctx.roster(team_id)?;

    let mut swaps = Vec::new();
    for player_out in &roster.starters {
        if ctx.has_started(*player_out) {
            continue;
        }
        let Some(outgoing) = ctx.player(*player_out) else { continue };

        for player_in in &roster.bench {
            if ctx.has_started(*player_in) {
                continue;
            }
            let Some(incoming) = ctx.player(*player_in) else { continue };
            if !eligibility.can_replace(incoming, outgoing) {
                continue;
            }

            control.checkpoint()?;
            let mut candidate = lineups.clone();
            for id in candidate[slot].1.iter_mut() {
                if *id == *player_out {
                    *id = *player_in;
                }
            }
            let win = win_probability(ctx, matchup_id, &candidate, team_id, plan, control)?;
            debug!(player_out, player_in, win, "swap evaluated");
            swaps.push(SwapEvaluation {
                player_out: *player_out,
                player_in: *player_in,
                win_probability: win,
                delta: win - baseline,
            });
        }
    }

    swaps.sort_by(|a, b| {
        b.delta
            .total_cmp(&a.delta)
            .then(a.player_out.cmp(&b.player_out))
            .then(a.player_in.cmp(&b.player_in))
    });

    info!(candidates = swaps.len(), baseline, "swaps evaluated");
    Ok(SwapReport { matchup_id, team_id, baseline_win_probability: baseline, swaps })
}

/// Compare an optimizer's lineup against the current one by simulation
#[instrument(skip(ctx, optimizer, eligibility, plan, control))]
pub fn evaluate_lineup(
    ctx: &SimulationContext,
    matchup_id: MatchupId,
    team_id: TeamId,
    optimizer: &dyn LineupOptimizer,
    eligibility: &dyn SlotEligibility,
    plan: &TrialPlan,
    control: &RunControl,
) -> Result<LineupEvaluation> {
    let (lineups, slot) = matchup_setup(ctx, matchup_id, team_id)?;
    let roster = ctx.roster(team_id)?;
    let proposed = optimizer.optimize(ctx, &roster.starters, &roster.bench, eligibility)?;

    if let Some(moved) = roster
        .starters
        .iter()
        .find(|id| ctx.has_started(**id) && !proposed.contains(id))
    {
        return Err(ForecastError::InvalidInput(format!(
            "optimizer benched player {moved} whose game has started"
        )));
    }

    let baseline = win_probability(ctx, matchup_id, &lineups, team_id, plan, control)?;
    let mut candidate = lineups.clone();
    candidate[slot].1 = proposed.clone();
    let proposed_win = win_probability(ctx, matchup_id, &candidate, team_id, plan, control)?;

    Ok(LineupEvaluation {
        matchup_id,
        team_id,
        current: roster.starters.clone(),
        proposed,
        baseline_win_probability: baseline,
        proposed_win_probability: proposed_win,
        delta: proposed_win - baseline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: PlayerId, position: Position) -> Player {
        Player { id, name: format!("P{id}"), position, nfl_team: "KC".to_string(), archetype: None }
    }

    #[test]
    fn test_position_eligibility() {
        let rules = PositionEligibility::new();
        assert!(rules.can_replace(&player(1, Position::WR), &player(2, Position::WR)));
        assert!(!rules.can_replace(&player(1, Position::RB), &player(2, Position::WR)));

        let flex = PositionEligibility::with_flex([Position::RB, Position::WR, Position::TE]);
        assert!(flex.can_replace(&player(1, Position::RB), &player(2, Position::WR)));
        assert!(!flex.can_replace(&player(1, Position::QB), &player(2, Position::WR)));
    }
}
