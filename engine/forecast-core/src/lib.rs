//! # Forecast Core
//!
//! Correlated Monte Carlo engine for fantasy football outcomes.
//!
//! Player scores are sampled per NFL game through a Gaussian copula so that
//! stacks and bring-backs move together, then summed into fantasy team totals
//! trial by trial. On top of that sit the matchup, league-week,
//! championship and season forecasts plus lineup swap evaluation.
//!
//! All compute is synchronous and runs on rayon. Inputs arrive in a single
//! immutable [`SimulationContext`] built after the load phase.

pub mod championship;
pub mod config;
pub mod context;
pub mod control;
pub mod correlation;
pub mod distribution;
pub mod error;
pub mod game;
pub mod lineup;
pub mod linalg;
pub mod matchup;
pub mod pool;
pub mod run;
pub mod sampler;
pub mod season;
pub mod stats;
pub mod types;
pub mod week;

#[cfg(test)]
mod tests;


pub use championship::{
    simulate_championship, ChampionshipRequest, ChampionshipResult, ChampionshipTeamResult,
    WeekInput, WeekProvenance, WeekSource,
};
pub use config::{
    CorrelationConfig, DistributionConfig, PositionShape, SeasonForecastConfig, ShapeHint,
    SimulationConfig,
};
pub use context::{PlayerState, SimulationContext, SimulationContextBuilder, TrialPlan};
pub use control::RunControl;
pub use correlation::{
    ArchetypeCorrelation, CorrelationDefaults, CorrelationLookup, CorrelationMatrix,
    CorrelationMatrixBuilder, CorrelationSource, GameOutcomeDefaults, PositionCorrelation,
};
pub use distribution::{DistributionFitter, DistributionParams, DistributionType, StdSource};
pub use error::{ForecastError, Result};
pub use game::{simulate_game, GameSimulation};
pub use lineup::{
    evaluate_lineup, evaluate_swaps, GreedyOptimizer, LineupEvaluation, LineupOptimizer,
    PositionEligibility, SlotEligibility, SwapEvaluation, SwapReport,
};
pub use matchup::{simulate_lineups, simulate_matchup, MatchupResult, TeamResult};
pub use pool::{simulate_player_pool, PoolSimulation, RunDiagnostics};
pub use run::{run_simulation, SimulationInput, SimulationOutput};
pub use season::{forecast_season, SeasonForecast, SeasonRequest, SeasonTeamForecast};
pub use stats::{ScoreDistribution, WinTally};
pub use types::*;
pub use week::{simulate_team_totals, simulate_week, WeekResult};

/// Current version of the forecast engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Monte Carlo trials per run
pub const DEFAULT_TRIALS: usize = 10_000;

/// Default trials per RNG stream
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default trials per week when precomputing season matchup odds
pub const DEFAULT_PRECOMPUTE_TRIALS: usize = 2_000;
