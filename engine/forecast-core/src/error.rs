//! Error types for the forecast engine

use thiserror::Error;

use crate::types::{MatchupId, TeamId};

/// Result type for forecast engine operations
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while building or running a forecast
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("Matchup {matchup_id} has {count} teams, at least 2 are required")]
    InvalidTeamCount { matchup_id: MatchupId, count: usize },

    #[error("Championship round expects {expected} teams but {actual} were supplied")]
    PlayoffTeamCount { expected: usize, actual: usize },

    #[error("Team {team_id} is not part of league {league_id}")]
    UnknownTeam { league_id: String, team_id: TeamId },

    #[error("No roster loaded for team {team_id} in week {week}")]
    MissingRoster { team_id: TeamId, week: u32 },

    #[error("League configuration missing for league {league_id}")]
    MissingLeagueConfig { league_id: String },

    #[error("Season configuration missing for league {league_id}")]
    MissingSeasonConfig { league_id: String },

    #[error("Week {week} has neither actual scores nor simulation inputs for team {team_id}")]
    MissingWeekData { week: u32, team_id: TeamId },

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("Simulation cancelled")]
    Cancelled,

    #[error("Simulation exceeded its deadline of {budget_ms}ms")]
    TimedOut { budget_ms: u64 },

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl ForecastError {
    /// Whether the error came from a cancellation or timeout signal rather than bad input
    pub fn is_interrupted(&self) -> bool {
        matches!(self, ForecastError::Cancelled | ForecastError::TimedOut { .. })
    }
}

impl From<rayon::ThreadPoolBuildError> for ForecastError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        ForecastError::ThreadPool(err.to_string())
    }
}
