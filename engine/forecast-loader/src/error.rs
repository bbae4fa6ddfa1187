//! Error types for the load phase

use forecast_core::ForecastError;
use projection_merge::MergeError;
use thiserror::Error;

/// Result type alias for load operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors raised while prefetching simulation inputs
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("League not found: {league_id}")]
    LeagueNotFound { league_id: String },

    #[error("Scoring format {format_id} not found for league {league_id}")]
    ScoringFormatNotFound { league_id: String, format_id: String },

    /// Data source failure (missing week, backend error)
    #[error("Data source error: {0}")]
    Source(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

impl LoaderError {
    pub fn data_source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }
}
