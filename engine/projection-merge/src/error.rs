//! Error types for projection merging

use thiserror::Error;

use crate::PlayerId;

pub type Result<T> = std::result::Result<T, MergeError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error("Invalid {stat} probability {value} at threshold {threshold} for player {player_id}")]
    InvalidProbability { player_id: PlayerId, stat: String, threshold: usize, value: f64 },

    #[error("Invalid scoring rule {stat} in format {format_id}: {reason}")]
    InvalidScoringRule { format_id: String, stat: String, reason: String },
}
