//! # Projection Merge
//!
//! Reconciles traditional stat projections with sportsbook market-implied
//! lines. Market lines replace the matching projected stats, touchdown
//! threshold ladders are converted to expected touchdowns, and fantasy points
//! are computed once from the merged stat line.

pub mod error;
pub mod market;
pub mod merge;
pub mod scoring;

pub use error::{MergeError, Result};
pub use market::{expected_from_ladder, LadderExpectation, MarketLine};
pub use merge::{MergedProjection, ProjectionMerger, Provenance};
pub use scoring::{stats, ScoringRules, StatLine};

/// Player identifier shared with the forecast engine
pub type PlayerId = u32;
