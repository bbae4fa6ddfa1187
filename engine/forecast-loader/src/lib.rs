//! # Forecast Loader
//!
//! Asynchronous load phase for the forecast engine. Data arrives through the
//! [`ForecastDataSource`] seam as plain keyed mappings; the [`Prefetcher`]
//! fetches everything a run needs concurrently, merges projections with
//! market lines, scores completed games and hands back an immutable
//! [`forecast_core::SimulationContext`]. No I/O happens after this phase.

pub mod error;
pub mod memory;
pub mod prefetch;
pub mod source;

pub use error::{LoaderError, Result};
pub use memory::{InMemorySource, LeagueSnapshot, NflSeasonSnapshot, NflWeekSnapshot};
pub use prefetch::Prefetcher;
pub use source::{ForecastDataSource, ProjectionRecord};
