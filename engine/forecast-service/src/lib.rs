//! Fantasy Forecast Service Library
//!
//! Configuration loading, logging setup and command execution for the
//! `forecast-service` binary. The load phase runs on tokio; compute runs on a
//! blocking task so the runtime stays free to observe timeouts and signals.

use anyhow::{Context, Result};
use forecast_core::RunControl;
use forecast_loader::{ForecastDataSource, InMemorySource, Prefetcher};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub mod cli;
pub mod config;
pub mod logging;
pub mod runner;
pub mod signals;

pub use cli::{Cli, Command};
pub use config::{load_config, ServiceConfig};
pub use logging::initialize_logging;
pub use runner::{compute, execute};
pub use signals::register_cancel_flag;

/// Fold command-line overrides into the loaded configuration
pub fn apply_overrides(cli: &Cli, config: &mut ServiceConfig) {
    if let Some(snapshot) = &cli.snapshot {
        config.service.snapshot = Some(snapshot.clone());
    }
    if let Some(league) = &cli.league {
        config.service.league_id = Some(league.clone());
    }
    if let Some(seed) = cli.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(trials) = cli.trials {
        config.simulation.n_trials = trials;
    }
    if cli.vectors {
        config.simulation.keep_trial_vectors = true;
    }
}

/// Load the snapshot and run one command
pub async fn run(command: Command, config: ServiceConfig, control: &RunControl) -> Result<Value> {
    config.simulation.validate().context("Invalid simulation configuration")?;
    let snapshot = config
        .service
        .snapshot
        .as_deref()
        .context("No league snapshot configured (use --snapshot or FORECAST__SERVICE__SNAPSHOT)")?;
    let league_id = config
        .service
        .league_id
        .as_deref()
        .context("No league configured (use --league or FORECAST__SERVICE__LEAGUE_ID)")?;

    let source = InMemorySource::from_json_file(snapshot)
        .await
        .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;
    info!(league_id, snapshot = %snapshot.display(), "snapshot ready");

    let source: Arc<dyn ForecastDataSource> = Arc::new(source);
    let prefetcher = Prefetcher::new(source, config.simulation.clone());
    execute(command, &prefetcher, league_id, control).await
}
