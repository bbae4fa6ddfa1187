//! Fantasy Forecast Service
//!
//! Loads a league snapshot, runs one forecast and prints the result as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use forecast_core::RunControl;
use tracing::{error, info};

use forecast_service::{
    apply_overrides, initialize_logging, load_config, register_cancel_flag, run, Cli,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    apply_overrides(&cli, &mut config);
    initialize_logging(&config.logging.level, &config.logging.format)?;

    info!("Starting Fantasy Forecast Service v{}", env!("CARGO_PKG_VERSION"));

    let control = RunControl::new().with_flag(register_cancel_flag()?);
    let command = cli.command.clone();

    match run(command, config, &control).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!("Forecast failed: {:#}", e);
            Err(e)
        }
    }
}
