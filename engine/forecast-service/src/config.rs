//! Service configuration management

use anyhow::{Context, Result};
use forecast_core::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment prefix; `FORECAST__SIMULATION__N_TRIALS=5000` sets `simulation.n_trials`
pub const ENV_PREFIX: &str = "FORECAST";

/// Main service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Engine configuration
    pub simulation: SimulationConfig,

    /// Service-level settings
    pub service: ServiceSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where the service reads its inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// League snapshot document
    pub snapshot: Option<PathBuf>,

    /// League to forecast
    pub league_id: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "compact".to_string() }
    }
}

/// Load configuration from an optional TOML file, then environment overrides
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        tracing::debug!("Loading configuration from file: {:?}", path);
        builder = builder.add_source(config::File::from(path));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true),
    );

    let config: ServiceConfig = builder
        .build()
        .context("Failed to read configuration sources")?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &ServiceConfig) -> Result<()> {
    config.simulation.validate().context("Invalid simulation configuration")?;

    match config.logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow::anyhow!("Invalid log level: {}", config.logging.level)),
    }

    match config.logging.format.as_str() {
        "json" | "pretty" | "compact" => {}
        _ => return Err(anyhow::anyhow!("Invalid log format: {}", config.logging.format)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ServiceConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.logging.format, "compact");
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = ServiceConfig::default();
        config.logging.format = "xml".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.toml");
        std::fs::write(
            &path,
            r#"
[simulation]
n_trials = 2500
seed = 17

[simulation.correlation]
lookback_years = 3

[logging]
format = "json"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.simulation.n_trials, 2500);
        assert_eq!(config.simulation.seed, Some(17));
        assert_eq!(config.simulation.correlation.lookback_years, 3);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.simulation.chunk_size, forecast_core::DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_invalid_file_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[simulation]\nn_trials = 0\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
