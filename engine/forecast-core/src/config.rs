//! Configuration for simulation runs
//!
//! Every recognized option is enumerated here with its default. A config is
//! resolved once when a run is constructed and is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ForecastError, Result};
use crate::types::Position;
use crate::{DEFAULT_CHUNK_SIZE, DEFAULT_PRECOMPUTE_TRIALS, DEFAULT_TRIALS};

/// Top-level configuration for a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of Monte Carlo trials per run
    pub n_trials: usize,

    /// Seed for reproducible runs (a fresh one is drawn when absent)
    pub seed: Option<u64>,

    /// Trials generated per RNG stream
    pub chunk_size: usize,

    /// Return raw per-team and per-player trial vectors
    pub keep_trial_vectors: bool,

    /// Abort long runs after this many milliseconds
    pub timeout_ms: Option<u64>,

    /// Dedicated rayon pool size (global pool when absent)
    pub thread_pool_size: Option<usize>,

    /// Distribution fitting parameters
    pub distribution: DistributionConfig,

    /// Correlation matrix parameters
    pub correlation: CorrelationConfig,

    /// Season forecast parameters
    pub season: SeasonForecastConfig,
}

/// How skewed a position's scoring distribution is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeHint {
    /// Many touches, scoring accumulates steadily (QB)
    HighVolume,
    /// Moderate volume (RB, K)
    Balanced,
    /// Boom/bust, touchdown-dependent (WR, TE)
    TouchdownDependent,
    /// Roughly symmetric around the mean (DST)
    Symmetric,
}

impl ShapeHint {
    /// Distance from mean to the log-normal shift, in standard deviations.
    /// `None` means the position uses a floored normal instead.
    pub fn shift_sigmas(&self) -> Option<f64> {
        match self {
            ShapeHint::HighVolume => Some(4.0),
            ShapeHint::Balanced => Some(3.0),
            ShapeHint::TouchdownDependent => Some(2.0),
            ShapeHint::Symmetric => None,
        }
    }
}

/// Scoring floor and skew for a position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionShape {
    pub position: Position,
    pub floor: f64,
    pub hint: ShapeHint,
}

/// Parameters for turning projections into sampleable distributions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Coefficient of variation when a player has some history but too little to trust
    pub default_cv: f64,

    /// Coefficient of variation for players with no game history
    pub rookie_cv: f64,

    /// Minimum games before the historical std is used directly
    pub min_games: u32,

    /// Lower bound on std for players with a positive projection
    pub min_std: f64,

    /// Per-position floors and shape hints
    pub positions: Vec<PositionShape>,
}

/// Parameters for correlation matrix assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Data year to prefer (defaults to the context season)
    pub season: Option<i32>,

    /// How many years back a historical pair may come from
    pub lookback_years: i32,

    /// Off-diagonal magnitude cap
    pub max_abs_correlation: f64,

    /// Eigenvalue floor used when repairing non-PSD matrices
    pub min_eigenvalue: f64,

    /// Map target correlations into normal space so uniforms carry the target
    pub copula_adjustment: bool,

    /// Cholesky retries with growing diagonal jitter
    pub jitter_attempts: u32,
}

/// Parameters for the season-long forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonForecastConfig {
    /// Trials for each remaining week's matchup probability precompute
    pub precompute_trials: usize,

    /// Season-level Monte Carlo trials
    pub season_trials: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_trials: DEFAULT_TRIALS,
            seed: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            keep_trial_vectors: false,
            timeout_ms: None,
            thread_pool_size: None,
            distribution: DistributionConfig::default(),
            correlation: CorrelationConfig::default(),
            season: SeasonForecastConfig::default(),
        }
    }
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            default_cv: 0.45,
            rookie_cv: 0.60,
            min_games: 3,
            min_std: 0.5,
            positions: vec![
                PositionShape { position: Position::QB, floor: -4.0, hint: ShapeHint::HighVolume },
                PositionShape { position: Position::RB, floor: -2.0, hint: ShapeHint::Balanced },
                PositionShape {
                    position: Position::WR,
                    floor: -2.0,
                    hint: ShapeHint::TouchdownDependent,
                },
                PositionShape {
                    position: Position::TE,
                    floor: -2.0,
                    hint: ShapeHint::TouchdownDependent,
                },
                PositionShape { position: Position::K, floor: -2.0, hint: ShapeHint::Balanced },
                PositionShape { position: Position::DST, floor: -10.0, hint: ShapeHint::Symmetric },
            ],
        }
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            season: None,
            lookback_years: 1,
            max_abs_correlation: 0.95,
            min_eigenvalue: 1e-6,
            copula_adjustment: true,
            jitter_attempts: 5,
        }
    }
}

impl Default for SeasonForecastConfig {
    fn default() -> Self {
        Self { precompute_trials: DEFAULT_PRECOMPUTE_TRIALS, season_trials: DEFAULT_TRIALS }
    }
}

impl DistributionConfig {
    /// Shape for a position, falling back to a balanced zero-floor shape
    pub fn shape_for(&self, position: Position) -> PositionShape {
        self.positions.iter().find(|s| s.position == position).copied().unwrap_or(
            PositionShape { position, floor: 0.0, hint: ShapeHint::Balanced },
        )
    }
}

impl SimulationConfig {
    /// Config with a fixed seed and trial count
    pub fn seeded(seed: u64, n_trials: usize) -> Self {
        Self { seed: Some(seed), n_trials, ..Default::default() }
    }

    /// Worker threads a run will use
    pub fn worker_threads(&self) -> usize {
        self.thread_pool_size.unwrap_or_else(num_cpus::get)
    }

    /// Run `f` on a dedicated pool when `thread_pool_size` is set, else on the global pool
    pub fn install<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send,
        T: Send,
    {
        tracing::debug!(threads = self.worker_threads(), "running on compute pool");
        match self.thread_pool_size {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("forecast-worker-{i}"))
                    .build()?;
                pool.install(f)
            }
            None => f(),
        }
    }

    /// Get the timeout as Duration
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Reject configurations that cannot produce a valid run
    pub fn validate(&self) -> Result<()> {
        if self.n_trials == 0 {
            return Err(ForecastError::InvalidConfig("n_trials must be positive".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(ForecastError::InvalidConfig("chunk_size must be positive".to_string()));
        }
        if self.thread_pool_size == Some(0) {
            return Err(ForecastError::InvalidConfig(
                "thread_pool_size must be positive when set".to_string(),
            ));
        }

        let d = &self.distribution;
        if !(d.default_cv > 0.0 && d.rookie_cv > 0.0) {
            return Err(ForecastError::InvalidConfig(
                "coefficients of variation must be positive".to_string(),
            ));
        }
        if d.min_std < 0.0 {
            return Err(ForecastError::InvalidConfig("min_std must be non-negative".to_string()));
        }

        let c = &self.correlation;
        if !(0.0..=1.0).contains(&c.max_abs_correlation) {
            return Err(ForecastError::InvalidConfig(
                "max_abs_correlation must be within [0, 1]".to_string(),
            ));
        }
        if !(c.min_eigenvalue > 0.0 && c.min_eigenvalue < 1.0) {
            return Err(ForecastError::InvalidConfig(
                "min_eigenvalue must be within (0, 1)".to_string(),
            ));
        }
        if c.lookback_years < 0 {
            return Err(ForecastError::InvalidConfig(
                "lookback_years must be non-negative".to_string(),
            ));
        }

        if self.season.precompute_trials == 0 || self.season.season_trials == 0 {
            return Err(ForecastError::InvalidConfig(
                "season trial counts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ForecastError::InvalidConfig(format!("read failed: {e}")))?;
        let config: SimulationConfig = toml::from_str(&content)
            .map_err(|e| ForecastError::InvalidConfig(format!("parse failed: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ForecastError::InvalidConfig(format!("serialize failed: {e}")))?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| ForecastError::InvalidConfig(format!("write failed: {e}")))?;
        Ok(())
    }
}
