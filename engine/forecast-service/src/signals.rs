//! Signal handling for cancelling in-flight forecasts

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::debug;

/// Register SIGINT and SIGTERM to raise a shared cancel flag.
///
/// The flag is handed to `RunControl`, so a signal stops the compute at its
/// next checkpoint and the run fails with `Cancelled` instead of printing
/// partial odds.
pub fn register_cancel_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&flag))
            .with_context(|| format!("Failed to register handler for signal {signal}"))?;
    }
    debug!("cancel signal handlers registered");
    Ok(flag)
}
