//! Cancellation and deadline handling for long-running forecasts

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{ForecastError, Result};

/// Shared cancel flag plus an optional deadline.
///
/// Cloning shares the flag, so a caller can keep one handle and pass another
/// into a blocking compute task.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    cancelled: Arc<AtomicBool>,
    deadline: Option<(Instant, u64)>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Control that times out `budget` from now
    pub fn with_timeout(budget: Duration) -> Self {
        Self::default().deadline_in(budget)
    }

    /// Add a deadline `budget` from now
    pub fn deadline_in(mut self, budget: Duration) -> Self {
        self.deadline = Some((Instant::now() + budget, budget.as_millis() as u64));
        self
    }

    /// Use an externally owned flag (e.g. one registered with a signal handler)
    pub fn with_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// The underlying flag
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fail if cancelled or past the deadline
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ForecastError::Cancelled);
        }
        if let Some((deadline, budget_ms)) = self.deadline {
            if Instant::now() >= deadline {
                return Err(ForecastError::TimedOut { budget_ms });
            }
        }
        Ok(())
    }
}
