//! Engine and per-run options.

use rspub_model::Strategy;
use std::time::Duration;

/// Deadlines of a run. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLimits {
    /// Deadline for scanning.
    pub scan: Option<Duration>,
    /// Deadline for writing documents.
    pub write: Option<Duration>,
    /// Deadline for the whole run.
    pub run: Option<Duration>,
}

impl RunLimits {
    /// No deadlines.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Sets the scan deadline.
    #[must_use]
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan = Some(timeout);
        self
    }

    /// Sets the write deadline.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write = Some(timeout);
        self
    }

    /// Sets the overall run deadline.
    #[must_use]
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run = Some(timeout);
        self
    }
}

/// Options fixed for the lifetime of an engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Threads used for fingerprinting.
    pub concurrency: usize,
    /// Deadlines applied to every run.
    pub limits: RunLimits,
}

impl EngineOptions {
    /// Creates options with one fingerprinting thread per core.
    #[must_use]
    pub fn new() -> Self {
        Self {
            concurrency: std::thread::available_parallelism().map_or(1, |n| n.get()),
            limits: RunLimits::default(),
        }
    }

    /// Sets the number of fingerprinting threads (at least one).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets the run deadlines.
    #[must_use]
    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Choices made per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Overrides the configuration's strategy.
    pub strategy: Option<Strategy>,
    /// Publishes a new resourcelist whatever the history.
    pub start_new: bool,
}

impl RunOptions {
    /// Uses the configuration's strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Forces a new baseline.
    #[must_use]
    pub fn start_new(mut self) -> Self {
        self.start_new = true;
        self
    }
}
