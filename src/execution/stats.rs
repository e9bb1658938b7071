//! Run statistics
//!
//! One [`RunStats`] accumulator exists per concurrency run. Workers only ever
//! add to it and never read each other's partial state, so plain atomic
//! counters are enough; the join at the end of the run orders every write
//! before the final [`RunStats::snapshot`].

use crate::common::helper::duration_millis;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Shared accumulator for one (query, concurrency level) run
#[derive(Debug, Default)]
pub struct RunStats {
    accumulated_nanos: AtomicU64,
    success_count: AtomicU64,
    error_count: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one successful execution
    pub fn record_success(&self, execution_time: Duration) {
        let nanos = u64::try_from(execution_time.as_nanos()).unwrap_or(u64::MAX);
        self.accumulated_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold in one failed execution
    pub fn record_failure(&self) {
        self.record_failures(1);
    }

    pub fn record_failures(&self, count: u64) {
        self.error_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunStatsSnapshot {
        RunStatsSnapshot {
            accumulated: Duration::from_nanos(self.accumulated_nanos.load(Ordering::Relaxed)),
            success_count: self.success_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
        }
    }
}

/// Frozen view of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStatsSnapshot {
    /// Sum of execution times of all successful executions
    pub accumulated: Duration,
    pub success_count: u64,
    pub error_count: u64,
}

impl RunStatsSnapshot {
    /// Executions attempted, successful or not
    pub fn total(&self) -> u64 {
        self.success_count + self.error_count
    }

    /// Average latency in milliseconds; `None` without a single success
    pub fn average_ms(&self) -> Option<f64> {
        if self.success_count == 0 {
            return None;
        }
        Some(duration_millis(self.accumulated) / self.success_count as f64)
    }

    /// Average latency in milliseconds, NaN when undefined
    pub fn average_ms_or_nan(&self) -> f64 {
        self.average_ms().unwrap_or(f64::NAN)
    }
}
