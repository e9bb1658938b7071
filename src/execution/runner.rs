//! Load generation
//!
//! A concurrency run fans out `C` workers, each executing the statement `R`
//! times back to back, all folding into one fresh [`RunStats`]. The run ends
//! at a single join point once every worker is done; there is no early exit
//! on failure and no cancellation.

use crate::execution::executor::QueryExecutor;
use crate::execution::stats::{RunStats, RunStatsSnapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Outcome of one concurrency run
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyRun {
    pub stats: RunStatsSnapshot,
    /// Wall-clock time of the whole burst, informational only
    pub wall_time: Duration,
}

/// Execute `statement` `repetitions` times in sequence, folding every outcome
/// into `stats`. Failures never stop the loop.
pub async fn run_repetitions(
    executor: &QueryExecutor,
    statement: &str,
    repetitions: u32,
    stats: &RunStats,
) {
    for _ in 0..repetitions {
        match executor.execute_once(statement).await {
            Ok(execution_time) => stats.record_success(execution_time),
            Err(e) => {
                debug!("Query failed: {}", e);
                stats.record_failure();
            }
        }
    }
}

/// Fans a statement out over concurrent workers
#[derive(Clone)]
pub struct LoadGenerator {
    executor: Arc<QueryExecutor>,
}

impl LoadGenerator {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    /// Run `concurrency` workers of `repetitions` executions each and wait for all of them
    pub async fn run(&self, statement: Arc<str>, concurrency: u32, repetitions: u32) -> ConcurrencyRun {
        let stats = Arc::new(RunStats::new());
        let started = Instant::now();

        let mut workers = JoinSet::new();
        for _ in 0..concurrency {
            let executor = Arc::clone(&self.executor);
            let statement = Arc::clone(&statement);
            let stats = Arc::clone(&stats);
            workers.spawn(async move {
                run_repetitions(&executor, &statement, repetitions, &stats).await;
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("Benchmark worker aborted: {}", e);
            }
        }
        let wall_time = started.elapsed();

        // A worker that died mid-loop leaves executions unaccounted for; they count as errors.
        let expected = u64::from(concurrency) * u64::from(repetitions);
        let observed = stats.snapshot().total();
        if observed < expected {
            warn!(
                "{} executions were lost by aborted workers, counting them as errors",
                expected - observed
            );
            stats.record_failures(expected - observed);
        }

        ConcurrencyRun {
            stats: stats.snapshot(),
            wall_time,
        }
    }
}
