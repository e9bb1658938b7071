//! Load generator tests
//!
//! Fan-out, barrier join and statistics folding against scripted clients.

mod common;

use async_trait::async_trait;
use common::ScriptedClient;
use querybench::{BenchError, BenchResult, LoadGenerator, QueryClient, QueryExecutor, RunStats};
use querybench::execution::run_repetitions;
use std::sync::Arc;
use std::time::Duration;

fn generator(client: Arc<dyn QueryClient>) -> LoadGenerator {
    LoadGenerator::new(Arc::new(QueryExecutor::new(client, Duration::from_secs(5))))
}

/// Client whose execute panics on every call after the first `healthy` ones
struct PanickingClient {
    healthy: u64,
    calls: std::sync::atomic::AtomicU64,
}

#[async_trait]
impl QueryClient for PanickingClient {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn execute(&self, _statement: &str, _timeout: Duration) -> BenchResult<Duration> {
        let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if n >= self.healthy {
            panic!("client blew up");
        }
        Ok(Duration::from_millis(1))
    }

    async fn explain(&self, _statement: &str, _timeout: Duration) -> BenchResult<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn create_index(&self, _name: &str, _definition: &[String]) -> BenchResult<()> {
        Ok(())
    }

    async fn drop_index(&self, _name: &str) -> BenchResult<()> {
        Ok(())
    }

    async fn create_primary_index(&self) -> BenchResult<()> {
        Ok(())
    }
}

/// Client that ignores the timeout it is given
struct StuckClient;

#[async_trait]
impl QueryClient for StuckClient {
    fn name(&self) -> &str {
        "stuck"
    }

    async fn execute(&self, _statement: &str, _timeout: Duration) -> BenchResult<Duration> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Duration::from_secs(30))
    }

    async fn explain(&self, _statement: &str, _timeout: Duration) -> BenchResult<serde_json::Value> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(serde_json::Value::Null)
    }

    async fn create_index(&self, _name: &str, _definition: &[String]) -> BenchResult<()> {
        Ok(())
    }

    async fn drop_index(&self, _name: &str) -> BenchResult<()> {
        Ok(())
    }

    async fn create_primary_index(&self) -> BenchResult<()> {
        Ok(())
    }
}

/// success + error == C x R for every combination
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_counts_add_up_to_concurrency_times_repetitions() {
    let client = Arc::new(ScriptedClient::new(Duration::from_millis(2)).with_fail_every(7));
    let generator = generator(client.clone());

    let mut expected_executions = 0;
    for &(concurrency, repetitions) in &[(1u32, 1u32), (1, 5), (4, 3), (16, 7), (32, 1)] {
        let run = generator.run(Arc::from("SELECT 1"), concurrency, repetitions).await;
        let expected = u64::from(concurrency) * u64::from(repetitions);
        assert_eq!(run.stats.total(), expected, "C={} R={}", concurrency, repetitions);
        assert_eq!(
            run.stats.accumulated,
            Duration::from_millis(2) * run.stats.success_count as u32
        );
        expected_executions += expected;
    }
    assert_eq!(client.executions(), expected_executions);
}

/// An always failing statement yields zero successes and no average
#[tokio::test]
async fn test_always_failing_query() {
    let client = Arc::new(ScriptedClient::new(Duration::from_millis(5)).failing("SELECT broken"));
    let run = generator(client).run(Arc::from("SELECT broken"), 5, 4).await;

    assert_eq!(run.stats.success_count, 0);
    assert_eq!(run.stats.error_count, 20);
    assert_eq!(run.stats.accumulated, Duration::ZERO);
    assert!(run.stats.average_ms().is_none());
    assert!(run.stats.average_ms_or_nan().is_nan());
}

/// Every run starts from a fresh accumulator
#[tokio::test]
async fn test_runs_do_not_share_state() {
    let client = Arc::new(ScriptedClient::new(Duration::from_millis(10)));
    let generator = generator(client);

    let first = generator.run(Arc::from("SELECT 1"), 1, 3).await;
    let second = generator.run(Arc::from("SELECT 1"), 10, 3).await;

    assert_eq!(first.stats.success_count, 3);
    assert_eq!(first.stats.accumulated, Duration::from_millis(30));
    assert_eq!(second.stats.success_count, 30);
    assert_eq!(second.stats.accumulated, Duration::from_millis(300));
    assert_eq!(second.stats.average_ms(), Some(10.0));
}

/// Repetitions keep going after failures
#[tokio::test]
async fn test_repetitions_continue_after_failure() {
    let client = Arc::new(ScriptedClient::new(Duration::from_millis(1)).with_fail_every(2));
    let executor = QueryExecutor::new(client.clone(), Duration::from_secs(1));
    let stats = RunStats::new();

    run_repetitions(&executor, "SELECT 1", 10, &stats).await;

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.success_count, 5);
    assert_eq!(snapshot.error_count, 5);
    assert_eq!(client.executions(), 10);
}

/// Executions lost to a panicking worker are counted as errors
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_aborted_worker_counts_missing_executions() {
    let client = Arc::new(PanickingClient {
        healthy: 3,
        calls: Default::default(),
    });
    let run = generator(client).run(Arc::from("SELECT 1"), 4, 5).await;

    assert_eq!(run.stats.total(), 20);
    assert_eq!(run.stats.success_count, 3);
    assert_eq!(run.stats.error_count, 17);
}

/// A client ignoring its timeout is cut off after the grace period
#[tokio::test]
async fn test_executor_enforces_timeout() {
    let executor = QueryExecutor::new(Arc::new(StuckClient), Duration::from_millis(20));

    let err = executor.execute_once("SELECT 1").await.unwrap_err();
    assert!(matches!(err, BenchError::Timeout(d) if d == Duration::from_millis(20)));
    assert!(!err.is_fatal());

    let err = executor.explain("SELECT 1").await.unwrap_err();
    assert!(matches!(err, BenchError::Timeout(_)));
}
