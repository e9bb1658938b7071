//! Query executor
//!
//! Issues a single statement against the target and turns whatever happens
//! into a typed result. The client is expected to honour the timeout itself;
//! the executor adds a short grace period on top so a client that ignores it
//! still cannot hold a worker forever.

use crate::client::QueryClient;
use crate::common::constants::TIMEOUT_GRACE;
use crate::common::error::{BenchError, BenchResult};
use crate::execution::record::ExplainRecord;
use std::sync::Arc;
use std::time::Duration;

/// Executes statements with a fixed per-query timeout
pub struct QueryExecutor {
    client: Arc<dyn QueryClient>,
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new(client: Arc<dyn QueryClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Run the statement exactly once and return its execution time
    pub async fn execute_once(&self, statement: &str) -> BenchResult<Duration> {
        match tokio::time::timeout(
            self.timeout + TIMEOUT_GRACE,
            self.client.execute(statement, self.timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(BenchError::Timeout(self.timeout)),
        }
    }

    /// Capture the statement's plan instead of timing it
    pub async fn explain(&self, statement: &str) -> BenchResult<ExplainRecord> {
        let plan = tokio::time::timeout(
            self.timeout + TIMEOUT_GRACE,
            self.client.explain(statement, self.timeout),
        )
        .await
        .map_err(|_| BenchError::Timeout(self.timeout))??;

        Ok(ExplainRecord {
            query: statement.to_string(),
            plan,
        })
    }
}
