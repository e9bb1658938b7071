//! Shared test fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use querybench::{BenchError, BenchResult, BenchmarkConfig, QueryClient, RunSettings};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// In-memory client with deterministic outcomes
pub struct ScriptedClient {
    /// Execution time reported for every successful statement
    pub latency: Duration,
    /// Statements that always fail
    pub failing_statements: HashSet<String>,
    pub fail_index_ops: bool,
    pub fail_explain: bool,
    /// Fail every n-th execution across all workers, 0 disables
    pub fail_every: u64,
    executions: AtomicU64,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failing_statements: HashSet::new(),
            fail_index_ops: false,
            fail_explain: false,
            fail_every: 0,
            executions: AtomicU64::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, statement: &str) -> Self {
        self.failing_statements.insert(statement.to_string());
        self
    }

    pub fn with_failing_index_ops(mut self) -> Self {
        self.fail_index_ops = true;
        self
    }

    pub fn with_failing_explain(mut self) -> Self {
        self.fail_explain = true;
        self
    }

    pub fn with_fail_every(mut self, n: u64) -> Self {
        self.fail_every = n;
        self
    }

    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// Index and explain calls, in the order they were made
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl QueryClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(&self, statement: &str, _timeout: Duration) -> BenchResult<Duration> {
        let n = self.executions.fetch_add(1, Ordering::Relaxed) + 1;
        tokio::task::yield_now().await;
        if self.failing_statements.contains(statement) {
            return Err(BenchError::QueryExecution(format!("scripted failure: {}", statement)));
        }
        if self.fail_every > 0 && n % self.fail_every == 0 {
            return Err(BenchError::Timeout(Duration::from_millis(1)));
        }
        Ok(self.latency)
    }

    async fn explain(&self, statement: &str, _timeout: Duration) -> BenchResult<serde_json::Value> {
        self.log(format!("explain {}", statement));
        if self.fail_explain {
            return Err(BenchError::QueryExecution("explain unavailable".to_string()));
        }
        Ok(serde_json::json!({ "plan": { "#operator": "Sequence" }, "text": statement }))
    }

    async fn create_index(&self, name: &str, definition: &[String]) -> BenchResult<()> {
        self.log(format!("create {}({})", name, definition.join(",")));
        if self.fail_index_ops {
            return Err(BenchError::IndexOperation(format!("cannot create {}", name)));
        }
        Ok(())
    }

    async fn drop_index(&self, name: &str) -> BenchResult<()> {
        self.log(format!("drop {}", name));
        if self.fail_index_ops {
            return Err(BenchError::IndexOperation(format!("cannot drop {}", name)));
        }
        Ok(())
    }

    async fn create_primary_index(&self) -> BenchResult<()> {
        self.log("create primary".to_string());
        if self.fail_index_ops {
            return Err(BenchError::IndexOperation("cannot create primary".to_string()));
        }
        Ok(())
    }
}

/// Settings writing into `dir` with no pauses
pub fn settings_in(dir: &Path, execution_file: &str) -> RunSettings {
    RunSettings {
        query_timeout: Duration::from_secs(5),
        pause: Duration::ZERO,
        settle_multiplier: 3,
        execution_output: dir.join(execution_file),
        explain_output: dir.join("explain.json"),
    }
}

pub fn config(doc: &str) -> BenchmarkConfig {
    BenchmarkConfig::from_json(doc).expect("test config must be valid")
}
