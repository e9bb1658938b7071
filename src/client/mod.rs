//! Target system clients
//!
//! The benchmark core only sees the [`QueryClient`] capability. Each backend
//! owns its own protocol details (HTTP, embedded SQLite, ...).

pub mod couchbase;
pub mod sqlite;

pub use couchbase::CouchbaseClient;
pub use sqlite::SqliteClient;

use crate::common::error::BenchResult;
use crate::config::{Backend, TargetConfig};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Capability interface to a benchmark target
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Short label used in log lines
    fn name(&self) -> &str;

    /// Run a statement once and return its measured execution time
    async fn execute(&self, statement: &str, timeout: Duration) -> BenchResult<Duration>;

    /// Capture the plan the target would use for a statement
    async fn explain(&self, statement: &str, timeout: Duration) -> BenchResult<serde_json::Value>;

    async fn create_index(&self, name: &str, definition: &[String]) -> BenchResult<()>;

    async fn drop_index(&self, name: &str) -> BenchResult<()>;

    async fn create_primary_index(&self) -> BenchResult<()>;
}

/// Connect to the configured target
pub async fn connect(target: &TargetConfig) -> BenchResult<Arc<dyn QueryClient>> {
    match target.backend {
        Backend::Couchbase => {
            let client = CouchbaseClient::connect(target).await?;
            Ok(Arc::new(client))
        }
        Backend::Sqlite => {
            let client = SqliteClient::connect(target).await?;
            Ok(Arc::new(client))
        }
    }
}
