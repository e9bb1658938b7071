//! Benchmark configuration
//!
//! The configuration document is read once at startup and stays read-only for
//! the lifetime of the process. Keys follow the historical camelCase layout
//! (`createPrimary`, `cbhost`, `dropOnFinish`, ...).

use crate::common::error::{BenchError, BenchResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::constants::{
    DEFAULT_EXECUTION_OUTPUT, DEFAULT_EXPLAIN_OUTPUT, DEFAULT_PAUSE, DEFAULT_QUERY_TIMEOUT,
    SETTLE_PAUSE_MULTIPLIER,
};

/// Target system flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Couchbase query service over HTTP
    #[default]
    Couchbase,
    /// Local SQLite database file
    Sqlite,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Couchbase => write!(f, "couchbase"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// An index created around a benchmark run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSpec {
    pub name: String,
    /// Field expressions, in order
    #[serde(default)]
    pub definition: Vec<String>,
    #[serde(default)]
    pub drop_on_finish: bool,
}

/// A named query and the indexes it needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

/// Connection parameters for the target system
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetConfig {
    pub backend: Backend,
    pub host: String,
    pub bucket: String,
    pub user: String,
    pub password: String,
    pub database: Option<PathBuf>,
}

/// The whole benchmark plan as loaded from disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkConfig {
    /// Concurrency levels, run in listed order
    pub concurrency: Vec<u32>,
    /// Sequential executions per worker
    pub repetitions: u32,
    #[serde(default)]
    pub create_primary: bool,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub cbhost: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// SQLite database file, required for the sqlite backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// Common indexes, created before any query runs
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    pub queries: Vec<QuerySpec>,
}

impl BenchmarkConfig {
    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> BenchResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            BenchError::Config(format!(
                "cannot open the configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&data)
    }

    /// Parse and validate a configuration document
    pub fn from_json(data: &str) -> BenchResult<Self> {
        let config: BenchmarkConfig = serde_json::from_str(data)
            .map_err(|e| BenchError::Config(format!("invalid configuration file or format: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.repetitions == 0 {
            return Err(BenchError::Config("repetitions must be positive".to_string()));
        }
        if let Some(pos) = self.concurrency.iter().position(|&c| c == 0) {
            return Err(BenchError::Config(format!(
                "concurrency level #{} must be positive",
                pos + 1
            )));
        }
        for (idx, query) in self.queries.iter().enumerate() {
            if query.name.trim().is_empty() {
                return Err(BenchError::Config(format!("query #{} has no name", idx + 1)));
            }
            if query.query.trim().is_empty() {
                return Err(BenchError::Config(format!(
                    "query '{}' has an empty statement",
                    query.name
                )));
            }
        }
        for index in self.indexes.iter().chain(self.queries.iter().flat_map(|q| q.indexes.iter())) {
            if index.name.trim().is_empty() {
                return Err(BenchError::Config("index without a name".to_string()));
            }
        }
        if self.backend == Backend::Sqlite && self.database.is_none() {
            return Err(BenchError::Config(
                "the sqlite backend needs a 'database' path".to_string(),
            ));
        }
        Ok(())
    }

    /// Connection parameters extracted from the flat document
    pub fn target(&self) -> TargetConfig {
        TargetConfig {
            backend: self.backend,
            host: self.cbhost.clone(),
            bucket: self.bucket.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }

    /// Number of report records a full run produces
    pub fn expected_records(&self) -> usize {
        self.queries.len() * self.concurrency.len()
    }
}

/// Runtime knobs supplied on the command line
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub query_timeout: Duration,
    /// Sleep before every concurrency run
    pub pause: Duration,
    /// Multiplier applied to `pause` after each query's sweep
    pub settle_multiplier: u32,
    pub execution_output: PathBuf,
    pub explain_output: PathBuf,
}

impl RunSettings {
    pub fn settle_pause(&self) -> Duration {
        self.pause * self.settle_multiplier
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            pause: DEFAULT_PAUSE,
            settle_multiplier: SETTLE_PAUSE_MULTIPLIER,
            execution_output: PathBuf::from(DEFAULT_EXECUTION_OUTPUT),
            explain_output: PathBuf::from(DEFAULT_EXPLAIN_OUTPUT),
        }
    }
}
