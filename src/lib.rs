//! querybench - Concurrent Query Benchmark Harness
//!
//! Runs a plan of named queries against a database target at several
//! concurrency levels, aggregates per-run latency and error statistics and
//! writes execution and explain reports.
//!
pub mod client;
pub mod common;
pub mod config;
pub mod driver;
pub mod execution;
pub mod report;

// Re-export common types for convenience
pub use common::{BenchError, BenchResult};

// Re-export configuration for convenience
pub use config::{Backend, BenchmarkConfig, IndexSpec, QuerySpec, RunSettings, TargetConfig};

// Re-export the execution core for convenience
pub use client::QueryClient;
pub use driver::BenchmarkDriver;
pub use execution::{
    BenchmarkOutcome, ConcurrencyRun, ExplainRecord, LoadGenerator, QueryExecutor, ReportRecord,
    RunStats, RunStatsSnapshot,
};
pub use report::Reporter;
