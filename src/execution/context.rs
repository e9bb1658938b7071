//! Run Context
//!
//! Mutable state the driver carries through one benchmark: the phase counter,
//! the records collected so far and the error tallies that feed the final
//! "Total errors found" line.

use crate::execution::record::{ExplainRecord, ReportRecord};
use tracing::info;

/// Bookkeeping for one benchmark run
#[derive(Debug, Default)]
pub struct RunContext {
    phase: u32,
    records: Vec<ReportRecord>,
    explains: Vec<ExplainRecord>,
    /// Failed query executions across all runs
    pub query_errors: u64,
    pub explain_failures: u64,
    pub index_failures: u64,
}

impl RunContext {
    pub fn new(query_count: usize, level_count: usize) -> Self {
        Self {
            records: Vec::with_capacity(query_count * level_count),
            explains: Vec::with_capacity(query_count),
            ..Self::default()
        }
    }

    /// Announce the next phase
    pub fn phase(&mut self, message: &str) {
        self.phase += 1;
        info!("Phase {} {}", self.phase, message);
    }

    pub fn push_record(&mut self, record: ReportRecord) {
        self.query_errors += record.stats.error_count;
        self.records.push(record);
    }

    pub fn push_explain(&mut self, explain: ExplainRecord) {
        self.explains.push(explain);
    }

    pub fn records(&self) -> &[ReportRecord] {
        &self.records
    }

    pub fn total_errors(&self) -> u64 {
        self.query_errors + self.explain_failures + self.index_failures
    }

    pub fn into_outcome(self) -> BenchmarkOutcome {
        let total_errors = self.total_errors();
        BenchmarkOutcome {
            records: self.records,
            explains: self.explains,
            query_errors: self.query_errors,
            explain_failures: self.explain_failures,
            index_failures: self.index_failures,
            total_errors,
        }
    }
}

/// Everything a finished benchmark produced
#[derive(Debug, Clone)]
pub struct BenchmarkOutcome {
    /// One record per (query, concurrency level), in run order
    pub records: Vec<ReportRecord>,
    pub explains: Vec<ExplainRecord>,
    pub query_errors: u64,
    pub explain_failures: u64,
    pub index_failures: u64,
    pub total_errors: u64,
}
