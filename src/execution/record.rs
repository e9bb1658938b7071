//! Records produced by a benchmark run

use crate::execution::stats::RunStatsSnapshot;
use serde::{Deserialize, Serialize};

/// Result of one (query, concurrency level) run
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRecord {
    pub query_name: String,
    pub concurrency: u32,
    pub repetitions: u32,
    pub stats: RunStatsSnapshot,
}

impl ReportRecord {
    pub fn new(query_name: &str, concurrency: u32, repetitions: u32, stats: RunStatsSnapshot) -> Self {
        Self {
            query_name: query_name.to_string(),
            concurrency,
            repetitions,
            stats,
        }
    }
}

/// Plan captured for a query before it is load tested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainRecord {
    pub query: String,
    pub plan: serde_json::Value,
}
