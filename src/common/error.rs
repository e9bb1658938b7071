//! Error handling for querybench

use std::time::Duration;
use thiserror::Error;

/// Main error type for benchmark operations
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Connection failure: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index operation failed: {0}")]
    IndexOperation(String),

    #[error("Query execution failed: {0}")]
    QueryExecution(String),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cannot create report output: {0}")]
    ReportCreate(String),

    #[error("Report write failed: {0}")]
    ReportWrite(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BenchError {
    /// Fatal errors abort the whole benchmark; every other kind is recovered
    /// where it happens and only shows up as a counter or a log line.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BenchError::Connection(_) | BenchError::Config(_) | BenchError::ReportCreate(_)
        )
    }
}

/// Result type alias for benchmark operations
pub type BenchResult<T> = std::result::Result<T, BenchError>;

/// Macro for creating query execution errors
#[macro_export]
macro_rules! query_err {
    ($msg:expr) => {
        $crate::common::error::BenchError::QueryExecution($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::BenchError::QueryExecution(format!($fmt, $($arg)*))
    };
}

/// Macro for creating index operation errors
#[macro_export]
macro_rules! index_err {
    ($msg:expr) => {
        $crate::common::error::BenchError::IndexOperation($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::BenchError::IndexOperation(format!($fmt, $($arg)*))
    };
}
