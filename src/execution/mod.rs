//! Benchmark execution
//!
//! Single query execution, concurrent load generation and the statistics and
//! records they produce.

pub mod context;
pub mod executor;
pub mod record;
pub mod runner;
pub mod stats;

pub use context::*;
pub use executor::*;
pub use record::*;
pub use runner::*;
pub use stats::*;
