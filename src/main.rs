//! querybench - Main Entry Point
//!
//! Loads a benchmark plan, runs it against the configured target and writes
//! the reports.

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::{error, info};

use querybench::common::constants::{
    DEFAULT_CONFIG_PATH, DEFAULT_EXECUTION_OUTPUT, DEFAULT_EXPLAIN_OUTPUT, SETTLE_PAUSE_MULTIPLIER,
};
use querybench::common::helper::parse_duration_arg;
use querybench::common::logging::init_logging;
use querybench::{BenchmarkConfig, BenchmarkDriver, RunSettings};

#[derive(Parser)]
#[command(name = "querybench")]
#[command(about = "Query benchmark harness - runs queries at several concurrency levels and reports latency")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(disable_help_flag = true)]
struct Cli {
    /// Benchmark configuration file
    #[arg(short = 'i', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Execution report output (CSV, or JSON when ending in .json)
    #[arg(short = 'o', long = "output", default_value = DEFAULT_EXECUTION_OUTPUT)]
    output: PathBuf,

    /// Explain report output
    #[arg(short = 'p', long = "explain", default_value = DEFAULT_EXPLAIN_OUTPUT)]
    explain: PathBuf,

    /// Per query timeout
    #[arg(short = 't', long = "timeout", default_value = "30s", value_parser = parse_duration_arg)]
    timeout: Duration,

    /// Pause before every concurrency run
    #[arg(long = "pause", default_value = "2s", value_parser = parse_duration_arg)]
    pause: Duration,

    /// Worker threads, capped at the number of CPUs
    #[arg(short = 'c', long = "max-procs", default_value_t = 1)]
    max_procs: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print help
    #[arg(short = 'h', long = "help", short_alias = '?', action = ArgAction::Help)]
    help: Option<bool>,
}

/// Requested parallelism, at least one and never above the CPU count
fn worker_threads(requested: usize, cpus: usize) -> usize {
    requested.clamp(1, cpus.max(1))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cpus = num_cpus::get();
    let procs = worker_threads(cli.max_procs, cpus);
    info!("Concurrency {} out of {} CPUs will be used", procs, cpus);

    let config = match BenchmarkConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let settings = RunSettings {
        query_timeout: cli.timeout,
        pause: cli.pause,
        settle_multiplier: SETTLE_PAUSE_MULTIPLIER,
        execution_output: cli.output,
        explain_output: cli.explain,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(procs)
        .enable_all()
        .build()?;

    let driver = BenchmarkDriver::new(config, settings);
    if let Err(e) = runtime.block_on(driver.run()) {
        error!("{}", e);
        process::exit(1);
    }

    Ok(())
}
