//! Benchmark plan driver
//!
//! Walks the configured plan strictly in sequence: indexes first, then every
//! query across every concurrency level, then teardown and reporting. Only
//! connection and report creation failures abort the run; everything else is
//! logged, counted and skipped.

use crate::client::{self, QueryClient};
use crate::common::error::{BenchError, BenchResult};
use crate::common::helper::format_duration;
use crate::config::{BenchmarkConfig, IndexSpec, RunSettings};
use crate::execution::{BenchmarkOutcome, LoadGenerator, QueryExecutor, ReportRecord, RunContext};
use crate::report::{self, Reporter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Runs one benchmark plan against one target
pub struct BenchmarkDriver {
    config: BenchmarkConfig,
    settings: RunSettings,
}

impl BenchmarkDriver {
    pub fn new(config: BenchmarkConfig, settings: RunSettings) -> Self {
        Self { config, settings }
    }

    /// Connect to the configured target and run the plan
    pub async fn run(&self) -> BenchResult<BenchmarkOutcome> {
        let target = self.config.target();
        info!(
            "Connecting to {} target (bucket '{}') and query timeout is {}",
            target.backend,
            target.bucket,
            format_duration(self.settings.query_timeout)
        );
        let client = client::connect(&target).await?;
        self.run_with_client(client).await
    }

    /// Run the plan against an already connected client
    pub async fn run_with_client(&self, client: Arc<dyn QueryClient>) -> BenchResult<BenchmarkOutcome> {
        let mut ctx = RunContext::new(self.config.queries.len(), self.config.concurrency.len());
        info!(
            "Benchmarking {} queries at {} concurrency levels through the {} client",
            self.config.queries.len(),
            self.config.concurrency.len(),
            client.name()
        );

        if self.config.create_primary {
            ctx.phase("Creating primary index");
            if let Err(e) = client.create_primary_index().await {
                warn!("Cannot create primary index: {}", e);
                ctx.index_failures += 1;
            }
        }

        ctx.phase("Creating common indexes");
        for index in &self.config.indexes {
            create_index(client.as_ref(), &mut ctx, index).await;
        }

        ctx.phase("Creating output file");
        let mut reporter = Reporter::create(&self.settings.execution_output, &self.settings.explain_output)?;

        ctx.phase("Benchmarking queries");
        let executor = Arc::new(QueryExecutor::new(Arc::clone(&client), self.settings.query_timeout));
        let generator = LoadGenerator::new(Arc::clone(&executor));

        for query in &self.config.queries {
            for index in &query.indexes {
                create_index(client.as_ref(), &mut ctx, index).await;
            }

            info!("Explaining {}", query.query);
            match executor.explain(&query.query).await {
                Ok(explain) => {
                    if let Err(e) = reporter.append_explain(&explain) {
                        warn!("{}", e);
                    }
                    ctx.push_explain(explain);
                }
                Err(e) => {
                    warn!("Cannot explain query {}: {}", query.name, e);
                    ctx.explain_failures += 1;
                }
            }

            let statement: Arc<str> = Arc::from(query.query.as_str());
            for &concurrency in &self.config.concurrency {
                pause(self.settings.pause).await;

                let run = generator
                    .run(Arc::clone(&statement), concurrency, self.config.repetitions)
                    .await;
                let record = ReportRecord::new(&query.name, concurrency, self.config.repetitions, run.stats);
                info!(
                    "Query {}[{}]: accumulated {}, per query {:.2} ms, success {}, error {}, took {}",
                    record.query_name,
                    record.concurrency,
                    format_duration(record.stats.accumulated),
                    record.stats.average_ms_or_nan(),
                    record.stats.success_count,
                    record.stats.error_count,
                    format_duration(run.wall_time)
                );

                if let Err(e) = reporter.append(&record) {
                    warn!("{}", e);
                }
                ctx.push_record(record);
            }

            pause(self.settings.settle_pause()).await;
            for index in query.indexes.iter().filter(|i| i.drop_on_finish) {
                drop_index(client.as_ref(), &mut ctx, index).await;
            }
        }

        ctx.phase("Removing common indexes");
        for index in self.config.indexes.iter().filter(|i| i.drop_on_finish) {
            drop_index(client.as_ref(), &mut ctx, index).await;
        }

        ctx.phase("Writing reports");
        let execution_path = reporter.execution_path().display().to_string();
        let explain_path = reporter.explain_path().display().to_string();
        if let Err(e) = reporter.finish() {
            warn!("{}", e);
        }

        info!("Total errors found: {}", ctx.total_errors());
        info!("Report {} is available", execution_path);
        info!("Explain report {} is available", explain_path);
        report::print_summary(ctx.records());

        Ok(ctx.into_outcome())
    }
}

async fn create_index(client: &dyn QueryClient, ctx: &mut RunContext, index: &IndexSpec) {
    info!("Creating index {}", index.name);
    if let Err(e) = client.create_index(&index.name, &index.definition).await {
        warn!("{}", index_failure(&index.name, e));
        ctx.index_failures += 1;
    }
}

async fn drop_index(client: &dyn QueryClient, ctx: &mut RunContext, index: &IndexSpec) {
    info!("Removing index {}", index.name);
    if let Err(e) = client.drop_index(&index.name).await {
        warn!("{}", index_failure(&index.name, e));
        ctx.index_failures += 1;
    }
}

fn index_failure(name: &str, err: BenchError) -> BenchError {
    match err {
        BenchError::IndexOperation(msg) => BenchError::IndexOperation(format!("{}: {}", name, msg)),
        other => BenchError::IndexOperation(format!("{}: {}", name, other)),
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
