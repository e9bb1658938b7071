//! Report writers
//!
//! The execution report is written while the benchmark runs: as CSV rows
//! flushed one at a time, or, when the output path ends in `.json`, as a
//! single JSON document once the plan is finished. Explain plans always go to
//! a pretty-printed JSON array.

use crate::common::constants::SUMMARY_NAME_WIDTH;
use crate::common::error::{BenchError, BenchResult};
use crate::common::helper::format_duration;
use crate::execution::record::{ExplainRecord, ReportRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One execution report row in its serialized form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRow {
    pub query: String,
    pub concurrency: u32,
    pub repetitions: u32,
    /// Accumulated execution time in duration notation
    pub accumulated: String,
    /// Average latency in milliseconds, absent without successes
    pub average_ms: Option<f64>,
    pub success_count: u64,
    pub error_count: u64,
}

impl From<&ReportRecord> for ExecutionRow {
    fn from(record: &ReportRecord) -> Self {
        Self {
            query: record.query_name.clone(),
            concurrency: record.concurrency,
            repetitions: record.repetitions,
            accumulated: format_duration(record.stats.accumulated),
            average_ms: record.stats.average_ms(),
            success_count: record.stats.success_count,
            error_count: record.stats.error_count,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionDocument<'a> {
    generated_at: DateTime<Utc>,
    records: &'a [ExecutionRow],
}

enum ExecutionSink {
    Csv(csv::Writer<File>),
    Json { file: File, rows: Vec<ExecutionRow> },
}

/// Writes the execution and explain reports of one benchmark
pub struct Reporter {
    execution: ExecutionSink,
    execution_path: PathBuf,
    explain: File,
    explain_path: PathBuf,
    explains_written: usize,
}

impl Reporter {
    /// Create both output files, truncating existing ones
    pub fn create(execution_path: &Path, explain_path: &Path) -> BenchResult<Self> {
        let execution_file = create_output(execution_path)?;
        let explain = create_output(explain_path)?;

        let execution = if is_json_path(execution_path) {
            ExecutionSink::Json {
                file: execution_file,
                rows: Vec::new(),
            }
        } else {
            ExecutionSink::Csv(
                csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(execution_file),
            )
        };

        Ok(Self {
            execution,
            execution_path: execution_path.to_path_buf(),
            explain,
            explain_path: explain_path.to_path_buf(),
            explains_written: 0,
        })
    }

    pub fn execution_path(&self) -> &Path {
        &self.execution_path
    }

    pub fn explain_path(&self) -> &Path {
        &self.explain_path
    }

    /// Add one record to the execution report
    pub fn append(&mut self, record: &ReportRecord) -> BenchResult<()> {
        match &mut self.execution {
            ExecutionSink::Csv(writer) => {
                writer
                    .write_record(execution_row(record))
                    .map_err(|e| BenchError::ReportWrite(e.to_string()))?;
                writer
                    .flush()
                    .map_err(|e| BenchError::ReportWrite(e.to_string()))
            }
            ExecutionSink::Json { rows, .. } => {
                rows.push(ExecutionRow::from(record));
                Ok(())
            }
        }
    }

    /// Append one captured plan to the explain report.
    ///
    /// Entries are flushed as they arrive; the JSON array is closed by
    /// [`Reporter::finish`].
    pub fn append_explain(&mut self, explain: &ExplainRecord) -> BenchResult<()> {
        let body = serde_json::to_string_pretty(explain).map_err(|e| self.explain_error(e))?;
        let separator = if self.explains_written == 0 { "[\n" } else { ",\n" };
        let indented: Vec<String> = body.lines().map(|line| format!("  {}", line)).collect();

        self.explain
            .write_all(format!("{}{}", separator, indented.join("\n")).as_bytes())
            .and_then(|_| self.explain.flush())
            .map_err(|e| self.explain_error(e))?;
        self.explains_written += 1;
        Ok(())
    }

    /// Close the explain array and flush the execution report; JSON
    /// execution reports are written out here
    pub fn finish(mut self) -> BenchResult<()> {
        let closing = if self.explains_written == 0 { "[]\n" } else { "\n]\n" };
        let explain_result = self
            .explain
            .write_all(closing.as_bytes())
            .and_then(|_| self.explain.flush())
            .map_err(|e| self.explain_error(e));

        let path = self.execution_path.display().to_string();
        let execution_result = match self.execution {
            ExecutionSink::Csv(mut writer) => writer
                .flush()
                .map_err(|e| BenchError::ReportWrite(format!("{}: {}", path, e))),
            ExecutionSink::Json { file, rows } => {
                let document = ExecutionDocument {
                    generated_at: Utc::now(),
                    records: &rows,
                };
                let mut out = BufWriter::new(file);
                serde_json::to_writer_pretty(&mut out, &document)
                    .map_err(|e| BenchError::ReportWrite(format!("{}: {}", path, e)))
                    .and_then(|_| {
                        writeln!(out)
                            .and_then(|_| out.flush())
                            .map_err(|e| BenchError::ReportWrite(format!("{}: {}", path, e)))
                    })
            }
        };

        explain_result.and(execution_result)
    }

    fn explain_error(&self, err: impl std::fmt::Display) -> BenchError {
        BenchError::ReportWrite(format!("{}: {}", self.explain_path.display(), err))
    }
}

fn create_output(path: &Path) -> BenchResult<File> {
    File::create(path).map_err(|e| BenchError::ReportCreate(format!("{}: {}", path.display(), e)))
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// CSV fields of one record:
/// name, concurrency, repetitions, accumulated, average ms, successes, errors
pub fn execution_row(record: &ReportRecord) -> [String; 7] {
    let average = match record.stats.average_ms() {
        Some(avg) => format!("{:.2}", avg),
        None => "NaN".to_string(),
    };
    [
        record.query_name.clone(),
        record.concurrency.to_string(),
        record.repetitions.to_string(),
        format_duration(record.stats.accumulated),
        average,
        record.stats.success_count.to_string(),
        record.stats.error_count.to_string(),
    ]
}

/// Fixed-width console table of the finished records
pub fn render_summary(records: &[ReportRecord]) -> String {
    let mut out = format!(
        "\n|{:<width$}|{:<4}|{:<5}|{:<5}|{:<15}|\n",
        "Query",
        "Conc",
        "Suc",
        "Err",
        "Avg",
        width = SUMMARY_NAME_WIDTH
    );
    for record in records {
        out.push_str(&format!(
            "|{:<width$}|{:>4}|{:>5}|{:>5}|{:>15.6}|\n",
            record.query_name,
            record.concurrency,
            record.stats.success_count,
            record.stats.error_count,
            record.stats.average_ms_or_nan(),
            width = SUMMARY_NAME_WIDTH
        ));
    }
    out
}

pub fn print_summary(records: &[ReportRecord]) {
    print!("{}", render_summary(records));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::stats::RunStatsSnapshot;
    use std::time::Duration;

    fn record(name: &str, concurrency: u32, millis: u64, success: u64, errors: u64) -> ReportRecord {
        ReportRecord::new(
            name,
            concurrency,
            3,
            RunStatsSnapshot {
                accumulated: Duration::from_millis(millis),
                success_count: success,
                error_count: errors,
            },
        )
    }

    #[test]
    fn test_execution_row() {
        let row = execution_row(&record("count", 10, 300, 30, 0));
        assert_eq!(row, ["count", "10", "3", "300ms", "10.00", "30", "0"].map(String::from));
    }

    #[test]
    fn test_execution_row_without_successes() {
        let row = execution_row(&record("broken", 2, 0, 0, 6));
        assert_eq!(row[3], "0s");
        assert_eq!(row[4], "NaN");
        assert_eq!(row[6], "6");
    }

    #[test]
    fn test_render_summary() {
        let summary = render_summary(&[record("count", 1, 30, 3, 0), record("broken", 5, 0, 0, 15)]);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "");
        assert_eq!(
            lines[1],
            format!("|{:<40}|Conc|Suc  |Err  |Avg            |", "Query")
        );
        assert_eq!(
            lines[2],
            format!("|{:<40}|   1|    3|    0|      10.000000|", "count")
        );
        assert_eq!(
            lines[3],
            format!("|{:<40}|   5|    0|   15|            NaN|", "broken")
        );
    }

    #[test]
    fn test_csv_rows_are_flushed_per_append() {
        let dir = tempfile::tempdir().unwrap();
        let exec = dir.path().join("report-execution.csv");
        let explain = dir.path().join("explain.json");

        let mut reporter = Reporter::create(&exec, &explain).unwrap();
        reporter.append(&record("count", 1, 30, 3, 0)).unwrap();
        assert_eq!(
            std::fs::read_to_string(&exec).unwrap(),
            "count,1,3,30ms,10.00,3,0\n"
        );
        reporter.append(&record("count", 10, 300, 30, 0)).unwrap();
        reporter.finish().unwrap();
        assert_eq!(
            std::fs::read_to_string(&exec).unwrap(),
            "count,1,3,30ms,10.00,3,0\ncount,10,3,300ms,10.00,30,0\n"
        );
    }

    #[test]
    fn test_json_execution_report() {
        let dir = tempfile::tempdir().unwrap();
        let exec = dir.path().join("report.JSON");
        let explain = dir.path().join("explain.json");

        let mut reporter = Reporter::create(&exec, &explain).unwrap();
        reporter.append(&record("count", 1, 30, 3, 0)).unwrap();
        reporter.append(&record("broken", 1, 0, 0, 3)).unwrap();
        reporter.finish().unwrap();

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&exec).unwrap()).unwrap();
        assert!(doc["generatedAt"].is_string());
        let records = doc["records"].as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["accumulated"], "30ms");
        assert_eq!(records[0]["averageMs"], 10.0);
        assert!(records[1]["averageMs"].is_null());
    }

    #[test]
    fn test_explain_report() {
        let dir = tempfile::tempdir().unwrap();
        let exec = dir.path().join("report.csv");
        let explain = dir.path().join("explain.json");

        let mut reporter = Reporter::create(&exec, &explain).unwrap();
        let plans = vec![
            ExplainRecord {
                query: "SELECT 1".to_string(),
                plan: serde_json::json!({"#operator": "Sequence", "text": "line one\nline two"}),
            },
            ExplainRecord {
                query: "SELECT 2".to_string(),
                plan: serde_json::Value::Null,
            },
        ];
        for plan in &plans {
            reporter.append_explain(plan).unwrap();
        }
        reporter.finish().unwrap();

        let parsed: Vec<ExplainRecord> =
            serde_json::from_str(&std::fs::read_to_string(&explain).unwrap()).unwrap();
        assert_eq!(parsed, plans);
    }

    #[test]
    fn test_explain_entries_are_on_disk_before_finish() {
        let dir = tempfile::tempdir().unwrap();
        let exec = dir.path().join("report.csv");
        let explain = dir.path().join("explain.json");

        let mut reporter = Reporter::create(&exec, &explain).unwrap();
        reporter
            .append_explain(&ExplainRecord {
                query: "SELECT first".to_string(),
                plan: serde_json::json!({"#operator": "Sequence"}),
            })
            .unwrap();

        let partial = std::fs::read_to_string(&explain).unwrap();
        assert!(partial.starts_with("[\n"));
        assert!(partial.contains("SELECT first"));
        drop(reporter);
    }

    #[test]
    fn test_empty_explain_report_is_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let exec = dir.path().join("report.csv");
        let explain = dir.path().join("explain.json");

        Reporter::create(&exec, &explain).unwrap().finish().unwrap();

        let parsed: Vec<ExplainRecord> =
            serde_json::from_str(&std::fs::read_to_string(&explain).unwrap()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_create_fails_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let exec = dir.path().join("missing").join("report.csv");
        let explain = dir.path().join("explain.json");
        let err = Reporter::create(&exec, &explain).err().unwrap();
        assert!(matches!(err, BenchError::ReportCreate(_)));
        assert!(err.is_fatal());
    }
}
