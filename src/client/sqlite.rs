//! SQLite target
//!
//! Runs the benchmark against a local database file. Every statement runs on
//! a blocking thread with its own connection taken from a small idle list;
//! the execution time is measured around preparing and stepping the whole
//! result set.

use crate::client::QueryClient;
use crate::common::error::{BenchError, BenchResult};
use crate::config::TargetConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::common::constants::MANAGEMENT_TIMEOUT;

/// Client for one SQLite database file
pub struct SqliteClient {
    path: PathBuf,
    /// Table that index definitions apply to
    table: String,
    idle: Arc<Mutex<Vec<Connection>>>,
}

impl SqliteClient {
    /// Open the database file; it must already exist
    pub async fn connect(target: &TargetConfig) -> BenchResult<Self> {
        let path = target
            .database
            .clone()
            .ok_or_else(|| BenchError::Connection("no sqlite database path configured".to_string()))?;

        info!("Opening sqlite database {} (table '{}')", path.display(), target.bucket);

        let conn = open_connection(&path)
            .map_err(|e| BenchError::Connection(format!("cannot open {}: {}", path.display(), e)))?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| BenchError::Connection(format!("database {} is unusable: {}", path.display(), e)))?;

        Ok(Self {
            path,
            table: target.bucket.clone(),
            idle: Arc::new(Mutex::new(vec![conn])),
        })
    }

    fn checkout(&self) -> rusqlite::Result<Connection> {
        if let Some(conn) = self.idle.lock().pop() {
            return Ok(conn);
        }
        open_connection(&self.path)
    }

    /// Run `work` on a pooled connection in a blocking thread.
    ///
    /// The outer result carries timeouts and thread failures; the inner one
    /// carries SQLite errors so callers can classify them.
    async fn run_blocking<T, F>(&self, timeout: Duration, work: F) -> BenchResult<rusqlite::Result<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = match self.checkout() {
            Ok(conn) => conn,
            Err(e) => return Ok(Err(e)),
        };
        if let Err(e) = conn.busy_timeout(timeout) {
            return Ok(Err(e));
        }

        let interrupt = conn.get_interrupt_handle();
        let idle = Arc::clone(&self.idle);
        let task = tokio::task::spawn_blocking(move || {
            let result = work(&conn);
            idle.lock().push(conn);
            result
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(join_err)) => Err(BenchError::QueryExecution(format!(
                "sqlite worker thread failed: {}",
                join_err
            ))),
            Err(_) => {
                interrupt.interrupt();
                Err(BenchError::Timeout(timeout))
            }
        }
    }

    async fn run_ddl(&self, sql: String) -> BenchResult<()> {
        debug!("{}", sql);
        self.run_blocking(MANAGEMENT_TIMEOUT, move |conn| conn.execute_batch(&sql))
            .await
            .map_err(|e| BenchError::IndexOperation(e.to_string()))?
            .map_err(|e| BenchError::IndexOperation(e.to_string()))
    }
}

#[async_trait]
impl QueryClient for SqliteClient {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn execute(&self, statement: &str, timeout: Duration) -> BenchResult<Duration> {
        let sql = statement.to_string();
        self.run_blocking(timeout, move |conn| {
            let started = Instant::now();
            step_all(conn, &sql)?;
            Ok(started.elapsed())
        })
        .await?
        .map_err(|e| BenchError::QueryExecution(e.to_string()))
    }

    async fn explain(&self, statement: &str, timeout: Duration) -> BenchResult<serde_json::Value> {
        let sql = format!("EXPLAIN QUERY PLAN {}", statement);
        self.run_blocking(timeout, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let steps = stmt
                .query_map([], |row| {
                    Ok(json!({
                        "id": row.get::<_, i64>(0)?,
                        "parent": row.get::<_, i64>(1)?,
                        "detail": row.get::<_, String>(3)?,
                    }))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(serde_json::Value::Array(steps))
        })
        .await?
        .map_err(|e| BenchError::QueryExecution(e.to_string()))
    }

    async fn create_index(&self, name: &str, definition: &[String]) -> BenchResult<()> {
        if self.table.trim().is_empty() {
            return Err(crate::index_err!("cannot create index {}: no table configured", name));
        }
        self.run_ddl(create_index_statement(&self.table, name, definition)).await
    }

    async fn drop_index(&self, name: &str) -> BenchResult<()> {
        self.run_ddl(format!("DROP INDEX IF EXISTS {}", quote_ident(name))).await
    }

    async fn create_primary_index(&self) -> BenchResult<()> {
        debug!("sqlite tables are keyed by rowid, no primary index to create");
        Ok(())
    }
}

fn open_connection(path: &Path) -> rusqlite::Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
    )
}

/// Step through every row of a statement
fn step_all(conn: &Connection, sql: &str) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query([])?;
    let mut count = 0;
    while rows.next()?.is_some() {
        count += 1;
    }
    Ok(count)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_index_statement(table: &str, name: &str, definition: &[String]) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
        quote_ident(name),
        quote_ident(table),
        definition.join(", ")
    )
}
