//! Couchbase query service client
//!
//! Talks to the N1QL REST endpoint (`/query/service`) of a query node. The
//! reported execution time is the server-side `metrics.executionTime`, so
//! network latency between the harness and the cluster does not leak into the
//! statistics.

use crate::client::QueryClient;
use crate::common::constants::{CONNECT_TIMEOUT, MANAGEMENT_TIMEOUT, PRIMARY_INDEX_NAME, QUERY_SERVICE_PORT};
use crate::common::error::{BenchError, BenchResult};
use crate::common::helper::{format_duration, parse_duration};
use crate::config::TargetConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Response envelope of the query service
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<serde_json::Value>,
    #[serde(default)]
    errors: Vec<ServiceError>,
    #[serde(default)]
    metrics: Option<ServiceMetrics>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceMetrics {
    execution_time: Option<String>,
    elapsed_time: Option<String>,
}

impl QueryResponse {
    fn failure_message(&self) -> String {
        match self.errors.first() {
            Some(err) => format!("[{}] {}", err.code, err.msg),
            None => format!("query service returned status '{}'", self.status),
        }
    }
}

/// HTTP client bound to one bucket of one cluster
pub struct CouchbaseClient {
    http: Client,
    service_url: Url,
    ping_url: Url,
    bucket: String,
    user: String,
    password: String,
}

impl CouchbaseClient {
    /// Build the client against the first seed whose query service answers
    pub async fn connect(target: &TargetConfig) -> BenchResult<Self> {
        let seeds = query_service_bases(&target.host)?;
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| BenchError::Connection(format!("failed to create HTTP client: {}", e)))?;

        let mut last_error = None;
        for base in seeds {
            info!("Connecting to bucket {} in cluster {}", target.bucket, base);
            let client = Self {
                http: http.clone(),
                service_url: endpoint(&base, "/query/service")?,
                ping_url: endpoint(&base, "/admin/ping")?,
                bucket: target.bucket.clone(),
                user: target.user.clone(),
                password: target.password.clone(),
            };
            match client.ping().await {
                Ok(()) => return Ok(client),
                Err(e) => {
                    warn!("Seed {} is not answering: {}", base, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| BenchError::Connection("no cluster host configured".to_string())))
    }

    async fn ping(&self) -> BenchResult<()> {
        let response = self
            .http
            .get(self.ping_url.clone())
            .basic_auth(&self.user, Some(&self.password))
            .timeout(CONNECT_TIMEOUT)
            .send()
            .await
            .map_err(|e| BenchError::Connection(format!("cannot reach query service: {}", e)))?;

        if !response.status().is_success() {
            return Err(BenchError::Connection(format!(
                "query service ping failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn run_statement(&self, statement: &str, timeout: Duration) -> BenchResult<QueryResponse> {
        let timeout_text = format_duration(timeout);
        let response = self
            .http
            .post(self.service_url.clone())
            .basic_auth(&self.user, Some(&self.password))
            .form(&[("statement", statement), ("timeout", timeout_text.as_str())])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BenchError::Timeout(timeout)
                } else {
                    BenchError::QueryExecution(e.to_string())
                }
            })?;

        // Failed statements still come back as a JSON envelope, whatever the HTTP status.
        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| crate::query_err!("unreadable query service response: {}", e))?;

        match body.status.as_str() {
            "success" => Ok(body),
            "timeout" => Err(BenchError::Timeout(timeout)),
            _ => Err(BenchError::QueryExecution(body.failure_message())),
        }
    }

    async fn run_management(&self, statement: &str) -> BenchResult<()> {
        debug!("{}", statement);
        self.run_statement(statement, MANAGEMENT_TIMEOUT)
            .await
            .map(|_| ())
            .map_err(|e| BenchError::IndexOperation(e.to_string()))
    }
}

#[async_trait]
impl QueryClient for CouchbaseClient {
    fn name(&self) -> &str {
        "couchbase"
    }

    async fn execute(&self, statement: &str, timeout: Duration) -> BenchResult<Duration> {
        let started = Instant::now();
        let response = self.run_statement(statement, timeout).await?;
        let measured = started.elapsed();

        let reported = response
            .metrics
            .as_ref()
            .and_then(|m| m.execution_time.as_deref().or(m.elapsed_time.as_deref()));
        match reported {
            Some(text) => parse_duration(text)
                .map_err(|e| crate::query_err!("bad executionTime metric: {}", e)),
            None => Ok(measured),
        }
    }

    async fn explain(&self, statement: &str, timeout: Duration) -> BenchResult<serde_json::Value> {
        let response = self.run_statement(&format!("EXPLAIN {}", statement), timeout).await?;
        Ok(response.results.into_iter().next().unwrap_or(serde_json::Value::Null))
    }

    async fn create_index(&self, name: &str, definition: &[String]) -> BenchResult<()> {
        match self
            .run_management(&create_index_statement(&self.bucket, name, definition))
            .await
        {
            Err(e) if e.to_string().to_lowercase().contains("already exist") => {
                debug!("Index {} already exists", name);
                Ok(())
            }
            other => other,
        }
    }

    async fn drop_index(&self, name: &str) -> BenchResult<()> {
        match self.run_management(&drop_index_statement(&self.bucket, name)).await {
            Err(e) if is_missing_index(&e) => {
                debug!("Index {} was already gone", name);
                Ok(())
            }
            other => other,
        }
    }

    async fn create_primary_index(&self) -> BenchResult<()> {
        self.run_management(&primary_index_statement(&self.bucket)).await
    }
}

fn is_missing_index(err: &BenchError) -> bool {
    let text = err.to_string().to_lowercase();
    text.contains("not found") || text.contains("does not exist")
}

fn endpoint(base: &Url, path: &str) -> BenchResult<Url> {
    base.join(path)
        .map_err(|e| BenchError::Connection(format!("invalid query service url: {}", e)))
}

/// Resolve the query service base urls from a configured host.
///
/// Accepts bare hosts (`10.0.0.5`), `host:port`, `couchbase://host` and full
/// `http(s)://` urls, or a comma separated seed list of any of those sharing
/// one scheme (`couchbase://node1,node2`). The query service port is filled
/// in when absent.
fn query_service_bases(host: &str) -> BenchResult<Vec<Url>> {
    let host = host.trim();
    let (scheme, list) = if let Some(rest) = host.strip_prefix("couchbase://") {
        ("http", rest)
    } else if let Some(rest) = host.strip_prefix("https://") {
        ("https", rest)
    } else if let Some(rest) = host.strip_prefix("http://") {
        ("http", rest)
    } else {
        ("http", host)
    };

    let seeds: Vec<&str> = list
        .split(',')
        .map(|seed| seed.trim().trim_end_matches('/'))
        .filter(|seed| !seed.is_empty())
        .collect();
    if seeds.is_empty() {
        return Err(BenchError::Connection("no cluster host configured".to_string()));
    }

    seeds
        .into_iter()
        .map(|seed| {
            let mut url = Url::parse(&format!("{}://{}", scheme, seed))
                .map_err(|e| BenchError::Connection(format!("invalid cluster host '{}': {}", seed, e)))?;
            if url.port().is_none() {
                url.set_port(Some(QUERY_SERVICE_PORT))
                    .map_err(|_| BenchError::Connection(format!("invalid cluster host '{}'", seed)))?;
            }
            Ok(url)
        })
        .collect()
}

fn create_index_statement(bucket: &str, name: &str, definition: &[String]) -> String {
    format!(
        "CREATE INDEX `{}` ON `{}`({}) USING GSI",
        name,
        bucket,
        definition.join(", ")
    )
}

fn drop_index_statement(bucket: &str, name: &str) -> String {
    format!("DROP INDEX `{}`.`{}` USING GSI", bucket, name)
}

fn primary_index_statement(bucket: &str) -> String {
    format!(
        "CREATE PRIMARY INDEX `{}` ON `{}` USING GSI",
        PRIMARY_INDEX_NAME, bucket
    )
}
