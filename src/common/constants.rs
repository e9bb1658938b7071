//! Constants used throughout querybench

use std::time::Duration;

/// Default configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Default execution report file
pub const DEFAULT_EXECUTION_OUTPUT: &str = "report-execution.csv";

/// Default explain report file
pub const DEFAULT_EXPLAIN_OUTPUT: &str = "explain.json";

/// Default per-query timeout
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default pause before each concurrency run
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(2);

/// After a query's concurrency sweep the driver sleeps `pause * SETTLE_PAUSE_MULTIPLIER`
pub const SETTLE_PAUSE_MULTIPLIER: u32 = 3;

/// Connect timeout used when validating the target
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Timeout for index management statements
pub const MANAGEMENT_TIMEOUT: Duration = Duration::from_secs(75);

/// Name given to the primary index
pub const PRIMARY_INDEX_NAME: &str = "primary";

/// Default query service port
pub const QUERY_SERVICE_PORT: u16 = 8093;

/// Width of the query name column in the console summary
pub const SUMMARY_NAME_WIDTH: usize = 40;

/// Slack the executor allows past the query timeout before giving up on the client
pub const TIMEOUT_GRACE: Duration = Duration::from_secs(1);
