//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Fixed delay before retrying a pass that failed on an external dependency (seconds)
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Maximum number of resources reconciled in parallel
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: usize = 10;

/// Per-invocation timeout for terraform commands (seconds)
pub const DEFAULT_TERRAFORM_TIMEOUT_SECS: u64 = 1800;

/// Terraform binary looked up on `PATH` when `TERRAFORM_BINARY` is unset
pub const DEFAULT_TERRAFORM_BINARY: &str = "terraform";

/// Fibonacci error backoff bounds (minutes)
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;

/// Default delay before restarting watch stream after it ends or fails (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Watch stream backoff after throttling (milliseconds)
pub const WATCH_BACKOFF_START_MS: u64 = 2000;
pub const WATCH_BACKOFF_MAX_MS: u64 = 60000;

/// Finalizer guarding teardown of the provisioned instance
pub const FINALIZER: &str = "sql.octopilot.io/postgresql-finalizer";

/// Field manager used for status patches
pub const FIELD_MANAGER: &str = "sql-instance-controller";

/// Environment variable terraform's Google provider reads the service-account key from
pub const CREDENTIALS_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Staging subdirectory holding the remote-state bucket configuration
pub const BUCKET_DIR: &str = "bucket";

/// Staging subdirectory holding the instance configuration
pub const INSTANCE_DIR: &str = "instance";

/// Generated file names
pub const PROVIDER_FILE: &str = "provider.tf.json";
pub const BACKEND_FILE: &str = "backend.tf.json";
pub const BUCKET_FILE: &str = "bucket.tf.json";
pub const MAIN_FILE: &str = "main.tf.json";
pub const OUTPUT_FILE: &str = "output.tf";

/// Connection address reported before the first successful apply
pub const PENDING_ADDRESS: &str = "<pending>";

/// Maximum length of a Cloud SQL instance name
pub const MAX_INSTANCE_NAME_LEN: usize = 63;

/// Minimum password length accepted for database users
pub const MIN_PASSWORD_LEN: usize = 7;

/// Database versions accepted by the instance spec
pub const SUPPORTED_DATABASE_VERSIONS: &[&str] =
    &["POSTGRES_9_6", "POSTGRES_10", "POSTGRES_11", "POSTGRES_12"];
