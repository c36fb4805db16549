//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Fixed delay before retrying after a terraform or credential failure (seconds)
    pub retry_delay_secs: u64,
    /// Maximum concurrent reconciliations
    /// Limits how many resources can be reconciled simultaneously
    pub max_concurrent_reconciliations: usize,
    /// Parent directory of the per-resource staging directories
    pub staging_root: PathBuf,
    /// Terraform binary (absolute path or name resolved on `PATH`)
    pub terraform_binary: PathBuf,
    /// Timeout applied to every terraform invocation (seconds)
    pub terraform_timeout_secs: u64,
    /// Fibonacci error backoff minimum (minutes)
    pub backoff_min_minutes: u64,
    /// Fibonacci error backoff maximum (minutes)
    pub backoff_max_minutes: u64,
    /// Watch stream restart delay after errors or stream end (seconds)
    pub watch_restart_delay_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            staging_root: std::env::temp_dir(),
            terraform_binary: PathBuf::from(DEFAULT_TERRAFORM_BINARY),
            terraform_timeout_secs: DEFAULT_TERRAFORM_TIMEOUT_SECS,
            backoff_min_minutes: DEFAULT_BACKOFF_MIN_MINUTES,
            backoff_max_minutes: DEFAULT_BACKOFF_MAX_MINUTES,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            retry_delay_secs: env_var_or_default("RETRY_DELAY_SECS", DEFAULT_RETRY_DELAY_SECS),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            staging_root: std::env::var_os("STAGING_ROOT")
                .map_or_else(std::env::temp_dir, PathBuf::from),
            terraform_binary: resolve_terraform_binary(&env_var_or_default_str(
                "TERRAFORM_BINARY",
                DEFAULT_TERRAFORM_BINARY,
            )),
            terraform_timeout_secs: env_var_or_default(
                "TERRAFORM_TIMEOUT_SECS",
                DEFAULT_TERRAFORM_TIMEOUT_SECS,
            ),
            backoff_min_minutes: env_var_or_default(
                "BACKOFF_MIN_MINUTES",
                DEFAULT_BACKOFF_MIN_MINUTES,
            ),
            backoff_max_minutes: env_var_or_default(
                "BACKOFF_MAX_MINUTES",
                DEFAULT_BACKOFF_MAX_MINUTES,
            ),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
        }
    }

    /// Get the fixed retry delay
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Get the terraform invocation timeout
    pub fn terraform_timeout(&self) -> Duration {
        Duration::from_secs(self.terraform_timeout_secs)
    }

    /// Get watch restart delay duration
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

/// Resolve a bare binary name against `PATH`, keeping the name as-is if lookup fails
///
/// A missing binary is reported by the first terraform invocation rather than at startup.
fn resolve_terraform_binary(binary: &str) -> PathBuf {
    which::which(binary).unwrap_or_else(|_| PathBuf::from(binary))
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
pub(crate) fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
