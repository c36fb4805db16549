//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and watch stream errors.

use crate::controller::reconciler::types::resource_key;
use crate::controller::reconciler::{BackoffState, Reconciler, ReconcilerError};
use crate::crd::PostgreSql;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Instrument};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource so one failing resource never delays
/// another. A successful pass resets it.
pub fn handle_reconciliation_error(
    obj: Arc<PostgreSql>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {:?}", name, error);
    observability::metrics::increment_reconciliation_errors();

    let (backoff_seconds, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states
                .entry(resource_key(namespace, name))
                .or_insert_with(|| {
                    BackoffState::new(ctx.config.backoff_min_minutes, ctx.config.backoff_max_minutes)
                });
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using default backoff", e);
            (ctx.config.backoff_min_minutes * 60, 0)
        }
    };

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or(i64::MAX));

    info!(
        "Retrying with Fibonacci backoff: {}s (error count: {}, trigger source: error-backoff)",
        backoff_seconds, error_count
    );
    info!(
        "Next retry scheduled: {} (in {}s, trigger source: error-backoff)",
        next_trigger_time.to_rfc3339(),
        backoff_seconds
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Classification of an error surfaced by the controller stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    Expired,
    Throttled,
    NotFound,
    Other,
}

impl WatchErrorKind {
    pub fn classify(error: &str) -> Self {
        // 404 is checked first: a plain-text 404 body surfaces as a serde error
        // mentioning WatchFailed, which would otherwise read like an auth failure
        let is_not_found = error.contains("ObjectNotFound")
            || error.contains("404")
            || error.contains("not found");
        if is_not_found {
            WatchErrorKind::NotFound
        } else if error.contains("401") || error.contains("Unauthorized") {
            WatchErrorKind::Unauthorized
        } else if error.contains("410")
            || error.contains("too old resource version")
            || error.contains("Expired")
            || error.contains("Gone")
        {
            WatchErrorKind::Expired
        } else if error.contains("429")
            || error.contains("storage is (re)initializing")
            || error.contains("TooManyRequests")
        {
            WatchErrorKind::Throttled
        } else {
            WatchErrorKind::Other
        }
    }
}

/// Handle watch stream errors with appropriate classification and backoff
///
/// Returns `None` to filter out the error (allow restart) or `Some(())` to continue.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay_secs: u64,
) -> Option<()> {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );

    async move {
        match WatchErrorKind::classify(error_string) {
            WatchErrorKind::Unauthorized => {
                error!(
                    "Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired"
                );
                error!(
                    "Verify the controller ServiceAccount can still list postgresqls.sql.octopilot.io in all namespaces"
                );
                warn!(
                    "Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                    watch_restart_delay_secs
                );
                tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
                None
            }
            WatchErrorKind::Expired => {
                warn!("Watch resource version expired (410), watch will restart");
                None
            }
            WatchErrorKind::Throttled => {
                let current_backoff = backoff.load(Ordering::Relaxed);
                warn!(
                    "API server throttling or reinitializing storage (429), backing off for {}ms before restart...",
                    current_backoff
                );
                tokio::time::sleep(Duration::from_millis(current_backoff)).await;
                backoff.store(
                    std::cmp::min(current_backoff.saturating_mul(2), max_backoff_ms),
                    Ordering::Relaxed,
                );
                None
            }
            WatchErrorKind::NotFound => {
                warn!(
                    "Resource not found (404) - normal for deleted resources, or the PostgreSql CRD is missing. Error: {}",
                    error_string
                );
                Some(())
            }
            WatchErrorKind::Other => {
                error!("Controller stream error: {}", error_string);
                tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
                None
            }
        }
    }
    .instrument(error_span)
    .await
}
