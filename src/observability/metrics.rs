//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `sql_instance_reconciliations_total` - Total number of reconciliations
//! - `sql_instance_reconciliation_errors_total` - Total number of reconciliation errors
//! - `sql_instance_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `sql_instance_terraform_operations_total` - Terraform invocations by operation and result
//! - `sql_instance_terraform_operation_duration_seconds` - Duration of terraform invocations
//! - `sql_instance_requeues_total` - Requeues by reason
//! - `sql_instance_phase_transitions_total` - Phase changes written to status

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sql_instance_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sql_instance_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "sql_instance_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![1.0, 5.0, 30.0, 60.0, 300.0, 600.0, 1200.0, 1800.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static TERRAFORM_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "sql_instance_terraform_operations_total",
            "Total number of terraform invocations by operation and result",
        ),
        &["operation", "result"],
    )
    .expect("Failed to create TERRAFORM_OPERATIONS_TOTAL metric - this should never happen")
});

static TERRAFORM_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "sql_instance_terraform_operation_duration_seconds",
            "Duration of terraform invocations in seconds",
        )
        .buckets(vec![1.0, 5.0, 15.0, 60.0, 180.0, 600.0, 1200.0, 1800.0]),
        &["operation"],
    )
    .expect("Failed to create TERRAFORM_OPERATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "sql_instance_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static PHASE_TRANSITIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "sql_instance_phase_transitions_total",
            "Total number of phase transitions by target phase",
        ),
        &["phase"],
    )
    .expect("Failed to create PHASE_TRANSITIONS_TOTAL metric - this should never happen")
});

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(TERRAFORM_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TERRAFORM_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PHASE_TRANSITIONS_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_terraform_operations(operation: &str, result: &str) {
    TERRAFORM_OPERATIONS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
}

pub fn observe_terraform_operation_duration(operation: &str, duration: f64) {
    TERRAFORM_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_phase_transitions(phase: &str) {
    PHASE_TRANSITIONS_TOTAL.with_label_values(&[phase]).inc();
}
