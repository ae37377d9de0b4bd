//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `externalsecret_backend_instances` - Backend instances currently in the directory
//! - `externalsecret_backend_operations_total` - Adapter `init`/`get` calls by backend, operation and result
//! - `externalsecret_backend_operation_duration_seconds` - Duration of adapter calls
//! - `externalsecret_secrets_materialized_total` - Secrets produced by the materializer
//! - `externalsecret_reconciliations_total` - Reconciliations by resource kind
//! - `externalsecret_reconciliation_errors_total` - Failed reconciliations by resource kind
//! - `externalsecret_reconciliation_duration_seconds` - Duration of reconciliations

use anyhow::Result;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static BACKEND_INSTANCES: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "externalsecret_backend_instances",
        "Number of backend instances in the directory",
    )
    .expect("Failed to create BACKEND_INSTANCES metric - this should never happen")
});

static BACKEND_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "externalsecret_backend_operations_total",
            "Total number of backend adapter operations",
        ),
        &["backend", "operation", "result"],
    )
    .expect("Failed to create BACKEND_OPERATIONS_TOTAL metric - this should never happen")
});

static BACKEND_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "externalsecret_backend_operation_duration_seconds",
            "Duration of backend adapter operations in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["backend", "operation"],
    )
    .expect("Failed to create BACKEND_OPERATION_DURATION metric - this should never happen")
});

static SECRETS_MATERIALIZED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "externalsecret_secrets_materialized_total",
        "Total number of secrets materialized from a backend",
    )
    .expect("Failed to create SECRETS_MATERIALIZED_TOTAL metric - this should never happen")
});

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "externalsecret_reconciliations_total",
            "Total number of reconciliations",
        ),
        &["resource"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "externalsecret_reconciliation_errors_total",
            "Total number of reconciliation errors",
        ),
        &["resource"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "externalsecret_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["resource"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(BACKEND_INSTANCES.clone()))?;
    REGISTRY.register(Box::new(BACKEND_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BACKEND_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SECRETS_MATERIALIZED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;

    Ok(())
}

pub fn set_backend_instances(count: usize) {
    BACKEND_INSTANCES.set(i64::try_from(count).unwrap_or(i64::MAX));
}

pub fn record_backend_operation(backend: &str, operation: &str, result: &str, duration: f64) {
    BACKEND_OPERATIONS_TOTAL
        .with_label_values(&[backend, operation, result])
        .inc();
    BACKEND_OPERATION_DURATION
        .with_label_values(&[backend, operation])
        .observe(duration);
}

pub fn increment_secrets_materialized() {
    SECRETS_MATERIALIZED_TOTAL.inc();
}

pub fn increment_reconciliations(resource: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[resource]).inc();
}

pub fn increment_reconciliation_errors(resource: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[resource]).inc();
}

pub fn observe_reconciliation_duration(resource: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[resource])
        .observe(duration);
}
