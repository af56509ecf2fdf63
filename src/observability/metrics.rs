//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `aws_api_calls_total` - Outgoing AWS calls by service, operation and SDK generation
//! - `managed_reconciliations_total` - Reconciliation passes by record kind and result
//! - `managed_reconcile_duration_seconds` - Duration of reconciliation passes by record kind
//! - `managed_reconcile_errors_total` - Failed reconciliation passes by record kind
//! - `managed_requeues_total` - Requeues by reason

use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static AWS_API_CALLS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "aws_api_calls_total",
            "Number of API calls to AWS by service, operation and SDK version",
        ),
        &["service", "operation", "api_version"],
    )
    .expect("Failed to create AWS_API_CALLS_TOTAL metric - this should never happen")
});

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "managed_reconciliations_total",
            "Total number of reconciliation passes by record kind and result",
        ),
        &["kind", "result"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILE_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "managed_reconcile_duration_seconds",
            "Duration of reconciliation passes in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILE_DURATION metric - this should never happen")
});

static RECONCILE_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "managed_reconcile_errors_total",
            "Total number of failed reconciliation passes by record kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILE_ERRORS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new("managed_requeues_total", "Total number of requeues by reason"),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Registration only fails on duplicate metric names"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(AWS_API_CALLS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILE_DURATION.clone()))?;
    REGISTRY.register(Box::new(RECONCILE_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

/// Count one outgoing AWS call
pub fn increment_aws_api_calls(service: &str, operation: &str, api_version: &str) {
    AWS_API_CALLS_TOTAL
        .with_label_values(&[service, operation, api_version])
        .inc();
}

pub fn increment_reconciliations(kind: &str, result: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind, result]).inc();
}

pub fn observe_reconcile_duration(kind: &str, duration: f64) {
    RECONCILE_DURATION.with_label_values(&[kind]).observe(duration);
}

pub fn increment_reconcile_errors(kind: &str) {
    RECONCILE_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
