//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `secret_sync_reconciliations_total` - Total number of reconciliation passes
//! - `secret_sync_reconciliation_errors_total` - Total number of passes that ended in error
//! - `secret_sync_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `secret_sync_outcomes_total` - Pass outcomes by condition reason
//! - `secret_sync_secret_writes_total` - Total number of Secret applies
//! - `secret_sync_provider_call_duration_seconds` - Duration of provider calls by provider
//! - `secret_sync_provider_call_errors_total` - Failed provider calls by provider
//! - `secret_sync_requeues_total` - Requeues by trigger

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_sync_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_sync_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "secret_sync_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static SYNC_OUTCOMES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_sync_outcomes_total",
            "Reconciliation outcomes by condition reason",
        ),
        &["reason"],
    )
    .expect("Failed to create SYNC_OUTCOMES_TOTAL metric - this should never happen")
});

static SECRET_WRITES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_sync_secret_writes_total",
        "Total number of Secrets applied",
    )
    .expect("Failed to create SECRET_WRITES_TOTAL metric - this should never happen")
});

static PROVIDER_CALL_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "secret_sync_provider_call_duration_seconds",
            "Duration of provider calls in seconds by provider",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["provider"],
    )
    .expect("Failed to create PROVIDER_CALL_DURATION metric - this should never happen")
});

static PROVIDER_CALL_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_sync_provider_call_errors_total",
            "Total number of failed provider calls by provider",
        ),
        &["provider"],
    )
    .expect("Failed to create PROVIDER_CALL_ERRORS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secret_sync_requeues_total",
            "Total number of requeues by trigger",
        ),
        &["trigger"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Registration only fails on duplicate metric names"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SYNC_OUTCOMES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRET_WRITES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_CALL_DURATION.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_CALL_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

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

pub fn record_sync_outcome(reason: &str) {
    SYNC_OUTCOMES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_secret_writes() {
    SECRET_WRITES_TOTAL.inc();
}

pub fn observe_provider_call(provider: &str, duration: f64) {
    PROVIDER_CALL_DURATION
        .with_label_values(&[provider])
        .observe(duration);
}

pub fn increment_provider_call_errors(provider: &str) {
    PROVIDER_CALL_ERRORS_TOTAL
        .with_label_values(&[provider])
        .inc();
}

pub fn increment_requeues_total(trigger: &str) {
    REQUEUES_TOTAL.with_label_values(&[trigger]).inc();
}
