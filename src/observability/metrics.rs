//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `template_controller_reconciliations_total` - Total number of reconciliations
//! - `template_controller_reconciliation_errors_total` - Total number of reconciliation errors
//! - `template_controller_reconcile_duration_seconds` - Duration of reconcile passes
//! - `template_controller_targets_applied_total` - Total number of targets applied
//! - `template_controller_targets_skipped_total` - Total number of targets skipped (already converged)
//! - `template_controller_targets_failed_total` - Total number of targets that failed

use anyhow::Result;
use prometheus::{Histogram, IntCounter, Registry};
use std::sync::LazyLock;

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "template_controller_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "template_controller_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "template_controller_reconcile_duration_seconds",
            "Duration of reconcile passes in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILE_DURATION metric - this should never happen")
});

static TARGETS_APPLIED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "template_controller_targets_applied_total",
        "Total number of targets applied",
    )
    .expect("Failed to create TARGETS_APPLIED_TOTAL metric - this should never happen")
});

static TARGETS_SKIPPED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "template_controller_targets_skipped_total",
        "Total number of targets skipped because they were already converged",
    )
    .expect("Failed to create TARGETS_SKIPPED_TOTAL metric - this should never happen")
});

static TARGETS_FAILED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "template_controller_targets_failed_total",
        "Total number of targets that failed to apply",
    )
    .expect("Failed to create TARGETS_FAILED_TOTAL metric - this should never happen")
});

/// Register all metrics with the controller registry. Call once at startup.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILE_DURATION.clone()))?;
    REGISTRY.register(Box::new(TARGETS_APPLIED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TARGETS_SKIPPED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TARGETS_FAILED_TOTAL.clone()))?;
    Ok(())
}

/// Gather all metric families for the `/metrics` endpoint.
#[must_use]
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconcile_duration(seconds: f64) {
    RECONCILE_DURATION.observe(seconds);
}

pub fn add_targets_applied(count: u64) {
    TARGETS_APPLIED_TOTAL.inc_by(count);
}

pub fn add_targets_skipped(count: u64) {
    TARGETS_SKIPPED_TOTAL.inc_by(count);
}

pub fn add_targets_failed(count: u64) {
    TARGETS_FAILED_TOTAL.inc_by(count);
}
