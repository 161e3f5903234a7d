//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `robot_operator_reconciliations_total` - Total number of reconciliations
//! - `robot_operator_reconciliation_errors_total` - Reconcile errors by classification
//! - `robot_operator_reconciliation_duration_seconds` - Duration of reconciliations
//! - `robot_operator_workqueue_depth` - Items ready in the work queue
//! - `robot_operator_workqueue_adds_total` - Adds to the work queue
//! - `robot_operator_workqueue_retries_total` - Rate-limited re-adds
//! - `robot_operator_watch_events_total` - Watch events routed, by kind and type
//! - `robot_operator_watch_errors_total` - Watch stream errors, by kind
//! - `robot_operator_deployments_created_total` - Deployments created
//! - `robot_operator_deployments_updated_total` - Deployments scaled to the desired replicas
//! - `robot_operator_status_updates_total` - Robot status writes

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGaugeVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "robot_operator_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "robot_operator_reconciliation_errors_total",
            "Total number of reconciliation errors by classification",
        ),
        &["classification"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "robot_operator_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static WORKQUEUE_DEPTH: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        prometheus::Opts::new(
            "robot_operator_workqueue_depth",
            "Number of items ready in the work queue",
        ),
        &["queue"],
    )
    .expect("Failed to create WORKQUEUE_DEPTH metric - this should never happen")
});

static WORKQUEUE_ADDS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "robot_operator_workqueue_adds_total",
            "Total number of adds handled by the work queue",
        ),
        &["queue"],
    )
    .expect("Failed to create WORKQUEUE_ADDS_TOTAL metric - this should never happen")
});

static WORKQUEUE_RETRIES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "robot_operator_workqueue_retries_total",
            "Total number of rate-limited retries handled by the work queue",
        ),
        &["queue"],
    )
    .expect("Failed to create WORKQUEUE_RETRIES_TOTAL metric - this should never happen")
});

static WATCH_EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "robot_operator_watch_events_total",
            "Total number of watch events routed, by resource kind and event type",
        ),
        &["kind", "event"],
    )
    .expect("Failed to create WATCH_EVENTS_TOTAL metric - this should never happen")
});

static WATCH_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "robot_operator_watch_errors_total",
            "Total number of watch stream errors, by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create WATCH_ERRORS_TOTAL metric - this should never happen")
});

static DEPLOYMENTS_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "robot_operator_deployments_created_total",
        "Total number of Deployments created",
    )
    .expect("Failed to create DEPLOYMENTS_CREATED_TOTAL metric - this should never happen")
});

static DEPLOYMENTS_UPDATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "robot_operator_deployments_updated_total",
        "Total number of Deployments scaled to the desired replica count",
    )
    .expect("Failed to create DEPLOYMENTS_UPDATED_TOTAL metric - this should never happen")
});

static STATUS_UPDATES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "robot_operator_status_updates_total",
        "Total number of Robot status updates",
    )
    .expect("Failed to create STATUS_UPDATES_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry
///
/// # Errors
///
/// Returns an error if a metric is registered twice.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(WORKQUEUE_DEPTH.clone()))?;
    REGISTRY.register(Box::new(WORKQUEUE_ADDS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WORKQUEUE_RETRIES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WATCH_EVENTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WATCH_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEPLOYMENTS_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEPLOYMENTS_UPDATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STATUS_UPDATES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(classification: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[classification])
        .inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn set_queue_depth(queue: &str, depth: usize) {
    WORKQUEUE_DEPTH
        .with_label_values(&[queue])
        .set(i64::try_from(depth).unwrap_or(i64::MAX));
}

pub fn increment_queue_adds(queue: &str) {
    WORKQUEUE_ADDS_TOTAL.with_label_values(&[queue]).inc();
}

pub fn increment_queue_retries(queue: &str) {
    WORKQUEUE_RETRIES_TOTAL.with_label_values(&[queue]).inc();
}

pub fn increment_watch_events(kind: &str, event: &str) {
    WATCH_EVENTS_TOTAL.with_label_values(&[kind, event]).inc();
}

pub fn increment_watch_errors(kind: &str) {
    WATCH_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_deployments_created() {
    DEPLOYMENTS_CREATED_TOTAL.inc();
}

pub fn increment_deployments_updated() {
    DEPLOYMENTS_UPDATED_TOTAL.inc();
}

pub fn increment_status_updates() {
    STATUS_UPDATES_TOTAL.inc();
}
