// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Gslb controller.
//!
//! All metrics carry the namespace prefix `gslb_firestoned_io_` (prometheus-safe
//! version of "gslb.firestoned.io").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Track reconciliation operations and their outcomes
//! - **Resource Lifecycle Metrics** - Track `DNSEndpoint` writes
//! - **Peer Metrics** - Track heartbeat verdicts and failed peer queries
//! - **Steering Metrics** - Track published records and failover ambiguities
//!
//! # Example
//!
//! ```rust,no_run
//! use gslb::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("Gslb", std::time::Duration::from_secs(1));
//! ```

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all Gslb metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "gslb_firestoned_io";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (`Gslb`)
/// - `status`: Outcome (`success`, `error`, `requeue`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of requeue operations
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Reason for requeue (`error`, `periodic`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requeues_total"),
        "Total number of requeue operations by resource type and reason",
    );
    let counter = CounterVec::new(opts, &["resource_type", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Resource Lifecycle Metrics
// ============================================================================

/// Total number of resources written
///
/// Labels:
/// - `resource_type`: Kind of resource written
/// - `operation`: `created`, `replaced` or `unchanged`
pub static RESOURCE_WRITES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resource_writes_total"),
        "Total number of resource writes by type and operation",
    );
    let counter = CounterVec::new(opts, &["resource_type", "operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by resource type and error category
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `error_type`: Category of error (`api_error`, `dns_error`, `config_error`, `timeout`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by resource type and error category",
    );
    let counter = CounterVec::new(opts, &["resource_type", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Peer Metrics
// ============================================================================

/// Heartbeat checks by peer and verdict
///
/// Labels:
/// - `peer`: Peer geo tag
/// - `verdict`: `fresh`, `unreachable`, `missing`, `malformed`, `expired`
pub static HEARTBEAT_CHECKS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_heartbeat_checks_total"),
        "Peer heartbeat checks by peer and verdict",
    );
    let counter = CounterVec::new(opts, &["peer", "verdict"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Failed `localtargets-` queries by peer
pub static PEER_QUERY_FAILURES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_peer_query_failures_total"),
        "Failed or timed out peer target queries by peer",
    );
    let counter = CounterVec::new(opts, &["peer"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Steering Metrics
// ============================================================================

/// Failover decisions taken without confirming the primary is down
pub static FAILOVER_AMBIGUITY_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_failover_ambiguity_total"),
        "Secondary failover decisions taken without confirmation from the primary",
    );
    let counter = CounterVec::new(opts, &["gslb"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Records currently published per Gslb
///
/// Labels:
/// - `namespace`, `gslb`: Gslb identity
pub static PUBLISHED_RECORDS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_published_records"),
        "Number of DNS records currently published per Gslb",
    );
    let gauge = GaugeVec::new(opts, &["namespace", "gslb"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Healthy managed hosts per Gslb
pub static HEALTHY_HOSTS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_healthy_hosts"),
        "Number of managed hosts healthy in this cluster per Gslb",
    );
    let gauge = GaugeVec::new(opts, &["namespace", "gslb"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled (e.g., `Gslb`)
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled
/// * `duration` - Duration of the reconciliation before failure
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a reconciliation requeue
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Record a resource write (`created`, `replaced` or `unchanged`)
pub fn record_resource_write(resource_type: &str, operation: &str) {
    RESOURCE_WRITES_TOTAL
        .with_label_values(&[resource_type, operation])
        .inc();
}

/// Record an error
///
/// # Arguments
/// * `resource_type` - The kind of resource where error occurred
/// * `error_type` - Category of error (e.g., `api_error`, `dns_error`)
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Record the verdict of one peer heartbeat check
pub fn record_heartbeat(peer: &str, verdict: &str) {
    HEARTBEAT_CHECKS_TOTAL
        .with_label_values(&[peer, verdict])
        .inc();
}

/// Record a failed or timed out peer target query
pub fn record_peer_query_failure(peer: &str) {
    PEER_QUERY_FAILURES_TOTAL.with_label_values(&[peer]).inc();
}

/// Record a failover decision taken without confirmation from the primary
pub fn record_failover_ambiguity(gslb: &str) {
    FAILOVER_AMBIGUITY_TOTAL.with_label_values(&[gslb]).inc();
}

/// Record what a Gslb currently publishes
///
/// # Arguments
/// * `namespace`, `gslb` - Gslb identity
/// * `records` - Number of records in its `DNSEndpoint`
/// * `healthy_hosts` - Number of managed hosts healthy in this cluster
pub fn record_published(namespace: &str, gslb: &str, records: usize, healthy_hosts: usize) {
    #[allow(clippy::cast_precision_loss)]
    {
        PUBLISHED_RECORDS
            .with_label_values(&[namespace, gslb])
            .set(records as f64);
        HEALTHY_HOSTS
            .with_label_values(&[namespace, gslb])
            .set(healthy_hosts as f64);
    }
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
