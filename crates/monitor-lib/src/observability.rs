//! Observability for the monitoring service
//!
//! Provides:
//! - Prometheus self-metrics (queries, failures, backend latency, NoHit responses)
//! - Structured JSON logging of query lifecycle events with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for backend and end-to-end latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    queries_total: IntCounterVec,
    query_failures_total: IntCounterVec,
    query_duration_seconds: Histogram,
    backend_latency_seconds: Histogram,
    backend_errors_total: IntCounter,
    nohit_total: IntCounter,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            queries_total: register_int_counter_vec!(
                "monitoring_queries_total",
                "Monitoring requests handled, by level",
                &["level", "kind"]
            )
            .expect("Failed to register queries_total"),

            query_failures_total: register_int_counter_vec!(
                "monitoring_query_failures_total",
                "Monitoring requests that returned an error, by level",
                &["level"]
            )
            .expect("Failed to register query_failures_total"),

            query_duration_seconds: register_histogram!(
                "monitoring_query_duration_seconds",
                "End-to-end time spent serving a monitoring request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register query_duration_seconds"),

            backend_latency_seconds: register_histogram!(
                "monitoring_backend_latency_seconds",
                "Time spent waiting for a single backend query",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register backend_latency_seconds"),

            backend_errors_total: register_int_counter!(
                "monitoring_backend_errors_total",
                "Backend queries that failed"
            )
            .expect("Failed to register backend_errors_total"),

            nohit_total: register_int_counter!(
                "monitoring_nohit_total",
                "Requests answered empty because the window predates the namespace"
            )
            .expect("Failed to register nohit_total"),
        }
    }
}

/// Handle to the process-wide monitoring metrics
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a handle, registering the collectors on first use
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    /// Count a request at `level`; `meter` selects the kind label
    pub fn inc_queries(&self, level: &str, meter: bool) {
        let kind = if meter { "meter" } else { "metric" };
        self.inner().queries_total.with_label_values(&[level, kind]).inc();
    }

    pub fn inc_query_failures(&self, level: &str) {
        self.inner()
            .query_failures_total
            .with_label_values(&[level])
            .inc();
    }

    pub fn observe_query_duration(&self, duration_secs: f64) {
        self.inner().query_duration_seconds.observe(duration_secs);
    }

    pub fn observe_backend_latency(&self, duration_secs: f64) {
        self.inner().backend_latency_seconds.observe(duration_secs);
    }

    pub fn inc_backend_errors(&self) {
        self.inner().backend_errors_total.inc();
    }

    pub fn inc_nohit(&self) {
        self.inner().nohit_total.inc();
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, backend: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            version = %version,
            backend = %backend,
            "Monitoring service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Monitoring service shutting down"
        );
    }

    /// Log a completed monitoring request
    pub fn log_query(&self, level: &str, meter: bool, metrics: usize, elapsed_ms: u128) {
        info!(
            event = "query_served",
            instance = %self.instance,
            level = %level,
            meter = meter,
            metrics = metrics,
            elapsed_ms = elapsed_ms as u64,
            "Monitoring query served"
        );
    }

    /// Log a failed monitoring request
    pub fn log_query_failure(&self, level: &str, error: &str, bad_request: bool) {
        if bad_request {
            info!(
                event = "query_rejected",
                instance = %self.instance,
                level = %level,
                error = %error,
                "Monitoring query rejected"
            );
        } else {
            warn!(
                event = "query_failed",
                instance = %self.instance,
                level = %level,
                error = %error,
                "Monitoring query failed"
            );
        }
    }
}
