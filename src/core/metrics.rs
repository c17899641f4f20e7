//! Prometheus metrics for the gateway.
//!
//! A single registry-backed [`Metrics`] instance is created lazily and shared
//! process-wide; handlers and the relay only ever increment it.

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;

/// Container for all application metrics.
pub struct Metrics {
    /// Inbound requests by method, endpoint and status
    pub request_count: IntCounterVec,

    /// Inbound request duration in seconds (until headers are sent)
    pub request_duration: HistogramVec,

    /// Upstream calls by provider, resolved model and upstream status
    pub upstream_requests: IntCounterVec,

    /// Upstream latency until response headers, in seconds
    pub upstream_latency: HistogramVec,

    /// Streams currently being relayed
    pub active_streams: IntGauge,

    /// Streams ended because the caller went away
    pub client_disconnects_total: IntCounter,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// Subsequent calls return the same instance.
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let request_count = register_int_counter_vec!(
            "open_gateway_requests_total",
            "Total number of requests",
            &["method", "endpoint", "status_code"]
        )
        .expect("Failed to register request_count metric");

        let request_duration = register_histogram_vec!(
            "open_gateway_request_duration_seconds",
            "Request duration in seconds",
            &["method", "endpoint"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
        )
        .expect("Failed to register request_duration metric");

        let upstream_requests = register_int_counter_vec!(
            "open_gateway_upstream_requests_total",
            "Total number of upstream requests",
            &["provider", "model", "status_code"]
        )
        .expect("Failed to register upstream_requests metric");

        let upstream_latency = register_histogram_vec!(
            "open_gateway_upstream_latency_seconds",
            "Upstream latency until response headers in seconds",
            &["provider", "stream"],
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
        )
        .expect("Failed to register upstream_latency metric");

        let active_streams = register_int_gauge!(
            "open_gateway_active_streams",
            "Number of streams currently being relayed"
        )
        .expect("Failed to register active_streams metric");

        let client_disconnects_total = register_int_counter!(
            "open_gateway_client_disconnects_total",
            "Streams terminated by caller disconnect"
        )
        .expect("Failed to register client_disconnects_total metric");

        Metrics {
            request_count,
            request_duration,
            upstream_requests,
            upstream_latency,
            active_streams,
            client_disconnects_total,
        }
    })
}

/// Get the global metrics instance, initializing it on first use.
pub fn get_metrics() -> &'static Metrics {
    init_metrics()
}
