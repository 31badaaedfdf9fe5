//! Prometheus metrics endpoint
//!
//! Exposes relay metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "relay_requests_total",
        "Total number of chat requests processed"
    );
    metrics::describe_histogram!(
        "relay_request_duration_seconds",
        "Time until the relay stream started or the request failed"
    );
    metrics::describe_counter!(
        "relay_frames_total",
        "Upstream frames by outcome (emitted, skipped, malformed, emit_failed)"
    );
    metrics::describe_counter!(
        "relay_upstream_errors_total",
        "Upstream failures by kind"
    );
    metrics::describe_counter!(
        "relay_streams_completed_total",
        "Finished relay streams by termination reason"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a request
pub fn record_request(status: &str, duration_secs: f64) {
    metrics::counter!("relay_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("relay_request_duration_seconds").record(duration_secs);
}

/// Record one upstream frame outcome
pub fn record_frame(outcome: &'static str) {
    metrics::counter!("relay_frames_total", "outcome" => outcome).increment(1);
}

/// Record an upstream failure
pub fn record_upstream_error(kind: &'static str) {
    metrics::counter!("relay_upstream_errors_total", "kind" => kind).increment(1);
}

/// Record the end of a relay stream
pub fn record_stream_complete(termination: &'static str) {
    metrics::counter!("relay_streams_completed_total", "termination" => termination).increment(1);
}
