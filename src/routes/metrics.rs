//! Prometheus metrics endpoint
//!
//! Exposes request, upload and session counters in Prometheus format.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use tracing::warn;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<Option<PrometheusHandle>> = Lazy::new(|| {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Prometheus recorder not installed");
            None
        }
    }
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!("mirage_requests_total", "Total number of requests processed");
    metrics::describe_histogram!(
        "mirage_request_duration_seconds",
        "Request duration in seconds"
    );
    metrics::describe_counter!(
        "mirage_upload_cache_total",
        "Attachment upload cache lookups by result"
    );
    metrics::describe_counter!("mirage_uploads_total", "Attachment uploads by backend and status");
    metrics::describe_counter!(
        "mirage_sessions_created_total",
        "Vendor chat sessions created"
    );
    metrics::describe_counter!(
        "mirage_context_trimmed_total",
        "Requests whose history was trimmed to fit the context window"
    );
}

/// Prometheus metrics endpoint handler
///
/// Returns metrics in Prometheus text format for scraping.
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record a finished request
pub fn record_request(endpoint: &str, status: &str, duration_secs: f64) {
    metrics::counter!(
        "mirage_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("mirage_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration_secs);
}

/// Record an upload cache lookup (`hit` or `miss`)
pub fn record_upload_cache(result: &str) {
    metrics::counter!("mirage_upload_cache_total", "result" => result.to_string()).increment(1);
}

/// Record an attachment upload attempt
pub fn record_upload(backend: &str, status: &str) {
    metrics::counter!(
        "mirage_uploads_total",
        "backend" => backend.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_session_created(status: &str) {
    metrics::counter!("mirage_sessions_created_total", "status" => status.to_string())
        .increment(1);
}

pub fn record_context_trimmed() {
    metrics::counter!("mirage_context_trimmed_total").increment(1);
}
