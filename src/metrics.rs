//! Prometheus metrics.
//!
//! Installs a global Prometheus recorder using `metrics-exporter-prometheus`,
//! defines metric name constants, provides an axum middleware for HTTP RED
//! metrics, and exposes the `/metrics` endpoint handler.

use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

// -- Metric name constants ----------------------------------------------------

/// Total HTTP requests (counter). Labels: method, path, status.
pub const HTTP_REQUESTS_TOTAL: &str = "home_energy_http_requests_total";

/// HTTP request duration in seconds (histogram). Labels: method, path.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "home_energy_http_request_duration_seconds";

/// Energy readings received (counter). Labels: outcome.
pub const READINGS_TOTAL: &str = "home_energy_readings_total";

/// File uploads attempted (counter). Labels: outcome.
pub const UPLOADS_TOTAL: &str = "home_energy_uploads_total";

/// Bytes successfully handed to object storage (counter).
pub const UPLOAD_BYTES_TOTAL: &str = "home_energy_upload_bytes_total";

// -- Global recorder installation ---------------------------------------------

/// Singleton handle to the Prometheus recorder.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus metrics recorder. Idempotent.
pub fn init_metrics() -> anyhow::Result<&'static PrometheusHandle> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle))
}

/// Register metric descriptions with the global recorder. Call once after
/// `init_metrics()`.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(READINGS_TOTAL, "Energy readings received, by outcome");
    describe_counter!(UPLOADS_TOTAL, "CSV uploads attempted, by outcome");
    describe_counter!(UPLOAD_BYTES_TOTAL, "Bytes uploaded to object storage");
}

/// Record the outcome of a reading submission.
pub fn record_reading(outcome: &'static str) {
    counter!(READINGS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record the outcome of an upload and, on success, its size.
pub fn record_upload(outcome: &'static str, bytes: usize) {
    counter!(UPLOADS_TOTAL, "outcome" => outcome).increment(1);
    if bytes > 0 {
        counter!(UPLOAD_BYTES_TOTAL).increment(bytes as u64);
    }
}

// -- Metrics middleware -------------------------------------------------------

/// Axum middleware that records HTTP RED metrics for every request.
///
/// Excludes `/metrics` from self-instrumentation to avoid feedback loops.
pub async fn metrics_middleware(
    req: Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    if req.uri().path() == "/metrics" {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let start = Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path, "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

// -- Path normalization -------------------------------------------------------

/// Collapse request paths to known routes so scanning clients cannot blow
/// up label cardinality.
fn normalize_path(path: &str) -> &'static str {
    match path {
        "/energy/input" => "/energy/input",
        "/energy/upload" => "/energy/upload",
        "/health" => "/health",
        "/openapi.json" => "/openapi.json",
        _ => "other",
    }
}

// -- Metrics endpoint handler -------------------------------------------------

/// `GET /metrics` -- Render Prometheus exposition format text.
pub async fn metrics_handler() -> Response {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_known_routes() {
        assert_eq!(normalize_path("/energy/input"), "/energy/input");
        assert_eq!(normalize_path("/energy/upload"), "/energy/upload");
        assert_eq!(normalize_path("/health"), "/health");
    }

    #[test]
    fn test_normalize_unknown_paths() {
        assert_eq!(normalize_path("/"), "other");
        assert_eq!(normalize_path("/energy/upload/extra"), "other");
        assert_eq!(normalize_path("/wp-admin"), "other");
    }
}
