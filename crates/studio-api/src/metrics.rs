//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder.
///
/// Worker and pipeline metrics recorded in the same process are exported
/// through the returned handle too.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "studio_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "studio_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "studio_http_requests_in_flight";

    pub const QUEUE_LENGTH: &str = "studio_queue_length";
    pub const QUEUE_DLQ_LENGTH: &str = "studio_queue_dlq_length";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "studio_rate_limit_hits_total";
}

/// Record an HTTP request against its route template.
pub fn record_http_request(method: &str, route: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn set_queue_length(length: u64) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}

pub fn set_dlq_length(length: u64) {
    gauge!(names::QUEUE_DLQ_LENGTH).set(length as f64);
}

pub fn record_rate_limit_hit() {
    counter!(names::RATE_LIMIT_HITS_TOTAL).increment(1);
}

/// Metrics middleware for HTTP requests.
///
/// Must be installed with `route_layer` so the matched route template is
/// available; raw paths would give every id its own series.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
