//! API routes.

use std::time::Duration;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::{
    approve_output_script, approve_standalone_script, create_article, create_standalone,
    create_submission, get_standalone, get_submission, health, heygen_webhook, ready,
    regenerate_output, regenerate_standalone, submagic_webhook,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    IpRateLimiter,
};
use crate::state::AppState;

/// Requests still running after `timeout` are answered with 408.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let org_routes = Router::new()
        .route("/orgs/:org/articles", post(create_article))
        .route("/orgs/:org/submissions", post(create_submission))
        .route("/orgs/:org/submissions/:id", get(get_submission))
        .route(
            "/orgs/:org/outputs/:id/approve-script",
            post(approve_output_script),
        )
        .route("/orgs/:org/outputs/:id/regenerate", post(regenerate_output))
        .route("/orgs/:org/standalone-videos", post(create_standalone))
        .route("/orgs/:org/standalone-videos/:id", get(get_standalone))
        .route(
            "/orgs/:org/standalone-videos/:id/approve-script",
            post(approve_standalone_script),
        )
        .route(
            "/orgs/:org/standalone-videos/:id/regenerate",
            post(regenerate_standalone),
        );

    let rate_limiter = IpRateLimiter::new(state.config.rate_limit_rps, state.config.rate_limit_burst);
    let api_routes = org_routes.layer(middleware::from_fn_with_state(
        rate_limiter,
        rate_limit_middleware,
    ));

    // Providers retry on failure, so callbacks are not rate limited
    let webhook_routes = Router::new()
        .route("/webhooks/submagic", post(submagic_webhook))
        .route("/webhooks/heygen", post(heygen_webhook));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(timeout_layer(state.config.request_timeout))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_slow_request_is_answered_with_408() {
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .layer(timeout_layer(Duration::from_millis(20)));

        let response = app
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
