//! Axum router construction.
//!
//! The [`app`] function wires both energy endpoints (plus the health,
//! metrics, and OpenAPI routes) to their handlers and returns a
//! ready-to-serve [`axum::Router`].  Routes are POST-only; any other
//! method gets the router's own 405 and never reaches a handler.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::errors::EnergyError;
use crate::handlers::reading::submit_reading;
use crate::handlers::upload::upload_file;
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

// -- OpenAPI specification ----------------------------------------------------

/// OpenAPI documentation for the energy API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Home Energy API",
        version = "0.1.0",
        description = "Meter reading intake and CSV upload service"
    ),
    paths(
        health_check,
        crate::handlers::reading::submit_reading,
        crate::handlers::upload::upload_file,
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Energy", description = "Energy readings and uploads"),
    )
)]
pub struct ApiDoc;

/// Build the axum [`Router`] with all routes and middleware.
///
/// The returned router is ready to be passed to `axum::serve`.
pub fn app(state: Arc<AppState>) -> Router {
    let max_body_size = state.config.server.max_body_size;
    let observability = state.config.observability.clone();

    let mut router = Router::new()
        .route("/energy/input", post(submit_reading))
        .route("/energy/upload", post(upload_file))
        .route("/openapi.json", get(openapi_json));

    if observability.health_check {
        router = router.route("/health", get(health_check));
    }
    if observability.metrics {
        router = router.route("/metrics", get(metrics_handler));
    }

    let router = router
        .with_state(state)
        // Layer ordering: later layers wrap earlier ones.
        // Replace axum's 2 MB extractor default with one hard limit that
        // also rejects an oversized Content-Length before any handler runs.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        // Must wrap the limit layer so its 413 is rendered as JSON.
        .layer(middleware::map_response(json_payload_too_large))
        .layer(middleware::from_fn(common_headers_middleware))
        .layer(TraceLayer::new_for_http());

    if observability.metrics {
        // Outermost, so it captures the full request lifecycle.
        router.layer(middleware::from_fn(metrics_middleware))
    } else {
        router
    }
}

// -- Middleware ----------------------------------------------------------------

/// Add `x-request-id` (16 uppercase hex characters) and `server` headers
/// to every response.
async fn common_headers_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    if !headers.contains_key("x-request-id") {
        if let Ok(value) = HeaderValue::from_str(&generate_request_id()) {
            headers.insert("x-request-id", value);
        }
    }
    headers.insert(header::SERVER, HeaderValue::from_static("home-energy"));

    response
}

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// Rewrite the body-limit layer's plain-text 413 into the JSON error shape.
async fn json_payload_too_large(response: Response) -> Response {
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response;
    }
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if is_json {
        return response;
    }
    EnergyError::MalformedBody {
        status: StatusCode::PAYLOAD_TOO_LARGE,
        message: "Request body exceeds the maximum allowed size".to_string(),
    }
    .into_response()
}

// -- Infrastructure handlers -------------------------------------------------

/// `GET /health` -- Returns `{"status": "ok"}` with 200 OK.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "HealthCheck",
    responses(
        (status = 200, description = "Health check OK")
    )
)]
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// `GET /openapi.json` -- The generated OpenAPI document.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_format() {
        let id = generate_request_id();
        assert_eq!(id.len(), 16);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_openapi_lists_energy_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/energy/input"));
        assert!(doc.paths.paths.contains_key("/energy/upload"));
        assert!(doc.paths.paths.contains_key("/health"));
    }

    #[tokio::test]
    async fn test_plain_413_rewritten_as_json() {
        let plain = (StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded").into_response();
        let response = json_payload_too_large(plain).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value.get("error").is_some());
    }

    #[tokio::test]
    async fn test_other_statuses_untouched() {
        let ok = (StatusCode::OK, "fine").into_response();
        let response = json_payload_too_large(ok).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"fine");
    }
}
