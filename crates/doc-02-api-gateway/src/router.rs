//! Route table and middleware stack.

use crate::domain::config::GatewayConfig;
use crate::domain::error::ApiError;
use crate::handlers::{
    create_document, delete_document, get_document, health_check, list_documents,
    route_not_found, update_document, verify_document, AppState,
};
use crate::middleware::create_cors_layer;
use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{BoxError, Router};
use std::any::Any;
use std::time::Duration;
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultMakeSpan, OnResponse, TraceLayer};
use tracing::{error, info, Level, Span};

/// Message answered when a handler panics.
pub const UNEXPECTED_ERROR: &str = "an unexpected error occurred on the server";

/// Message answered when a request outlives the request timeout.
pub const REQUEST_TIMED_OUT: &str = "request timed out";

/// Build the HTTP router.
///
/// | Method | Path | Success |
/// |--------|------|---------|
/// | POST | `/documents` | 201 |
/// | GET | `/documents` | 200 |
/// | POST | `/documents/verify` | 200 |
/// | GET/PUT/DELETE | `/documents/:id` | 200 |
/// | GET | `/health` | 200 |
///
/// Every failure, including a handler panic and the request timeout,
/// answers with the JSON error body.
pub fn build_router(state: AppState, config: &GatewayConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(LogResponse)
                .on_failure(()),
        )
        .layer(create_cors_layer(&config.cors))
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .layer(TimeoutLayer::new(config.timeouts.request))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(DefaultBodyLimit::max(config.limits.max_body_bytes));

    Router::new()
        .route("/health", get(health_check))
        .route("/documents", post(create_document).get(list_documents))
        .route("/documents/verify", post(verify_document))
        .route(
            "/documents/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
        .fallback(route_not_found)
        .layer(middleware)
        .with_state(state)
}

/// One line per request: INFO when it succeeded, ERROR from 400 up.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogResponse;

impl<B> OnResponse<B> for LogResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        let status = response.status().as_u16();
        let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        if status >= 400 {
            error!(status, latency_ms, "Request failed");
        } else {
            info!(status, latency_ms, "Request completed");
        }
    }
}

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::new(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMED_OUT)
    } else {
        error!(error = %err, "Unhandled middleware error");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR)
    }
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let detail = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    error!(panic = %detail, "Handler panicked");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR).into_response()
}
