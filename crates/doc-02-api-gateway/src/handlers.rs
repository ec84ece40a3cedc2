//! HTTP handlers for the document routes.
//!
//! Handlers decode the body, open a [`RequestContext`] with the route's
//! deadline and delegate to [`DocumentApi`]. Status codes come from the
//! service's error taxonomy via [`ApiError`].

use crate::domain::config::TimeoutConfig;
use crate::domain::error::{ApiError, ApiResult};
use crate::middleware::RequestContext;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use doc_01_documents::DocumentApi;
use serde::{Deserialize, Serialize};
use shared_types::{Document, OperationContext, VerificationOutcome, VerificationRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Message returned by a successful delete.
pub const DOCUMENT_DELETED: &str = "document deleted";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn DocumentApi>,
    pub timeouts: TimeoutConfig,
    /// Cancelled when the server shuts down.
    pub shutdown: OperationContext,
}

impl AppState {
    pub fn new(api: Arc<dyn DocumentApi>, timeouts: TimeoutConfig, shutdown: OperationContext) -> Self {
        Self {
            api,
            timeouts,
            shutdown,
        }
    }

    fn request(&self, timeout: Duration) -> RequestContext {
        RequestContext::new(&self.shutdown, timeout)
    }
}

/// `{"message": ...}` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// `{"status": ...}` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
}

fn rejected(rejection: JsonRejection) -> ApiError {
    debug!(error = %rejection.body_text(), "Rejected request body");
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
    }
    ApiError::malformed_json()
}

fn failed(route: &'static str, err: shared_types::DocumentError) -> ApiError {
    let api_error = ApiError::from(err);
    if api_error.status.is_server_error() {
        warn!(route, status = api_error.status.as_u16(), message = %api_error.message, "Request failed");
    }
    api_error
}

/// `POST /documents`
pub async fn create_document(
    State(state): State<AppState>,
    payload: Result<Json<Document>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let Json(candidate) = payload.map_err(rejected)?;

    let request = state.request(state.timeouts.default);
    let result = state.api.create(request.ctx(), candidate).await;
    request.finish();

    let created = result.map_err(|e| failed("create", e))?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /documents`
pub async fn list_documents(State(state): State<AppState>) -> ApiResult<Json<Vec<Document>>> {
    let request = state.request(state.timeouts.default);
    let result = state.api.list(request.ctx()).await;
    request.finish();

    Ok(Json(result.map_err(|e| failed("list", e))?))
}

/// `GET /documents/:id`
pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> ApiResult<Json<Document>> {
    let request = state.request(state.timeouts.default);
    let result = state.api.get(request.ctx(), &document_id).await;
    request.finish();

    Ok(Json(result.map_err(|e| failed("get", e))?))
}

/// `PUT /documents/:id`
pub async fn update_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    payload: Result<Json<Document>, JsonRejection>,
) -> ApiResult<Json<Document>> {
    let Json(candidate) = payload.map_err(rejected)?;

    let request = state.request(state.timeouts.update);
    let result = state.api.update(request.ctx(), &document_id, candidate).await;
    request.finish();

    Ok(Json(result.map_err(|e| failed("update", e))?))
}

/// `DELETE /documents/:id`
pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    let request = state.request(state.timeouts.default);
    let result = state.api.delete(request.ctx(), &document_id).await;
    request.finish();

    result.map_err(|e| failed("delete", e))?;
    Ok(Json(MessageBody {
        message: DOCUMENT_DELETED.to_string(),
    }))
}

/// `POST /documents/verify`
///
/// Body: `{"documento": Document, "firma": "..."}`.
pub async fn verify_document(
    State(state): State<AppState>,
    payload: Result<Json<VerificationRequest>, JsonRejection>,
) -> ApiResult<Json<VerificationOutcome>> {
    let Json(body) = payload.map_err(rejected)?;

    let request = state.request(state.timeouts.verify);
    let result = state
        .api
        .verify(request.ctx(), body.document, &body.signature)
        .await;
    request.finish();

    Ok(Json(result.map_err(|e| failed("verify", e))?))
}

/// `GET /health`
pub async fn health_check() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok".to_string(),
    })
}

/// Fallback for unknown routes.
pub async fn route_not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "route not found")
}
