//! Axum Handlers for the REST API
//!
//! Thin adapters between HTTP and the core ingress. Documented with
//! `utoipa::path` attributes for the OpenAPI document.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::{
    models::{
        BreakerStatus, ClearResponse, ErrorResponse, HealthResponse, PushPayload, PushResponse,
        StatusResponse,
    },
    state::AppState,
};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(status = %rejection.status(), "Rejected push body");
        Self::BadRequest(rejection.body_text())
    }
}

/// Push a recognized utterance for dispatch.
///
/// Returns before dispatch starts. An utterance arriving while another is
/// being dispatched is acknowledged the same way but dropped.
#[utoipa::path(
    post,
    path = "/voice/push",
    request_body = PushPayload,
    responses(
        (status = 200, description = "Utterance accepted", body = PushResponse),
        (status = 400, description = "Empty utterance or malformed body", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn push_voice(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PushPayload>, JsonRejection>,
) -> Result<Json<PushResponse>, ApiError> {
    let Json(payload) = payload?;
    let receipt = state.ingress.push(&payload.text);
    if !receipt.ack.accepted {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }
    Ok(Json(PushResponse {
        accepted: true,
        tier: "pending".to_string(),
        text_preview: receipt.ack.text_preview,
    }))
}

/// Forget the conversation history.
#[utoipa::path(
    post,
    path = "/conversation/clear",
    responses(
        (status = 200, description = "History cleared", body = ClearResponse)
    )
)]
pub async fn clear_conversation(State(state): State<Arc<AppState>>) -> Json<ClearResponse> {
    state.ingress.clear_history();
    Json(ClearResponse {
        ok: true,
        message: "history cleared".to_string(),
    })
}

/// Report breaker, history and gate state.
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Service status", body = StatusResponse)
    )
)]
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let breaker = state.body_client.breaker_snapshot();
    let dispatcher = state.ingress.dispatcher();
    Json(StatusResponse {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        breaker: BreakerStatus {
            state: breaker.state.to_string(),
            active_endpoint: breaker.active_endpoint,
            failures: breaker.failures,
        },
        reflexes: dispatcher.reflexes().len(),
        conversation_length: dispatcher.conversation().len(),
        uptime_s: state.started_at.elapsed().as_secs(),
        busy: state.ingress.is_busy(),
    })
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("no such route".to_string())
}
