//! Axum Router Configuration
//!
//! Routes for the ingress surface plus the OpenAPI documentation.

use crate::{
    handlers,
    models::{
        BreakerStatus, ClearResponse, ErrorResponse, HealthResponse, PushPayload, PushResponse,
        StatusResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::push_voice,
        handlers::clear_conversation,
        handlers::get_status,
        handlers::health,
    ),
    components(
        schemas(PushPayload, PushResponse, ClearResponse, StatusResponse, BreakerStatus, HealthResponse, ErrorResponse)
    ),
    tags(
        (name = "Triage API", description = "Voice command ingress for the robot body")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/voice/push", post(handlers::push_voice))
        .route("/conversation/clear", post(handlers::clear_conversation))
        .route("/status", get(handlers::get_status))
        .route("/health", get(handlers::health))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
        .fallback(handlers::not_found)
}
