//! API Models
//!
//! Request and response bodies for the ingress surface, with `utoipa`
//! schemas for the OpenAPI document.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A recognized utterance from the speech front end.
#[derive(Deserialize, ToSchema, Debug)]
pub struct PushPayload {
    #[serde(default)]
    #[schema(example = "sitz")]
    pub text: String,
}

/// Sent before dispatch starts. The tier is always `pending`.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct PushResponse {
    pub accepted: bool,
    #[schema(example = "pending")]
    pub tier: String,
    pub text_preview: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ClearResponse {
    pub ok: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct BreakerStatus {
    #[schema(example = "closed")]
    pub state: String,
    pub active_endpoint: String,
    pub failures: u32,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct StatusResponse {
    pub service: String,
    pub version: String,
    pub breaker: BreakerStatus,
    pub reflexes: usize,
    /// Stored user/assistant exchanges.
    pub conversation_length: usize,
    pub uptime_s: u64,
    /// Whether a dispatch is currently in flight.
    pub busy: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
