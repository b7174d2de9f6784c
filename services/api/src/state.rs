//! Shared Application State

use std::sync::Arc;
use std::time::Instant;
use triage_core::body::BodyClient;
use triage_core::ingress::Ingress;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub ingress: Ingress,
    /// Concrete client, kept for breaker status reporting.
    pub body_client: Arc<BodyClient>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(ingress: Ingress, body_client: Arc<BodyClient>) -> Self {
        Self {
            ingress,
            body_client,
            started_at: Instant::now(),
        }
    }
}
