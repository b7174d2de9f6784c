//! Triage API Library Crate
//!
//! Configuration, application state, HTTP handlers and routing for the voice
//! ingress service. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
