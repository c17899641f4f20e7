//! API layer for the gateway.
//!
//! This module contains the HTTP handlers, bearer authentication, the
//! upstream dispatcher and the streaming relay.

pub mod auth;
pub mod disconnect;
pub mod handlers;
pub mod models;
pub mod router;
pub mod streaming;
pub mod upstream;

// Re-export commonly used types
pub use handlers::{chat_completions, health_handler, list_models, metrics_handler, AppState};
pub use models::{HealthResponse, ModelEntry, ModelList};
pub use router::gateway_router;
pub use streaming::{relay_body, relay_response};
pub use upstream::create_http_client;
