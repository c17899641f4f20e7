//! Route table for the gateway.

use crate::api::handlers::{
    chat_completions, health_handler, list_models, metrics_handler, AppState,
};
use crate::core::middleware::{bearer_auth_middleware, request_id_middleware, MetricsMiddleware};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Largest inbound body accepted (chat histories with inline images get big).
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Build the full router.
///
/// `/models` and `/chat/completions` (plus their `/v1` aliases) require a
/// configured bearer token; `/health` and `/metrics` do not.
pub fn gateway_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/models", get(list_models))
        .route("/v1/models", get(list_models))
        .route("/chat/completions", post(chat_completions))
        .route("/v1/chat/completions", post(chat_completions))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_middleware,
        ));

    Router::new()
        .merge(api_routes)
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(axum::middleware::from_fn(MetricsMiddleware::track_metrics))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
