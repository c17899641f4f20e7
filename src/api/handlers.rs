//! HTTP request handlers for the gateway API.
//!
//! This module contains the chat completion passthrough, the route listing
//! and the operational endpoints (health, metrics).

use crate::api::disconnect::RelayContext;
use crate::api::models::{HealthResponse, ModelList};
use crate::api::streaming::relay_response;
use crate::api::upstream::{open_stream, send_buffered, UpstreamContext};
use crate::core::config::{GatewayConfig, DEFAULT_UPSTREAM_TIMEOUT_SECS};
use crate::core::logging::get_request_id;
use crate::core::{AppError, Result};
use crate::services::{build_outgoing_request, resolve_route, RouteIdentifier};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
///
/// Built once at startup and handed to every handler; nothing in it is
/// mutated after construction.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub tokens: Arc<HashSet<String>>,
    pub http_client: reqwest::Client,
    pub upstream_timeout: Duration,
}

impl AppState {
    pub fn new(config: GatewayConfig, http_client: reqwest::Client) -> Self {
        let tokens = Arc::new(config.token_set());
        Self {
            config: Arc::new(config),
            tokens,
            http_client,
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }
}

/// Parse the inbound body; only a JSON object is accepted.
fn parse_body(body: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::InvalidRequestBody(
            "request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(AppError::InvalidRequestBody(e.to_string())),
    }
}

/// Handle chat completion requests.
///
/// Validation (body, route, resolution) completes before any upstream call.
/// Streaming requests are relayed verbatim once upstream answers 2xx;
/// buffered requests return the upstream JSON payload.
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let request_id = get_request_id();

    let payload = parse_body(&body).inspect_err(|e| {
        tracing::warn!(request_id = %request_id, error = %e, "Rejected request body");
    })?;

    // Anything but a string is treated as "" and fails route parsing.
    let raw_model = payload
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let config: &GatewayConfig = &state.config;
    let resolved = RouteIdentifier::parse(&raw_model)
        .and_then(|route| resolve_route(config, &route))
        .inspect_err(|e| {
            tracing::warn!(
                request_id = %request_id,
                model = %raw_model,
                error = %e,
                "Route resolution failed"
            );
        })?;

    let outgoing = build_outgoing_request(&headers, payload, &resolved);

    tracing::info!(
        request_id = %request_id,
        route = %raw_model,
        url = %outgoing.url,
        identifier = %resolved.identifier,
        stream = outgoing.stream,
        "Forwarding chat completion"
    );
    tracing::debug!(
        request_id = %request_id,
        headers = ?outgoing.redacted_headers(),
        "Outgoing headers"
    );

    let ctx = UpstreamContext {
        provider: resolved.provider_name,
        model: resolved.identifier,
        request_id: &request_id,
    };

    if outgoing.stream {
        let upstream =
            open_stream(&state.http_client, &outgoing, state.upstream_timeout, ctx).await?;
        relay_response(
            upstream,
            RelayContext {
                request_id: request_id.clone(),
                provider: resolved.provider_name.to_string(),
                model: resolved.identifier.to_string(),
            },
            state.upstream_timeout,
        )
    } else {
        let payload =
            send_buffered(&state.http_client, &outgoing, state.upstream_timeout, ctx).await?;
        Ok(Json(payload).into_response())
    }
}

/// List every configured `provider:model` route.
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelList> {
    let ids = state.config.route_ids();
    tracing::debug!(
        request_id = %get_request_id(),
        count = ids.len(),
        "Listing configured routes"
    );
    Json(ModelList::from_ids(ids))
}

/// Liveness probe.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Prometheus text exposition.
pub async fn metrics_handler() -> Result<Response> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(buffer.into())
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_body_accepts_object() {
        let map = parse_body(br#"{"model": "p:m", "stream": true}"#).unwrap();
        assert_eq!(map["model"], "p:m");
    }

    #[test]
    fn test_parse_body_rejects_invalid_json() {
        assert_matches!(parse_body(b"{not json"), Err(AppError::InvalidRequestBody(_)));
        assert_matches!(parse_body(b""), Err(AppError::InvalidRequestBody(_)));
    }

    #[test]
    fn test_parse_body_rejects_non_objects() {
        assert_matches!(parse_body(b"[1, 2]"), Err(AppError::InvalidRequestBody(_)));
        assert_matches!(parse_body(b"\"p:m\""), Err(AppError::InvalidRequestBody(_)));
        assert_matches!(parse_body(b"null"), Err(AppError::InvalidRequestBody(_)));
    }

    #[test]
    fn test_state_uses_default_timeout() {
        let config = GatewayConfig::from_yaml_str("auth:\n  tokens: [sk-a, sk-b]\n").unwrap();
        let state = AppState::new(config, reqwest::Client::new());
        assert_eq!(
            state.upstream_timeout,
            Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS)
        );
        assert!(state.tokens.contains("sk-a"));

        let state = state.with_upstream_timeout(Duration::from_millis(10));
        assert_eq!(state.upstream_timeout, Duration::from_millis(10));
    }
}
