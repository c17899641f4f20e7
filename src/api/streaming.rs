//! Server-Sent Events passthrough for streamed chat completions.
//!
//! Upstream bytes are relayed verbatim and in order as they arrive: no
//! re-framing, no buffering across chunks and no model-name rewriting.

use crate::api::disconnect::{RelayContext, RelayGuard, RelayOutcome};
use crate::core::{AppError, Result};
use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures::stream::{self, Stream};
use std::fmt::Display;
use std::time::Duration;

/// Wrap an upstream byte stream into a response body.
///
/// The relay ends when upstream ends, when upstream fails, or when no
/// chunk arrives within `idle_timeout`; the last two leave the caller with
/// a truncated stream. Dropping the body releases the upstream stream.
pub fn relay_body<S, E>(upstream: S, ctx: RelayContext, idle_timeout: Duration) -> Body
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    let guard = RelayGuard::new(upstream, ctx);

    let relay = stream::unfold(guard, move |mut guard| async move {
        match tokio::time::timeout(idle_timeout, guard.next_chunk()).await {
            Ok(Some(Ok(chunk))) => {
                guard.record_chunk(chunk.len());
                Some((Ok::<Bytes, std::io::Error>(chunk), guard))
            }
            Ok(Some(Err(e))) => {
                guard.finish(RelayOutcome::UpstreamFailed(e.to_string()));
                None
            }
            Ok(None) => {
                guard.finish(RelayOutcome::Completed);
                None
            }
            Err(_) => {
                guard.finish(RelayOutcome::IdleTimeout);
                None
            }
        }
    });

    Body::from_stream(relay)
}

/// Build the caller-facing SSE response around an upstream 2xx response.
pub fn relay_response(
    upstream: reqwest::Response,
    ctx: RelayContext,
    idle_timeout: Duration,
) -> Result<Response> {
    let body = relay_body(Box::pin(upstream.bytes_stream()), ctx, idle_timeout);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-accel-buffering", "no")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build stream response: {}", e)))
}
