//! Guaranteed-release wrapper around a relayed upstream stream.
//!
//! The guard owns the upstream byte stream. It is dropped exactly once on
//! every exit path (upstream end, upstream failure, idle timeout or caller
//! disconnect), which releases the upstream connection and records the
//! outcome. A guard dropped without an outcome means the caller went away.

use crate::core::metrics::get_metrics;
use futures::stream::{Stream, StreamExt};
use std::time::Instant;

/// Identifies a relay in logs.
#[derive(Debug, Clone, Default)]
pub struct RelayContext {
    pub request_id: String,
    pub provider: String,
    /// Resolved upstream model identifier
    pub model: String,
}

/// How a relay ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream closed the stream
    Completed,
    /// Transport failure after the relay started; the caller sees a truncated stream
    UpstreamFailed(String),
    /// No chunk arrived within the idle timeout
    IdleTimeout,
    /// The caller stopped consuming the response
    ClientDisconnected,
}

pub struct RelayGuard<S> {
    upstream: Option<S>,
    context: RelayContext,
    chunks: usize,
    bytes: usize,
    started: Instant,
    outcome: Option<RelayOutcome>,
}

impl<S> RelayGuard<S>
where
    S: Stream + Unpin,
{
    pub fn new(upstream: S, context: RelayContext) -> Self {
        get_metrics().active_streams.inc();
        Self {
            upstream: Some(upstream),
            context,
            chunks: 0,
            bytes: 0,
            started: Instant::now(),
            outcome: None,
        }
    }

    /// Next item from upstream; `None` once finished or released.
    pub async fn next_chunk(&mut self) -> Option<S::Item> {
        match self.upstream.as_mut() {
            Some(upstream) => upstream.next().await,
            None => None,
        }
    }

    pub fn record_chunk(&mut self, len: usize) {
        self.chunks += 1;
        self.bytes += len;
    }

    /// Record the outcome and release the upstream connection now.
    pub fn finish(&mut self, outcome: RelayOutcome) {
        self.upstream = None;
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
    }
}

impl<S> Drop for RelayGuard<S> {
    fn drop(&mut self) {
        self.upstream = None;
        let outcome = self.outcome.take().unwrap_or(RelayOutcome::ClientDisconnected);
        let metrics = get_metrics();
        metrics.active_streams.dec();

        let duration_ms = self.started.elapsed().as_millis() as u64;
        let ctx = &self.context;
        match outcome {
            RelayOutcome::Completed => tracing::info!(
                request_id = %ctx.request_id,
                provider = %ctx.provider,
                model = %ctx.model,
                chunks = self.chunks,
                bytes = self.bytes,
                duration_ms,
                "Stream relay completed"
            ),
            RelayOutcome::UpstreamFailed(error) => tracing::error!(
                request_id = %ctx.request_id,
                provider = %ctx.provider,
                model = %ctx.model,
                chunks = self.chunks,
                bytes = self.bytes,
                duration_ms,
                error = %error,
                "Upstream failed mid-stream, relay truncated"
            ),
            RelayOutcome::IdleTimeout => tracing::warn!(
                request_id = %ctx.request_id,
                provider = %ctx.provider,
                model = %ctx.model,
                chunks = self.chunks,
                bytes = self.bytes,
                duration_ms,
                "Upstream stream idle timeout, relay truncated"
            ),
            RelayOutcome::ClientDisconnected => {
                metrics.client_disconnects_total.inc();
                tracing::info!(
                    request_id = %ctx.request_id,
                    provider = %ctx.provider,
                    model = %ctx.model,
                    chunks = self.chunks,
                    bytes = self.bytes,
                    duration_ms,
                    "Client disconnected during streaming"
                );
            }
        }
    }
}
