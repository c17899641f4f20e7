//! Upstream dispatch over the shared connection-pooled client.
//!
//! Buffered calls return the parsed JSON payload; streamed calls return the
//! live response once its status is known to be 2xx, so no byte is relayed
//! for a failed upstream call.

use crate::core::config::DEFAULT_UPSTREAM_TIMEOUT_SECS;
use crate::core::metrics::get_metrics;
use crate::core::{AppError, Result};
use crate::services::OutgoingRequest;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Labels shared by logs and metrics for one upstream call.
#[derive(Debug, Clone, Copy)]
pub struct UpstreamContext<'a> {
    pub provider: &'a str,
    /// Resolved upstream model identifier
    pub model: &'a str,
    pub request_id: &'a str,
}

/// Create the process-wide HTTP client with connection pooling.
///
/// No client-level total timeout is set: buffered and streamed calls apply
/// their own bounds per request. Redirects are never followed, so a 3xx
/// reaches the caller as an upstream error and each inbound call makes
/// exactly one upstream request.
pub fn create_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS))
        .pool_max_idle_per_host(100)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
}

/// Translate an [`OutgoingRequest`] into a reqwest builder.
pub fn build_upstream_request(
    http_client: &reqwest::Client,
    outgoing: &OutgoingRequest,
) -> reqwest::RequestBuilder {
    let mut request = http_client.post(&outgoing.url);
    for (name, value) in &outgoing.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request.json(&outgoing.body)
}

/// Single request/response round trip; the timeout covers the whole body.
pub async fn send_buffered(
    http_client: &reqwest::Client,
    outgoing: &OutgoingRequest,
    timeout: Duration,
    ctx: UpstreamContext<'_>,
) -> Result<Value> {
    let start = Instant::now();
    let response = build_upstream_request(http_client, outgoing)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| transport_failure(e, ctx))?;
    observe_latency(ctx, false, start);

    let response = ensure_success(response, timeout, ctx).await?;
    let payload = response.json::<Value>().await.map_err(|e| {
        tracing::error!(
            request_id = %ctx.request_id,
            provider = %ctx.provider,
            error = %e,
            "Failed to decode provider response"
        );
        AppError::from(e)
    })?;
    Ok(payload)
}

/// Open a streaming request and wait for a 2xx status.
///
/// The timeout bounds connection and response headers only; idle gaps in
/// the body are bounded by the relay.
pub async fn open_stream(
    http_client: &reqwest::Client,
    outgoing: &OutgoingRequest,
    timeout: Duration,
    ctx: UpstreamContext<'_>,
) -> Result<reqwest::Response> {
    let start = Instant::now();
    let response = tokio::time::timeout(timeout, build_upstream_request(http_client, outgoing).send())
        .await
        .map_err(|_| {
            record_upstream_status(ctx, "timeout");
            AppError::Transport(format!(
                "timeout: no response headers within {}s from {}",
                timeout.as_secs(),
                ctx.provider
            ))
        })?
        .map_err(|e| transport_failure(e, ctx))?;
    observe_latency(ctx, true, start);

    ensure_success(response, timeout, ctx).await
}

async fn ensure_success(
    response: reqwest::Response,
    timeout: Duration,
    ctx: UpstreamContext<'_>,
) -> Result<reqwest::Response> {
    let status = response.status();
    record_upstream_status(ctx, status.as_str());

    if status.is_success() {
        return Ok(response);
    }

    let body = tokio::time::timeout(timeout, response.text())
        .await
        .ok()
        .and_then(|text| text.ok())
        .unwrap_or_default();

    tracing::error!(
        request_id = %ctx.request_id,
        provider = %ctx.provider,
        model = %ctx.model,
        status = status.as_u16(),
        body = %body,
        "Provider error"
    );

    Err(AppError::Upstream {
        status: status.as_u16(),
        body,
    })
}

fn transport_failure(e: reqwest::Error, ctx: UpstreamContext<'_>) -> AppError {
    tracing::error!(
        request_id = %ctx.request_id,
        provider = %ctx.provider,
        model = %ctx.model,
        error = %e,
        is_timeout = e.is_timeout(),
        is_connect = e.is_connect(),
        "HTTP request failed to provider"
    );
    record_upstream_status(ctx, "transport_error");
    AppError::from(e)
}

fn record_upstream_status(ctx: UpstreamContext<'_>, status: &str) {
    get_metrics()
        .upstream_requests
        .with_label_values(&[ctx.provider, ctx.model, status])
        .inc();
}

fn observe_latency(ctx: UpstreamContext<'_>, stream: bool, start: Instant) {
    get_metrics()
        .upstream_latency
        .with_label_values(&[ctx.provider, if stream { "true" } else { "false" }])
        .observe(start.elapsed().as_secs_f64());
}
