//! Outgoing request assembly.
//!
//! Merges the caller's headers and body with provider/model overrides and
//! the provider credential. Pure function of its inputs: nothing here does
//! I/O.
//!
//! Header precedence, lowest to highest (later wins, case-insensitively):
//!
//! 1. provider `extra_headers`
//! 2. model `extra_headers`
//! 3. inbound headers minus [`STRIPPED_HEADERS`]
//! 4. `accept: */*`
//! 5. `authorization: Bearer <provider api_key>`
//! 6. `content-type: application/json`
//!
//! Body precedence: model `extra_body` < inbound body < `model` forced to the
//! resolved identifier.

use crate::services::routing::ResolvedRoute;
use axum::http::HeaderMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Inbound headers never forwarded verbatim.
///
/// Identity/framing headers are regenerated for the upstream call; the rest
/// are hop-by-hop and only meaningful on the caller's connection.
pub const STRIPPED_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "authorization",
    "content-type",
    "accept",
    "accept-encoding",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Request descriptor handed to the upstream dispatcher.
#[derive(Clone, PartialEq)]
pub struct OutgoingRequest {
    pub url: String,
    /// Lower-cased header name -> value
    pub headers: BTreeMap<String, String>,
    pub body: Map<String, Value>,
    pub stream: bool,
}

impl OutgoingRequest {
    /// Headers safe to log: the upstream credential is masked.
    pub fn redacted_headers(&self) -> BTreeMap<&str, &str> {
        self.headers
            .iter()
            .map(|(k, v)| {
                if k == "authorization" {
                    (k.as_str(), "Bearer ***")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect()
    }
}

// Hand-written so the provider credential never reaches a log line.
impl fmt::Debug for OutgoingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutgoingRequest")
            .field("url", &self.url)
            .field("headers", &self.redacted_headers())
            .field("body", &self.body)
            .field("stream", &self.stream)
            .finish()
    }
}

/// Build the outgoing request for a resolved route.
pub fn build_outgoing_request(
    inbound_headers: &HeaderMap,
    inbound_body: Map<String, Value>,
    route: &ResolvedRoute<'_>,
) -> OutgoingRequest {
    let stream = stream_flag(&inbound_body);

    OutgoingRequest {
        url: upstream_url(&route.provider.base_url),
        headers: merge_headers(inbound_headers, route),
        body: merge_body(inbound_body, &route.model.extra_body, route.identifier),
        stream,
    }
}

/// `base_url` without trailing slashes + `/chat/completions`.
pub fn upstream_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), CHAT_COMPLETIONS_PATH)
}

/// `stream` from the inbound body; anything but a JSON boolean means false.
pub fn stream_flag(body: &Map<String, Value>) -> bool {
    body.get("stream").and_then(Value::as_bool).unwrap_or(false)
}

fn is_stripped(name: &str) -> bool {
    STRIPPED_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Inbound headers that survive the denylist, lower-cased.
///
/// Values that are not visible ASCII are dropped; for repeated headers the
/// last value wins.
pub fn filter_inbound_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter(|(name, _)| !is_stripped(name.as_str()))
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

fn merge_headers(inbound: &HeaderMap, route: &ResolvedRoute<'_>) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();

    let extras = route
        .provider
        .extra_headers
        .iter()
        .chain(route.model.extra_headers.iter());
    for (name, value) in extras {
        merged.insert(name.to_ascii_lowercase(), value.clone());
    }

    merged.extend(filter_inbound_headers(inbound));

    merged.insert("accept".to_string(), "*/*".to_string());
    merged.insert(
        "authorization".to_string(),
        format!("Bearer {}", route.provider.api_key),
    );
    merged.insert("content-type".to_string(), "application/json".to_string());

    merged
}

/// Overlay the inbound body on `extra_body`, then force `model`.
pub fn merge_body(
    inbound: Map<String, Value>,
    extra_body: &Map<String, Value>,
    identifier: &str,
) -> Map<String, Value> {
    let mut merged = extra_body.clone();
    merged.extend(inbound);
    merged.insert("model".to_string(), Value::String(identifier.to_string()));
    merged
}
