//! Bearer token authentication.
//!
//! Callers authenticate with `Authorization: Bearer <token>`; the token must
//! be one of the configured `auth.tokens`.

use axum::http::HeaderMap;
use std::collections::HashSet;

use crate::core::error::Result;
use crate::core::AppError;

/// Extract Bearer token from Authorization header.
///
/// The scheme is matched case-insensitively.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
}

/// Verify that the request carries a configured bearer token.
///
/// # Returns
///
/// * `Ok(())` - token is in the configured set
/// * `Err(AppError::Unauthorized)` - header missing, malformed or unknown token
pub fn verify_bearer(headers: &HeaderMap, tokens: &HashSet<String>) -> Result<()> {
    let Some(token) = extract_bearer(headers) else {
        tracing::warn!("Missing or malformed authorization header");
        return Err(AppError::Unauthorized);
    };

    if tokens.contains(token) {
        Ok(())
    } else {
        tracing::warn!("Invalid token attempted");
        Err(AppError::Unauthorized)
    }
}
