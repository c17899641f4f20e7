//! Route identifier parsing and route resolution.
//!
//! Callers address an upstream with `provider:model` in the `model` field.
//! Only the first `:` separates the two halves; model names may contain
//! further colons (`openrouter:glm-4.5:thinking`).

use crate::core::config::{GatewayConfig, ModelRecord, ProviderRecord};
use crate::core::{AppError, Result};
use std::fmt;

/// A parsed `provider:model` pair borrowing from the caller's string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteIdentifier<'a> {
    pub provider: &'a str,
    pub model: &'a str,
}

impl<'a> RouteIdentifier<'a> {
    /// Split on the first `:`. A string without one is rejected.
    pub fn parse(raw: &'a str) -> Result<Self> {
        raw.split_once(':')
            .map(|(provider, model)| RouteIdentifier { provider, model })
            .ok_or_else(|| AppError::InvalidRoute(raw.to_string()))
    }
}

impl fmt::Display for RouteIdentifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

/// Provider and model records a route resolved to.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRoute<'c> {
    pub provider_name: &'c str,
    pub provider: &'c ProviderRecord,
    pub model: &'c ModelRecord,
    /// Upstream model name, guaranteed non-empty
    pub identifier: &'c str,
}

/// Resolve a route against the configuration.
///
/// Checks run in order and fail closed: provider, then model within the
/// provider's namespace, then a non-empty identifier.
pub fn resolve_route<'c>(
    config: &'c GatewayConfig,
    route: &RouteIdentifier<'_>,
) -> Result<ResolvedRoute<'c>> {
    let (provider_name, provider) = config
        .oai
        .providers
        .get_key_value(route.provider)
        .ok_or_else(|| AppError::ProviderNotFound(route.provider.to_string()))?;

    let model = config
        .model(route.provider, route.model)
        .ok_or_else(|| AppError::ModelNotFound {
            provider: route.provider.to_string(),
            model: route.model.to_string(),
        })?;

    let identifier = model
        .identifier
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::IdentifierMissing(route.model.to_string()))?;

    Ok(ResolvedRoute {
        provider_name,
        provider,
        model,
        identifier,
    })
}
