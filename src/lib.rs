//! Open Gateway - an OpenAI-compatible chat completion gateway
//!
//! Callers address an upstream with a `provider:model` string in the
//! `model` field. The gateway resolves it against a static YAML routing
//! document, rewrites headers and body, and forwards the call:
//!
//! - **Route Resolution**: provider and model lookup with fail-fast validation
//! - **Request Rewriting**: layered header/body overrides plus the provider credential
//! - **Streaming Support**: verbatim Server-Sent Events passthrough
//! - **Metrics & Monitoring**: Prometheus metrics for observability
//! - **Authentication**: bearer tokens from the configuration file
//!
//! # Architecture
//!
//! The codebase is organized into three main layers:
//!
//! - [`core`]: Core functionality (config, errors, logging, metrics, middleware)
//! - [`api`]: HTTP handlers, upstream dispatch and the streaming relay
//! - [`services`]: Business logic (route resolution, request rewriting)
//!
//! # Configuration
//!
//! Bootstrap flags (each with an environment fallback):
//! - `--config` / `CONFIG_PATH`: YAML routing document (default: config.yaml)
//! - `--host` / `HOST`: Server bind address (default: 0.0.0.0)
//! - `--port` / `PORT`: Server port (default: 4283)
//! - `--log-level` / `LOG_LEVEL`: Default log level (default: info)

pub mod api;
pub mod core;
pub mod services;

// Re-export commonly used types for convenience
pub use api::{gateway_router, AppState};
pub use core::{AppError, GatewayConfig, Result, ServerArgs};
pub use services::{OutgoingRequest, ResolvedRoute, RouteIdentifier};
