//! Error types and handling for the gateway.
//!
//! Every component returns [`Result`]; the mapping from [`AppError`] to an
//! HTTP status and body happens only in the [`IntoResponse`] implementation.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const ERROR_TYPE_API: &str = "api_error";
pub const ERROR_TYPE_INVALID_REQUEST: &str = "invalid_request_error";
pub const ERROR_TYPE_NOT_FOUND: &str = "not_found_error";
pub const ERROR_TYPE_AUTHENTICATION: &str = "authentication_error";

const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Inbound body is not a JSON object
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    /// `model` field is not of the form `provider:model`
    #[error("Model must be in format {{provider_name}}:{{model_name}}, got '{0}'")]
    InvalidRoute(String),

    #[error("Provider {0} not found")]
    ProviderNotFound(String),

    #[error("Model {model} not found for provider {provider}")]
    ModelNotFound { provider: String, model: String },

    #[error("Identifier not found for model {0}")]
    IdentifierMissing(String),

    /// Bearer token absent or not in the configured set
    #[error("Invalid authentication credentials")]
    Unauthorized,

    /// Upstream answered with a non-2xx status
    #[error("Provider error: {body}")]
    Upstream { status: u16, body: String },

    /// Connect refused, timeout, reset or undecodable upstream payload
    #[error("Upstream transport error: {0}")]
    Transport(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidRequestBody(_) => "invalid_request_body",
            AppError::InvalidRoute(_) => "invalid_route",
            AppError::ProviderNotFound(_) => "provider_not_found",
            AppError::ModelNotFound { .. } => "model_not_found",
            AppError::IdentifierMissing(_) => "identifier_missing",
            AppError::Unauthorized => "auth_invalid",
            AppError::Upstream { .. } => "upstream_error",
            AppError::Transport(_) => "transport_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequestBody(_) | AppError::InvalidRoute(_) => StatusCode::BAD_REQUEST,
            AppError::ProviderNotFound(_)
            | AppError::ModelNotFound { .. }
            | AppError::IdentifierMissing(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Transport(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::InvalidRequestBody(_) | AppError::InvalidRoute(_) => {
                ERROR_TYPE_INVALID_REQUEST
            }
            AppError::ProviderNotFound(_)
            | AppError::ModelNotFound { .. }
            | AppError::IdentifierMissing(_) => ERROR_TYPE_NOT_FOUND,
            AppError::Unauthorized => ERROR_TYPE_AUTHENTICATION,
            AppError::Upstream { .. } | AppError::Transport(_) | AppError::Internal(_) => {
                ERROR_TYPE_API
            }
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        let cause = if e.is_timeout() {
            format!("timeout: {}", e)
        } else if e.is_connect() {
            format!("connect: {}", e)
        } else {
            e.to_string()
        };
        AppError::Transport(cause)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal causes are logged, never exposed to the caller.
        let message = match &self {
            AppError::Transport(cause) | AppError::Internal(cause) => {
                tracing::error!(kind = self.kind(), cause = %cause, "Request failed");
                GENERIC_INTERNAL_MESSAGE.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": self.error_type(),
                "code": status.as_u16()
            }
        }));

        let mut response = (status, body).into_response();
        if matches!(self, AppError::Unauthorized) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Convenience type alias for Results using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
