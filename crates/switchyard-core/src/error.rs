//! Error types for Switchyard Core

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Provider rejected the credentials. Permanent until restart.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(
        "Rate limit exceeded{}",
        retry_after.map(|d| format!(": retry after {}s", d.as_secs())).unwrap_or_default()
    )]
    RateLimited { retry_after: Option<Duration> },

    /// Generic transient model failure (network error, 5xx, malformed response)
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Streaming is not supported by provider '{0}'")]
    StreamingNotSupported(String),

    // Routing errors
    #[error("No healthy models available")]
    NoHealthyModels,

    #[error("All models are unavailable in router '{router_id}'")]
    AllModelsUnavailable { router_id: String },

    #[error("No models configured for router '{0}'")]
    NoModelsConfigured(String),

    #[error("Router not found: {0}")]
    RouterNotFound(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable code for this error, used by the HTTP layer and in stream error events
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Unauthorized(_) => ErrorCode::Unauthorized,
            Error::RateLimited { .. } => ErrorCode::RateLimited,
            Error::Provider(_) | Error::Timeout(_) | Error::StreamingNotSupported(_) => {
                ErrorCode::ModelUnavailable
            }
            Error::NoHealthyModels => ErrorCode::NoHealthyModels,
            Error::AllModelsUnavailable { .. } => ErrorCode::AllModelsUnavailable,
            Error::NoModelsConfigured(_) => ErrorCode::NoModelConfigured,
            Error::RouterNotFound(_) => ErrorCode::RouterNotFound,
            Error::Config(_)
            | Error::ConfigValidation(_)
            | Error::Serialization(_)
            | Error::Io(_)
            | Error::Internal(_) => ErrorCode::UnknownError,
        }
    }

    /// Whether this error was raised by a single model call (as opposed to the router itself)
    pub fn is_model_error(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized(_)
                | Error::RateLimited { .. }
                | Error::Provider(_)
                | Error::Timeout(_)
                | Error::StreamingNotSupported(_)
        )
    }
}

/// Error codes exposed to API consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ModelUnavailable,
    AllModelsUnavailable,
    NoHealthyModels,
    NoModelConfigured,
    RouterNotFound,
    Unauthorized,
    RateLimited,
    UnknownError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ModelUnavailable => "model_unavailable",
            ErrorCode::AllModelsUnavailable => "all_models_unavailable",
            ErrorCode::NoHealthyModels => "no_healthy_models",
            ErrorCode::NoModelConfigured => "no_model_configured",
            ErrorCode::RouterNotFound => "router_not_found",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
