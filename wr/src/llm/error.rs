//! LLM error types

use std::time::Duration;
use thiserror::Error;

use crate::transport::{TransportError, is_retryable_status};

/// Errors from a language model provider
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// True when a later run could succeed without changing anything
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } | LlmError::Network(_) => true,
            LlmError::ApiError { status, .. } => is_retryable_status(*status),
            LlmError::InvalidResponse(_) | LlmError::Config(_) => false,
        }
    }
}

impl From<TransportError> for LlmError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::RateLimited { retry_after } => LlmError::RateLimited { retry_after },
            TransportError::Status { status, message } => LlmError::ApiError { status, message },
            TransportError::Network(e) => LlmError::Network(e),
        }
    }
}
