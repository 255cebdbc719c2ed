//! Search error types

use std::time::Duration;
use thiserror::Error;

use crate::transport::{TransportError, is_retryable_status};

/// Errors that can occur while querying the search service
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Search API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Search network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid search response: {0}")]
    InvalidResponse(String),

    #[error("Search configuration error: {0}")]
    Config(String),
}

impl SearchError {
    /// True when a later run could succeed without changing anything
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::RateLimited { .. } => true,
            SearchError::ApiError { status, .. } => is_retryable_status(*status),
            SearchError::Network(_) => true,
            SearchError::InvalidResponse(_) | SearchError::Config(_) => false,
        }
    }
}

impl From<TransportError> for SearchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::RateLimited { retry_after } => SearchError::RateLimited { retry_after },
            TransportError::Status { status, message } => SearchError::ApiError { status, message },
            TransportError::Network(e) => SearchError::Network(e),
        }
    }
}
