//! Shared HTTP transport with retry for the LLM and search clients
//!
//! Both services speak JSON over POST and fail the same ways, so the retry
//! loop lives here once. Callers map [`TransportError`] into their own error
//! type with a `From` impl.

use std::time::Duration;

use reqwest::{Client, Response};
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of retries for transient errors
pub const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Failures left over once the retry budget is spent
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Check if an HTTP status code is retryable
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// How many times to retry and how long to wait between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the given attempt (attempt 0 never waits)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.initial_backoff.saturating_mul(2u32.saturating_pow(attempt - 1))
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// POST a JSON body with the default retry policy
pub async fn post_json(
    http: &Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
) -> Result<Response, TransportError> {
    post_json_with(http, url, bearer, body, &RetryPolicy::default()).await
}

/// POST a JSON body, retrying transient failures with exponential backoff
///
/// Network errors, 408, 429 and 5xx are retried. A 429 waits for the
/// longer of the server's `retry-after` hint and the backoff. Any other
/// non-success status is returned at once.
pub async fn post_json_with(
    http: &Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    policy: &RetryPolicy,
) -> Result<Response, TransportError> {
    debug!(%url, has_bearer = bearer.is_some(), max_retries = policy.max_retries, "post_json_with: called");

    let mut attempt = 0;
    loop {
        let mut builder = http.post(url).header("content-type", "application/json").json(body);
        if let Some(token) = bearer {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let (error, hint) = match builder.send().await {
            Err(e) => {
                debug!(attempt, error = %e, timed_out = e.is_timeout(), "post_json_with: network error");
                (TransportError::Network(e), None)
            }
            Ok(response) if response.status().is_success() => {
                debug!(attempt, "post_json_with: success");
                return Ok(response);
            }
            Ok(response) => {
                let status = response.status().as_u16();
                if status == 429 {
                    let hint = parse_retry_after(&response);
                    debug!(attempt, ?hint, "post_json_with: rate limited (429)");
                    let retry_after = hint.unwrap_or_else(|| policy.backoff_delay(attempt + 1));
                    (TransportError::RateLimited { retry_after }, hint)
                } else {
                    let message = response.text().await.unwrap_or_default();
                    if !is_retryable_status(status) {
                        debug!(status, "post_json_with: API error");
                        return Err(TransportError::Status { status, message });
                    }
                    debug!(attempt, status, "post_json_with: retryable error");
                    (TransportError::Status { status, message }, None)
                }
            }
        };

        if attempt >= policy.max_retries {
            warn!(attempts = attempt + 1, error = %error, "post_json_with: retries exhausted");
            return Err(error);
        }

        attempt += 1;
        let wait = hint.map_or(policy.backoff_delay(attempt), |h| h.max(policy.backoff_delay(attempt)));
        warn!(
            attempt,
            wait_ms = wait.as_millis() as u64,
            error = %error,
            "post_json_with: retrying after transient error"
        );
        tokio::time::sleep(wait).await;
    }
}
