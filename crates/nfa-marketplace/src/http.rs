//! Request execution with linear-backoff retries.
//!
//! Transport errors, 503 and any other unexpected status are retried.
//! 401 and 400 are final. After attempt `n` fails the loop sleeps
//! `n * delay` before trying again.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub(crate) max_attempts: u8,
    pub(crate) delay: Duration,
}

impl RetryPolicy {
    /// Sleep after a failed `attempt` (1-based).
    fn backoff(&self, attempt: u8) -> Duration {
        self.delay.saturating_mul(u32::from(attempt))
    }
}

/// Error body shape used by the marketplace: `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Pull a human-readable message out of an error body.
pub(crate) fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .map_or_else(|_| String::from_utf8_lossy(body).into_owned(), |e| e.error)
}

/// Send the request produced by `build` until it succeeds or the policy
/// gives up. Returns the body of the first 2xx response.
pub(crate) async fn send_with_retry<F>(
    operation: &'static str,
    policy: RetryPolicy,
    build: F,
) -> ClientResult<Bytes>
where
    F: Fn() -> RequestBuilder,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last = String::from("no attempt made");

    for attempt in 1..=max_attempts {
        debug!(operation, attempt, max_attempts, "Sending request");

        match build().send().await {
            Ok(response) => {
                let status = response.status();
                match response.bytes().await {
                    Ok(body) if status.is_success() => return Ok(body),
                    Ok(body) if status == StatusCode::UNAUTHORIZED => {
                        return Err(ClientError::Unauthorized(error_message(&body)));
                    }
                    Ok(body) if status == StatusCode::BAD_REQUEST => {
                        return Err(ClientError::BadRequest(error_message(&body)));
                    }
                    Ok(body) => {
                        last = format!("status {}: {}", status.as_u16(), error_message(&body));
                        warn!(operation, attempt, status = status.as_u16(), "Retryable status");
                    }
                    Err(e) => {
                        last = format!("failed to read response body: {e}");
                        warn!(operation, attempt, error = %e, "Failed to read response body");
                    }
                }
            }
            Err(e) => {
                warn!(operation, attempt, error = %e, "Request failed");
                if attempt == max_attempts && e.is_timeout() {
                    return Err(ClientError::TimedOut {
                        operation,
                        attempts: attempt,
                    });
                }
                last = e.to_string();
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(policy.backoff(attempt)).await;
        }
    }

    Err(ClientError::Exhausted {
        operation,
        attempts: max_attempts,
        last,
    })
}
