//! Internal error types for marketplace operations.
//!
//! These errors are mapped to [`nfa_core::MarketplaceError`] at the port
//! boundary.

use thiserror::Error;

use crate::credentials::CredentialsError;

/// Result type alias for marketplace client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised by [`MarketplaceClient`](crate::MarketplaceClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Upstream answered 401.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Upstream answered 400.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// All attempts failed with retryable conditions.
    #[error("{operation} failed after {attempts} attempts, last error: {last}")]
    Exhausted {
        operation: &'static str,
        attempts: u8,
        last: String,
    },

    /// The final attempt timed out.
    #[error("{operation} timed out after {attempts} attempts")]
    TimedOut {
        operation: &'static str,
        attempts: u8,
    },

    /// Chat endpoint answered with a non-success status.
    #[error("chat request failed with status {status}: {body}")]
    ChatStatus { status: u16, body: String },

    /// Response body could not be decoded.
    #[error("failed to decode {context}: {message}")]
    Decode {
        context: &'static str,
        message: String,
    },

    #[error("failed to set auth: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Base URL cannot carry path segments (e.g. `mailto:`).
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message_names_attempts_and_cause() {
        let error = ClientError::Exhausted {
            operation: "session creation",
            attempts: 3,
            last: "status 503: service unavailable".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("after 3 attempts"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn test_credentials_error_message() {
        let error = ClientError::from(CredentialsError::NotFound);
        assert_eq!(
            error.to_string(),
            "failed to set auth: no credentials found in cookie file or environment"
        );
    }
}
