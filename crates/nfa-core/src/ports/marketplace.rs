//! Marketplace port for model listing, session creation and chat streaming.
//!
//! The live implementation lives in `nfa-marketplace`. A canned
//! implementation for tests is available behind the `test-utils` feature.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use thiserror::Error;

use crate::domain::{ModelRecord, SessionGrant, UpstreamChatRequest};

/// Raw upstream body, yielded chunk by chunk as it arrives.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Errors surfaced by marketplace operations.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// The marketplace rejected our credentials (HTTP 401). Not retried.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The marketplace rejected the request (HTTP 400). Not retried.
    #[error("bad request: {0}")]
    Rejected(String),

    /// Every attempt failed with a retryable condition.
    #[error("{operation} failed after {attempts} attempts, last error: {last}")]
    RetriesExhausted {
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

    /// The consumer node refused a chat request before streaming began.
    #[error("chat request failed with status {status}: {body}")]
    ChatRejected { status: u16, body: String },

    /// Transport failure on a call that is not retried.
    #[error("network error: {0}")]
    Network(String),

    /// The marketplace answered with a body we could not decode.
    #[error("invalid response from marketplace: {0}")]
    InvalidResponse(String),

    /// No usable credentials were found.
    #[error("failed to set auth: {0}")]
    Credentials(String),
}

impl MarketplaceError {
    /// Returns true if upstream explicitly refused the request.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::Rejected(_) | Self::ChatRejected { .. }
        )
    }

    /// Number of attempts made, when the error came out of a retry loop.
    #[must_use]
    pub const fn attempts(&self) -> Option<u8> {
        match self {
            Self::RetriesExhausted { attempts, .. } | Self::TimedOut { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }
}

/// Capability interface the proxy depends on.
///
/// Implementations handle transport, authentication and retries. Callers
/// only see domain types.
#[async_trait]
pub trait MarketplacePort: Send + Sync + fmt::Debug {
    /// Fetch every model registered on the marketplace.
    async fn list_models(&self) -> Result<Vec<ModelRecord>, MarketplaceError>;

    /// Open a paid session for `model_id`.
    ///
    /// `stake` is the amount to stake in wei, when the client supplied one.
    async fn open_session(
        &self,
        model_id: &str,
        stake: Option<&str>,
    ) -> Result<SessionGrant, MarketplaceError>;

    /// Send a chat request under `session_id` and return the event stream.
    ///
    /// Resolves once upstream has answered with a success status; any other
    /// status is returned as [`MarketplaceError::ChatRejected`] with the
    /// body attached.
    async fn stream_chat(
        &self,
        request: &UpstreamChatRequest,
        session_id: &str,
    ) -> Result<ByteStream, MarketplaceError>;
}
