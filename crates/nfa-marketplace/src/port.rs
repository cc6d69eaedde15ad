//! Port trait implementation for `MarketplaceClient`.

use async_trait::async_trait;
use nfa_core::{
    ByteStream, MarketplaceError, MarketplacePort, ModelRecord, SessionGrant, UpstreamChatRequest,
};

use crate::client::MarketplaceClient;
use crate::error::ClientError;

/// Convert internal `ClientError` to core `MarketplaceError`.
fn map_error(err: ClientError) -> MarketplaceError {
    match err {
        ClientError::Unauthorized(message) => MarketplaceError::Unauthorized(message),
        ClientError::BadRequest(message) => MarketplaceError::Rejected(message),
        ClientError::Exhausted {
            operation,
            attempts,
            last,
        } => MarketplaceError::RetriesExhausted {
            operation,
            attempts,
            last,
        },
        ClientError::TimedOut {
            operation,
            attempts,
        } => MarketplaceError::TimedOut {
            operation,
            attempts,
        },
        ClientError::ChatStatus { status, body } => MarketplaceError::ChatRejected { status, body },
        ClientError::Decode { .. } => MarketplaceError::InvalidResponse(err.to_string()),
        ClientError::Credentials(e) => MarketplaceError::Credentials(e.to_string()),
        ClientError::Network(e) => MarketplaceError::Network(e.to_string()),
        ClientError::InvalidUrl(_) | ClientError::InvalidBaseUrl(_) => {
            MarketplaceError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl MarketplacePort for MarketplaceClient {
    async fn list_models(&self) -> Result<Vec<ModelRecord>, MarketplaceError> {
        self.fetch_models().await.map_err(map_error)
    }

    async fn open_session(
        &self,
        model_id: &str,
        stake: Option<&str>,
    ) -> Result<SessionGrant, MarketplaceError> {
        self.create_session(model_id, stake).await.map_err(map_error)
    }

    async fn stream_chat(
        &self,
        request: &UpstreamChatRequest,
        session_id: &str,
    ) -> Result<ByteStream, MarketplaceError> {
        self.send_chat(request, session_id).await.map_err(map_error)
    }
}
