//! Chat forwarding to the consumer node.

use futures_util::{StreamExt, TryStreamExt};
use nfa_core::{ByteStream, UpstreamChatRequest};
use reqwest::header::ACCEPT;
use tracing::{debug, warn};

use super::{MarketplaceClient, endpoint};
use crate::error::{ClientError, ClientResult};

/// Header carrying the marketplace session.
const SESSION_ID_HEADER: &str = "session_id";

impl MarketplaceClient {
    /// `POST {consumer}/v1/chat/completions` under `session_id`.
    ///
    /// Not retried. Resolves as soon as upstream answers 2xx and returns the
    /// body as a byte stream.
    pub async fn send_chat(
        &self,
        request: &UpstreamChatRequest,
        session_id: &str,
    ) -> ClientResult<ByteStream> {
        let url = endpoint(&self.consumer_url, &["v1", "chat", "completions"])?;
        let authorization = self.authorization().await?;

        debug!(model = %request.model, session_id, "Forwarding chat request");
        let builder = self
            .http
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .header(SESSION_ID_HEADER, session_id)
            .timeout(self.config.chat_timeout)
            .json(request);
        let response = Self::with_auth(builder, authorization.as_deref())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Chat request rejected by consumer node");
            return Err(ClientError::ChatStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed())
    }
}
