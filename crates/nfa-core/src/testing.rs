//! Canned [`MarketplacePort`] for tests.
//!
//! Available inside this crate's tests and to other crates through the
//! `test-utils` feature.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream;

use crate::domain::{ModelRecord, SessionGrant, UpstreamChatRequest};
use crate::ports::{ByteStream, MarketplaceError, MarketplacePort};

/// In-memory marketplace with call counters.
///
/// Session tokens are `session-1`, `session-2`, ... in creation order.
#[derive(Debug, Default)]
pub struct StaticMarketplace {
    models: Vec<ModelRecord>,
    chat_chunks: Vec<String>,
    chat_fails_mid_stream: bool,
    chat_status: Option<(u16, String)>,
    models_failure: Option<String>,
    sessions_failure: Option<String>,
    sessions_rejection: Option<String>,
    session_duration: Duration,
    list_calls: AtomicUsize,
    session_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    last_stake: Mutex<Option<String>>,
    last_chat: Mutex<Option<(UpstreamChatRequest, String)>>,
}

impl StaticMarketplace {
    pub fn new() -> Self {
        Self {
            session_duration: Duration::from_secs(3600),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: ModelRecord) -> Self {
        self.models.push(model);
        self
    }

    pub fn with_models(mut self, models: impl IntoIterator<Item = ModelRecord>) -> Self {
        self.models.extend(models);
        self
    }

    /// Raw chunks yielded by [`stream_chat`](MarketplacePort::stream_chat).
    pub fn with_chat_chunks<I, S>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chat_chunks = chunks.into_iter().map(Into::into).collect();
        self
    }

    /// SSE body with one `data:` event per payload, terminated by `[DONE]`.
    pub fn with_sse_events<I, S>(self, payloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut chunks: Vec<String> = payloads
            .into_iter()
            .map(|p| format!("data: {}\n\n", p.as_ref()))
            .collect();
        chunks.push("data: [DONE]\n\n".to_string());
        self.with_chat_chunks(chunks)
    }

    /// End the chat stream with an I/O error after the configured chunks.
    pub const fn chat_fails_mid_stream(mut self) -> Self {
        self.chat_fails_mid_stream = true;
        self
    }

    /// Refuse chat requests with `status` and `body`.
    pub fn with_chat_status(mut self, status: u16, body: impl Into<String>) -> Self {
        self.chat_status = Some((status, body.into()));
        self
    }

    /// Fail `list_models` with a network error.
    pub fn failing_models(mut self, message: impl Into<String>) -> Self {
        self.models_failure = Some(message.into());
        self
    }

    /// Fail `open_session` as if every retry had been used up.
    pub fn failing_sessions(mut self, message: impl Into<String>) -> Self {
        self.sessions_failure = Some(message.into());
        self
    }

    /// Fail `open_session` with an upstream 400.
    pub fn rejecting_sessions(mut self, message: impl Into<String>) -> Self {
        self.sessions_rejection = Some(message.into());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    /// Stake passed to the most recent `open_session`.
    pub fn last_stake(&self) -> Option<String> {
        self.last_stake
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent chat request and the session id it was sent under.
    pub fn last_chat(&self) -> Option<(UpstreamChatRequest, String)> {
        self.last_chat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MarketplacePort for StaticMarketplace {
    async fn list_models(&self) -> Result<Vec<ModelRecord>, MarketplaceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.models_failure {
            return Err(MarketplaceError::Network(message.clone()));
        }
        Ok(self.models.clone())
    }

    async fn open_session(
        &self,
        _model_id: &str,
        stake: Option<&str>,
    ) -> Result<SessionGrant, MarketplaceError> {
        let n = self.session_calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_stake.lock().unwrap_or_else(PoisonError::into_inner) =
            stake.map(str::to_string);

        if let Some(message) = &self.sessions_rejection {
            return Err(MarketplaceError::Rejected(message.clone()));
        }
        if let Some(message) = &self.sessions_failure {
            return Err(MarketplaceError::RetriesExhausted {
                operation: "session creation",
                attempts: 3,
                last: message.clone(),
            });
        }

        let ttl = chrono::Duration::from_std(self.session_duration)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        Ok(SessionGrant {
            session_token: format!("session-{n}"),
            expires_at: Utc::now() + ttl,
        })
    }

    async fn stream_chat(
        &self,
        request: &UpstreamChatRequest,
        session_id: &str,
    ) -> Result<ByteStream, MarketplaceError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_chat.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((request.clone(), session_id.to_string()));

        if let Some((status, body)) = &self.chat_status {
            return Err(MarketplaceError::ChatRejected {
                status: *status,
                body: body.clone(),
            });
        }

        let mut items: Vec<Result<Bytes, std::io::Error>> = self
            .chat_chunks
            .iter()
            .map(|chunk| Ok(Bytes::from(chunk.clone())))
            .collect();
        if self.chat_fails_mid_stream {
            items.push(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "upstream reset",
            )));
        }
        Ok(stream::iter(items).boxed())
    }
}
