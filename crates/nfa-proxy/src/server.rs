//! Axum HTTP server for the chat front.
//!
//! This module provides the router and the `serve()` function that runs it
//! on a pre-bound `TcpListener` until cancelled.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use nfa_core::{MarketplacePort, ModelResolver, SessionStore, UpstreamChatRequest};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::HttpError;
use crate::forward::{SESSION_ID_HEADER, forward_chat};
use crate::models::{ChatCompletionRequest, HealthResponse};
use crate::passthrough::Passthrough;

/// Shared application state.
#[derive(Clone)]
pub struct ProxyState {
    marketplace: Arc<dyn MarketplacePort>,
    resolver: Arc<ModelResolver>,
    sessions: Arc<SessionStore>,
    passthrough: Passthrough,
}

impl ProxyState {
    /// Build state around a marketplace port and a session store.
    ///
    /// The model resolver and its cache are owned by the state.
    pub fn new(
        marketplace: Arc<dyn MarketplacePort>,
        sessions: Arc<SessionStore>,
        passthrough: Passthrough,
    ) -> Self {
        Self {
            resolver: Arc::new(ModelResolver::new(Arc::clone(&marketplace))),
            marketplace,
            sessions,
            passthrough,
        }
    }

    pub const fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub const fn resolver(&self) -> &Arc<ModelResolver> {
        &self.resolver
    }
}

/// Build the router.
pub fn create_router(state: ProxyState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/blockchain/models", get(passthrough))
        .route(
            "/blockchain/models/*rest",
            get(passthrough).post(passthrough).delete(passthrough),
        )
        .with_state(state)
}

/// Start the proxy server with a pre-bound listener.
///
/// Runs until `cancel` is triggered, then drains in-flight connections.
pub async fn serve(
    listener: TcpListener,
    state: ProxyState,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = create_router(state);

    info!("Proxy listening on {addr}");
    info!("Point OpenAI clients at: http://{addr}/v1");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Proxy server shut down");
    Ok(())
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse::healthy())
}

/// Resolve, reuse or open a session, then stream the completion.
async fn chat_completions(
    State(state): State<ProxyState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    let request: ChatCompletionRequest = serde_json::from_slice(&body)
        .map_err(|e| HttpError::InvalidRequest(format!("Invalid request body: {e}")))?;
    if request.messages.is_empty() {
        return Err(HttpError::InvalidRequest(
            "Messages array cannot be empty".to_string(),
        ));
    }

    info!(
        model = %request.model,
        messages = request.messages.len(),
        requested_stream = request.stream,
        "Processing chat completion request"
    );

    let inbound_session = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let cached = match inbound_session {
        Some(token) => state.sessions.lookup_token(token).await,
        None => None,
    };

    let session_id = if let Some(cached) = cached {
        debug!(session_id = %cached.session_id, model_id = %cached.model_id, "Reusing cached session");
        cached.session_id
    } else {
        if let Some(token) = inbound_session {
            debug!(session_id = token, "Session not found or expired");
        }
        let model_id = state.resolver.validate_handle(&request.model).await?;
        let session = state
            .sessions
            .ensure_session(&model_id, request.stake_amount.as_deref())
            .await?;
        session.session_id
    };

    let upstream = UpstreamChatRequest::streaming(request.model, request.messages);
    forward_chat(Arc::clone(&state.marketplace), &upstream, &session_id).await
}

/// Forward `/blockchain/models` routes to the marketplace.
async fn passthrough(
    State(state): State<ProxyState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    state.passthrough.forward(method, &uri, &headers, body).await
}
