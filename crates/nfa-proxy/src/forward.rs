//! Chat forwarding with line-by-line SSE relay.
//!
//! The upstream body is cut at `\n` and every line, blank ones included, is
//! written to the sink as its own frame and flushed. A `data: [DONE]` line
//! is relayed, followed by the blank line that closes the event, and ends
//! the relay even if upstream keeps the connection open.

use std::io;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use nfa_core::{ByteStream, MarketplacePort, UpstreamChatRequest};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::HttpError;
use crate::sink::{ChannelSink, SinkClosed, StreamSink};

/// Header carrying the marketplace session, inbound and outbound.
pub const SESSION_ID_HEADER: &str = "session_id";

const DONE_LINE: &[u8] = b"data: [DONE]";

/// Summary of a completed relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayOutcome {
    /// `data:` lines relayed, not counting the `[DONE]` sentinel.
    pub events: usize,
    /// Whether the relay stopped on `data: [DONE]` rather than end of body.
    pub terminated_by_sentinel: bool,
}

/// Why a relay stopped early.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream stream failed: {0}")]
    Upstream(#[source] io::Error),

    #[error(transparent)]
    ClientGone(#[from] SinkClosed),
}

/// Copy `upstream` into `sink` line by line.
///
/// On an upstream read error the sink is aborted. When the sink reports the
/// caller gone the relay returns immediately and `upstream` is dropped.
pub async fn relay_event_stream<S: StreamSink>(
    mut upstream: ByteStream,
    sink: &mut S,
) -> Result<RelayOutcome, RelayError> {
    let mut buffer = BytesMut::new();
    let mut outcome = RelayOutcome::default();

    while let Some(next) = upstream.next().await {
        let chunk = match next {
            Ok(chunk) => chunk,
            Err(e) => {
                sink.abort(e.to_string()).await;
                return Err(RelayError::Upstream(e));
            }
        };
        buffer.extend_from_slice(&chunk);

        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line = buffer.split_to(pos + 1).freeze();
            if relay_line(line, sink, &mut outcome).await? {
                sink.write_chunk(Bytes::from_static(b"\n")).await?;
                sink.flush().await?;
                sink.finish().await;
                return Ok(outcome);
            }
        }
    }

    // Trailing bytes without a final newline.
    if !buffer.is_empty() {
        relay_line(buffer.split().freeze(), sink, &mut outcome).await?;
    }
    sink.finish().await;
    Ok(outcome)
}

/// Relay one line. Returns true if it was the `[DONE]` sentinel.
async fn relay_line<S: StreamSink>(
    line: Bytes,
    sink: &mut S,
    outcome: &mut RelayOutcome,
) -> Result<bool, SinkClosed> {
    let content = trim_line_end(&line);
    let is_done = content == DONE_LINE;
    if !is_done && content.starts_with(b"data:") {
        outcome.events += 1;
    }

    sink.write_chunk(line).await?;
    sink.flush().await?;

    if is_done {
        outcome.terminated_by_sentinel = true;
    }
    Ok(is_done)
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Send `request` upstream and stream the answer back as SSE.
///
/// Errors before the first byte is relayed become [`HttpError`]s. After
/// that the relay runs in its own task and only logs.
pub async fn forward_chat(
    marketplace: Arc<dyn MarketplacePort>,
    request: &UpstreamChatRequest,
    session_id: &str,
) -> Result<Response, HttpError> {
    let upstream = marketplace.stream_chat(request, session_id).await?;

    let (mut sink, body) = ChannelSink::new();
    let log_session = session_id.to_string();
    tokio::spawn(async move {
        match relay_event_stream(upstream, &mut sink).await {
            Ok(outcome) => debug!(
                session_id = %log_session,
                events = outcome.events,
                done = outcome.terminated_by_sentinel,
                "Relay finished"
            ),
            Err(RelayError::ClientGone(_)) => {
                info!(session_id = %log_session, "Client disconnected, dropping upstream stream");
            }
            Err(e) => warn!(session_id = %log_session, error = %e, "Relay aborted"),
        }
    });

    Ok(sse_response(body, session_id))
}

fn sse_response(body: Body, session_id: &str) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache")
        .header(CONNECTION, "keep-alive");
    match HeaderValue::from_str(session_id) {
        Ok(value) => builder = builder.header(SESSION_ID_HEADER, value),
        Err(_) => warn!(session_id, "Session id is not a valid header value, not echoing it"),
    }
    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
