//! Destination for relayed stream frames.
//!
//! The relay writes each upstream line through a [`StreamSink`]. Once the
//! response status has been committed an upstream failure can no longer be
//! reported as an HTTP error, so the sink offers [`abort`](StreamSink::abort)
//! to tear the connection down instead.

use std::io;

use async_trait::async_trait;
use axum::body::Body;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Frames buffered between the relay task and the response body.
const CHANNEL_CAPACITY: usize = 32;

/// The caller went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("client disconnected")]
pub struct SinkClosed;

/// Ordered, flushable output for an event stream.
#[async_trait]
pub trait StreamSink: Send {
    /// Write one frame.
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), SinkClosed>;

    /// Push buffered frames to the caller.
    async fn flush(&mut self) -> Result<(), SinkClosed>;

    /// End the stream cleanly.
    async fn finish(&mut self);

    /// Terminate the stream abnormally so the caller sees a broken response.
    async fn abort(&mut self, reason: String);
}

/// Sink feeding an axum response body through a bounded channel.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Option<mpsc::Sender<Result<Bytes, io::Error>>>,
}

impl ChannelSink {
    /// Create a sink and the body it feeds.
    pub fn new() -> (Self, Body) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let body = Body::from_stream(ReceiverStream::new(rx));
        (Self { tx: Some(tx) }, body)
    }
}

#[async_trait]
impl StreamSink for ChannelSink {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
        let tx = self.tx.as_ref().ok_or(SinkClosed)?;
        tx.send(Ok(chunk)).await.map_err(|_| SinkClosed)
    }

    async fn flush(&mut self) -> Result<(), SinkClosed> {
        // Frames are handed to the body as soon as they are written.
        match &self.tx {
            Some(tx) if !tx.is_closed() => Ok(()),
            _ => Err(SinkClosed),
        }
    }

    async fn finish(&mut self) {
        self.tx = None;
    }

    async fn abort(&mut self, reason: String) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(io::Error::other(reason))).await;
        }
    }
}

/// Sink that records frames in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct VecSink {
    pub frames: Vec<Bytes>,
    pub flushes: usize,
    pub finished: bool,
    pub aborted: Option<String>,
    /// Report the caller as gone after this many frames.
    pub close_after: Option<usize>,
}

#[cfg(test)]
impl VecSink {
    /// Concatenated frames as text.
    pub fn text(&self) -> String {
        self.frames
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl StreamSink for VecSink {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
        if self.close_after.is_some_and(|limit| self.frames.len() >= limit) {
            return Err(SinkClosed);
        }
        self.frames.push(chunk);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkClosed> {
        self.flushes += 1;
        Ok(())
    }

    async fn finish(&mut self) {
        self.finished = true;
    }

    async fn abort(&mut self, reason: String) {
        self.aborted = Some(reason);
    }
}
