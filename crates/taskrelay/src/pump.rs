//! Byte relay from an upstream body to a downstream sink.
//!
//! The pump is a transparent relay, not an SSE parser: chunks are forwarded in
//! the order and with the bytes they arrived, whatever their boundaries. It
//! alternates strictly between one read and one write, so it never holds more
//! than a single chunk.

use std::fmt;
use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Why a pump run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The source reached end-of-stream.
    Completed,
    /// Reading the source failed mid-stream.
    SourceError,
    /// The sink went away (client disconnected).
    SinkError,
    /// The server is shutting down and ended the relay itself.
    Shutdown,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::SourceError => "source_error",
            Self::SinkError => "sink_error",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The downstream side of a pump has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Downstream half of a relay.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    /// Write one chunk. An error means the peer is gone for good.
    async fn send(&mut self, chunk: Bytes) -> Result<(), SinkClosed>;

    /// Resolves once the peer is gone, without a write being attempted.
    ///
    /// Sinks that can only detect disconnection on write never resolve.
    async fn closed(&self) {
        std::future::pending::<()>().await
    }

    /// Tell the peer the stream ended abnormally.
    async fn abort(&mut self, _reason: String) {}
}

/// Relay `source` into `sink` until one side ends.
///
/// `source` is consumed: whatever the outcome, the upstream is dropped, and
/// with it its connection, before this returns.
pub async fn pump<S, E, K>(source: S, sink: &mut K) -> Termination
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: std::error::Error + Send + 'static,
    K: ChunkSink + ?Sized,
{
    futures::pin_mut!(source);
    let mut chunks: u64 = 0;
    let mut bytes: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            _ = sink.closed() => {
                debug!(chunks, bytes, "Sink closed while waiting on source");
                return Termination::SinkError;
            }
            next = source.next() => next,
        };

        match next {
            None => {
                debug!(chunks, bytes, "Source finished");
                return Termination::Completed;
            }
            Some(Err(e)) => {
                let reason = crate::backend::error_chain(&e);
                warn!(chunks, bytes, "Source read failed: {}", reason);
                sink.abort(reason).await;
                return Termination::SourceError;
            }
            Some(Ok(chunk)) => {
                if chunk.is_empty() {
                    continue;
                }
                let len = chunk.len() as u64;
                if sink.send(chunk).await.is_err() {
                    debug!(chunks, bytes, "Sink write failed");
                    return Termination::SinkError;
                }
                chunks += 1;
                bytes += len;
                trace!(len, "Relayed chunk");
            }
        }
    }
}

/// Frames carried to an HTTP response body.
pub type BodyFrame = Result<Bytes, io::Error>;

/// Sink backed by a bounded channel whose receiver feeds a response body.
///
/// With capacity 1 a chunk is in the channel or being written, never both
/// queued, so the client's pace throttles upstream reads.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<BodyFrame>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<BodyFrame>) -> Self {
        Self { tx }
    }

    /// A sink and the receiver for the response body, with room for one chunk.
    pub fn pair() -> (Self, mpsc::Receiver<BodyFrame>) {
        let (tx, rx) = mpsc::channel(1);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl ChunkSink for ChannelSink {
    async fn send(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
        self.tx.send(Ok(chunk)).await.map_err(|_| SinkClosed)
    }

    async fn closed(&self) {
        self.tx.closed().await
    }

    async fn abort(&mut self, reason: String) {
        // An error frame makes the server cut the body short instead of
        // finishing it cleanly. Nothing is written to the client's stream.
        let _ = self.tx.send(Err(io::Error::other(reason))).await;
    }
}
