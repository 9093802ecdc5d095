//! Streaming audio playback.
//!
//! A streaming session reads a chunked HTTP body, parses the WAV header
//! from the first chunk, and forwards PCM payload to one of two sinks:
//! the low-latency ring-buffer path ([`live`]) or the chained-segment
//! fallback ([`chained`]). Which one runs is resolved up front from the
//! configured mode and runtime output capability.

pub mod buffered;
pub mod chained;
pub mod live;
pub mod output;
pub mod ring_buffer;

use crate::config::StreamingMode;
use crate::error::{Result, TtscastError};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Resolve the playback mode actually used for a session.
///
/// A request for the low-latency path silently downgrades to the chained
/// fallback when no low-latency output is available; everything else
/// passes through unchanged. Pure function, no side effects.
pub fn resolve_playback_mode(requested: StreamingMode, live_available: bool) -> StreamingMode {
    match requested {
        StreamingMode::Worklet if !live_available => StreamingMode::Blob,
        other => other,
    }
}

/// Consumer of raw body chunks for one streaming session.
#[async_trait]
pub trait StreamSink: Send {
    async fn on_chunk(&mut self, chunk: &[u8]) -> Result<()>;
}

/// Cancellation handle for an in-flight streaming session.
///
/// The read loop checks it at every chunk boundary; stopping the handle
/// terminates the session without waiting for the body to end.
#[derive(Clone)]
pub struct SessionHandle {
    running: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Stops the streaming session at the next chunk boundary.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Returns true if the session has not been stopped.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive a chunked byte stream into a sink until end-of-stream, error,
/// or cancellation.
///
/// Chunks are processed strictly in arrival order; end-of-stream is
/// implicit when the underlying stream terminates.
pub async fn pump_stream<S, B, E>(
    mut stream: S,
    sink: &mut dyn StreamSink,
    handle: &SessionHandle,
) -> Result<()>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    while handle.is_running() {
        let Some(chunk) = stream.next().await else {
            break;
        };
        let chunk = chunk.map_err(|e| TtscastError::Request {
            message: format!("failed to read stream chunk: {e}"),
        })?;
        sink.on_chunk(chunk.as_ref()).await?;
    }
    Ok(())
}
