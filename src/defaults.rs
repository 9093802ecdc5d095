//! Default configuration constants for ttscast.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

/// Default generation endpoint of a local TTS WebUI server.
pub const PROVIDER_ENDPOINT: &str = "http://127.0.0.1:7778/v1/audio/speech";

/// Default model identifier sent with generation requests.
pub const MODEL: &str = "chatterbox";

/// Default playback speed multiplier.
pub const SPEED: f64 = 1.0;

/// Default volume multiplier.
///
/// Volume is clamped to [0.0, 2.0]; element-style playback paths cap
/// at unity gain because the underlying medium cannot exceed it.
pub const VOLUME: f32 = 1.0;

/// Maximum accepted volume multiplier (200%).
pub const MAX_VOLUME: f32 = 2.0;

/// Size of the canonical WAV header in bytes.
///
/// Streaming responses begin with exactly this many bytes of format
/// preamble before raw PCM payload starts.
pub const WAV_HEADER_LEN: usize = 44;

/// Transport chunk size the originating server emits at split boundaries.
///
/// 64 KiB minus 7 bytes of framing overhead (uvicorn's chunked-transfer
/// implementation). A chunk of exactly this size carries no complete new
/// audible unit on its own and is skipped by the chained playback path.
pub const SPLIT_CHUNK_LEN: usize = 65529;

/// Initial capacity of the PCM playback ring buffer, in samples.
///
/// Roughly a third of a second of mono audio at 24 kHz; the buffer
/// doubles on demand so the exact value only affects early growth.
pub const RING_INITIAL_CAPACITY: usize = 8192;

/// Divisor that normalizes signed 16-bit PCM samples into [-1.0, 1.0].
pub const PCM_I16_SCALE: f32 = 32768.0;

/// Language tag reported for every discovered voice.
pub const VOICE_LANG: &str = "en-US";

/// Preview sentence spoken by `ttscast preview`.
pub const PREVIEW_TEXT: &str =
    "The quick brown fox jumps over the lazy dog. Pack my box with five dozen liquor jugs.";

/// Polling interval while waiting for the live sink to drain (ms).
pub const DRAIN_POLL_INTERVAL_MS: u64 = 25;
