//! ttscast - speak text through a self-hosted TTS server
//!
//! Streams chunked WAV responses into low-latency playback, with a
//! chained-segment fallback when no live audio output is available.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod app;
#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod config;
pub mod defaults;
pub mod error;
pub mod playback;
pub mod provider;
pub mod wav;

// Core surface
pub use client::{TtsClient, Voice};
pub use playback::{SessionHandle, StreamSink, resolve_playback_mode};
pub use provider::TtsProvider;

// Error handling
pub use error::{Result, TtscastError};

// Config
pub use config::{Config, StreamingMode, apply_field_change};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
