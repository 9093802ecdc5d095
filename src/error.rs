//! Error types for ttscast.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtscastError {
    // Configuration errors
    #[error("Invalid setting passed to TTS provider: {key}")]
    ConfigUnknownKey { key: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // HTTP errors
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request failed: {message}")]
    Request { message: String },

    // Voice errors
    #[error("TTS voice name {name} not found")]
    VoiceNotFound { name: String },

    // Audio errors
    #[error("Malformed WAV header: {message}")]
    WavHeader { message: String },

    #[error("Unknown playback mode: {mode}")]
    UnknownPlaybackMode { mode: String },

    #[error("Audio output failed: {message}")]
    AudioOutput { message: String },

    #[error("Audio decode failed: {message}")]
    AudioDecode { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TtscastError {
    fn from(e: reqwest::Error) -> Self {
        TtscastError::Request {
            message: e.to_string(),
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TtscastError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_unknown_key_display() {
        let error = TtscastError::ConfigUnknownKey {
            key: "tokens_per_sliec".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid setting passed to TTS provider: tokens_per_sliec"
        );
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = TtscastError::ConfigInvalidValue {
            key: "volume".to_string(),
            message: "not a number".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for volume: not a number"
        );
    }

    #[test]
    fn test_http_display_carries_status_and_body() {
        let error = TtscastError::Http {
            status: 503,
            body: "model not loaded".to_string(),
        };
        assert_eq!(error.to_string(), "HTTP 503: model not loaded");
    }

    #[test]
    fn test_voice_not_found_display() {
        let error = TtscastError::VoiceNotFound {
            name: "gloria".to_string(),
        };
        assert_eq!(error.to_string(), "TTS voice name gloria not found");
    }

    #[test]
    fn test_wav_header_display() {
        let error = TtscastError::WavHeader {
            message: "first chunk too short (12 bytes)".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Malformed WAV header: first chunk too short (12 bytes)"
        );
    }

    #[test]
    fn test_unknown_playback_mode_display() {
        let error = TtscastError::UnknownPlaybackMode {
            mode: "html5".to_string(),
        };
        assert_eq!(error.to_string(), "Unknown playback mode: html5");
    }

    #[test]
    fn test_other_display() {
        let error = TtscastError::Other("unexpected error".to_string());
        assert_eq!(error.to_string(), "unexpected error");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: TtscastError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: TtscastError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<TtscastError>();
        assert_sync::<TtscastError>();
    }
}
