//! Provider configuration.
//!
//! The settings record is deliberately flat: it mirrors the key/value
//! object the host persists for the provider. Only the recognized key set
//! is accepted — merging a record with any unknown key is a hard error,
//! and the error fires before any field is applied.

use crate::defaults;
use crate::error::{Result, TtscastError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
#[cfg(feature = "cli")]
use std::path::PathBuf;
use std::str::FromStr;

/// Streaming playback strategy requested by configuration.
///
/// `Worklet` is the low-latency ring-buffer path; `Blob` is the
/// chained-segment fallback. The requested mode may still be downgraded
/// at runtime by [`crate::playback::resolve_playback_mode`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StreamingMode {
    Worklet,
    Blob,
}

impl FromStr for StreamingMode {
    type Err = TtscastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "worklet" => Ok(StreamingMode::Worklet),
            "blob" => Ok(StreamingMode::Blob),
            other => Err(TtscastError::UnknownPlaybackMode {
                mode: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for StreamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamingMode::Worklet => write!(f, "worklet"),
            StreamingMode::Blob => write!(f, "blob"),
        }
    }
}

/// Flat provider settings record.
///
/// Field names match the persisted key set one-to-one. The deprecated
/// generation parameters are retained because the server still accepts
/// them and persisted settings may still carry them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub provider_endpoint: String,
    pub api_key: String,
    pub model: String,
    pub speed: f64,
    pub volume: f32,
    pub available_voices: Vec<String>,
    pub streaming: bool,
    pub streaming_mode: StreamingMode,
    pub stream_chunk_size: u32,
    pub desired_length: u32,
    pub max_length: u32,
    pub halve_first_chunk: bool,
    pub exaggeration: f64,
    pub cfg_weight: f64,
    pub temperature: f64,
    pub device: String,
    pub dtype: String,
    pub cpu_offload: bool,
    pub chunked: bool,
    pub cache_voice: bool,
    // Deprecated on the server side, still part of the recognized key set
    pub tokens_per_slice: u32,
    pub remove_milliseconds: u32,
    pub remove_milliseconds_start: u32,
    pub chunk_overlap_method: String,
    pub seed: i64,
    pub initial_forward_pass_backend: String,
    pub generate_token_backend: String,
    pub model_name: String,
    pub language_id: String,
    pub max_new_tokens: u32,
    pub max_cache_len: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_endpoint: defaults::PROVIDER_ENDPOINT.to_string(),
            api_key: String::new(),
            model: defaults::MODEL.to_string(),
            speed: defaults::SPEED,
            volume: defaults::VOLUME,
            available_voices: Vec::new(),
            streaming: true,
            streaming_mode: StreamingMode::Worklet,
            stream_chunk_size: 100,
            desired_length: 80,
            max_length: 200,
            halve_first_chunk: true,
            exaggeration: 0.5,
            cfg_weight: 0.5,
            temperature: 0.8,
            device: "auto".to_string(),
            dtype: "bfloat16".to_string(),
            cpu_offload: false,
            chunked: true,
            cache_voice: false,
            tokens_per_slice: 1000,
            remove_milliseconds: 45,
            remove_milliseconds_start: 25,
            chunk_overlap_method: "zero".to_string(),
            seed: -1,
            initial_forward_pass_backend: "eager".to_string(),
            generate_token_backend: "cudagraphs-manual".to_string(),
            model_name: "just_a_placeholder".to_string(),
            language_id: "en".to_string(),
            max_new_tokens: 1000,
            max_cache_len: 1500,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Missing fields use default values; unrecognized keys are rejected.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist.
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML or unrecognized keys.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Self::default()
                } else {
                    panic!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Merge a persisted flat settings record over defaults.
    ///
    /// Any key not present in the recognized set aborts the load before a
    /// single field is applied.
    pub fn from_persisted(settings: serde_json::Value) -> Result<Self> {
        serde_json::from_value(settings).map_err(|e| {
            let msg = e.to_string();
            match msg.strip_prefix("unknown field `") {
                Some(rest) => TtscastError::ConfigUnknownKey {
                    key: rest.split('`').next().unwrap_or("?").to_string(),
                },
                None => TtscastError::Other(format!("Failed to parse settings: {msg}")),
            }
        })
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - TTSCAST_ENDPOINT → provider_endpoint
    /// - TTSCAST_API_KEY → api_key
    /// - TTSCAST_MODEL → model
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("TTSCAST_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.provider_endpoint = endpoint;
        }

        if let Ok(key) = std::env::var("TTSCAST_API_KEY")
            && !key.is_empty()
        {
            self.api_key = key;
        }

        if let Ok(model) = std::env::var("TTSCAST_MODEL")
            && !model.is_empty()
        {
            self.model = model;
        }

        self
    }

    /// Get the default configuration file path.
    ///
    /// Returns ~/.config/ttscast/config.toml on Linux.
    #[cfg(feature = "cli")]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("ttscast")
            .join("config.toml")
    }

    /// Collect the generation parameters forwarded verbatim in the
    /// request body's `params` object.
    pub fn generation_params(&self) -> serde_json::Map<String, serde_json::Value> {
        use serde_json::json;
        let mut params = serde_json::Map::new();
        params.insert("desired_length".into(), json!(self.desired_length));
        params.insert("max_length".into(), json!(self.max_length));
        params.insert("halve_first_chunk".into(), json!(self.halve_first_chunk));
        params.insert("exaggeration".into(), json!(self.exaggeration));
        params.insert("cfg_weight".into(), json!(self.cfg_weight));
        params.insert("temperature".into(), json!(self.temperature));
        params.insert("device".into(), json!(self.device));
        params.insert("dtype".into(), json!(self.dtype));
        params.insert("cpu_offload".into(), json!(self.cpu_offload));
        params.insert("chunked".into(), json!(self.chunked));
        params.insert("cache_voice".into(), json!(self.cache_voice));
        params.insert("tokens_per_slice".into(), json!(self.tokens_per_slice));
        params.insert(
            "remove_milliseconds".into(),
            json!(self.remove_milliseconds),
        );
        params.insert(
            "remove_milliseconds_start".into(),
            json!(self.remove_milliseconds_start),
        );
        params.insert(
            "chunk_overlap_method".into(),
            json!(self.chunk_overlap_method),
        );
        params.insert("seed".into(), json!(self.seed));
        params.insert(
            "initial_forward_pass_backend".into(),
            json!(self.initial_forward_pass_backend),
        );
        params.insert(
            "generate_token_backend".into(),
            json!(self.generate_token_backend),
        );
        params.insert("model_name".into(), json!(self.model_name));
        params.insert("language_id".into(), json!(self.language_id));
        params.insert("max_new_tokens".into(), json!(self.max_new_tokens));
        params.insert("max_cache_len".into(), json!(self.max_cache_len));
        params
    }
}

/// Apply a single field change from a raw string value.
///
/// This is the pure reducer behind any settings UI: it owns parsing and
/// validation, independent of how the value was captured. Unknown fields
/// and unparseable values are hard errors; the config is untouched on error.
pub fn apply_field_change(config: &mut Config, field: &str, raw: &str) -> Result<()> {
    fn parse<T: FromStr>(field: &str, raw: &str) -> Result<T>
    where
        T::Err: fmt::Display,
    {
        raw.parse().map_err(|e: T::Err| TtscastError::ConfigInvalidValue {
            key: field.to_string(),
            message: e.to_string(),
        })
    }

    match field {
        "provider_endpoint" => config.provider_endpoint = raw.to_string(),
        "api_key" => config.api_key = raw.trim().to_string(),
        "model" => config.model = raw.to_string(),
        "speed" => config.speed = parse(field, raw)?,
        "volume" => config.volume = parse(field, raw)?,
        "available_voices" => {
            config.available_voices = raw.split(',').map(|s| s.to_string()).collect();
        }
        "streaming" => config.streaming = parse(field, raw)?,
        "streaming_mode" => config.streaming_mode = raw.parse()?,
        "stream_chunk_size" => config.stream_chunk_size = parse(field, raw)?,
        "desired_length" => config.desired_length = parse(field, raw)?,
        "max_length" => config.max_length = parse(field, raw)?,
        "halve_first_chunk" => config.halve_first_chunk = parse(field, raw)?,
        "exaggeration" => config.exaggeration = parse(field, raw)?,
        "cfg_weight" => config.cfg_weight = parse(field, raw)?,
        "temperature" => config.temperature = parse(field, raw)?,
        "device" => config.device = raw.to_string(),
        "dtype" => config.dtype = raw.to_string(),
        "cpu_offload" => config.cpu_offload = parse(field, raw)?,
        "chunked" => config.chunked = parse(field, raw)?,
        "cache_voice" => config.cache_voice = parse(field, raw)?,
        "tokens_per_slice" => config.tokens_per_slice = parse(field, raw)?,
        "remove_milliseconds" => config.remove_milliseconds = parse(field, raw)?,
        "remove_milliseconds_start" => config.remove_milliseconds_start = parse(field, raw)?,
        "chunk_overlap_method" => config.chunk_overlap_method = raw.to_string(),
        // Seed falls back to -1 (random) on garbage, matching the form behavior
        "seed" => config.seed = raw.parse().unwrap_or(-1),
        "initial_forward_pass_backend" => {
            config.initial_forward_pass_backend = raw.to_string();
        }
        "generate_token_backend" => config.generate_token_backend = raw.to_string(),
        "model_name" => config.model_name = raw.to_string(),
        "language_id" => config.language_id = raw.to_string(),
        "max_new_tokens" => config.max_new_tokens = parse(field, raw)?,
        "max_cache_len" => config.max_cache_len = parse(field, raw)?,
        unknown => {
            return Err(TtscastError::ConfigUnknownKey {
                key: unknown.to_string(),
            });
        }
    }
    Ok(())
}
