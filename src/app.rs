//! Speech playback application entry point.
//!
//! Orchestrates the complete flow: resolve voice → request synthesis →
//! stream or play the audio.

use crate::config::{Config, StreamingMode, apply_field_change};
use crate::error::Result;
use crate::playback::SessionHandle;
use crate::playback::output::live_output_available;
use crate::provider::TtsProvider;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[cfg(feature = "cpal-audio")]
use crate::playback::output::suppress_audio_warnings;

/// CLI overrides applied on top of the loaded configuration.
#[derive(Debug, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub no_stream: bool,
    pub mode: Option<String>,
    pub volume: Option<f32>,
}

/// Fold CLI overrides into the configuration.
pub fn apply_overrides(config: &mut Config, overrides: &Overrides) -> Result<()> {
    if let Some(endpoint) = &overrides.endpoint {
        config.provider_endpoint = endpoint.clone();
    }
    if let Some(model) = &overrides.model {
        config.model = model.clone();
    }
    if overrides.no_stream {
        config.streaming = false;
    }
    if let Some(mode) = &overrides.mode {
        config.streaming_mode = StreamingMode::from_str(mode)?;
    }
    if let Some(volume) = overrides.volume {
        apply_field_change(config, "volume", &volume.to_string())?;
    }
    Ok(())
}

/// Run the say command: resolve the voice, synthesize, play or save.
pub async fn run_say(
    config: Config,
    text: &str,
    voice_name: Option<&str>,
    output: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    #[cfg(feature = "cpal-audio")]
    suppress_audio_warnings();

    let mut config = config;
    if output.is_some() {
        // Saving implies a complete body
        config.streaming = false;
    }

    let mut provider = TtsProvider::new(config);
    let voice = resolve_voice(&mut provider, voice_name).await?;
    if !quiet {
        eprintln!("Speaking with voice '{}'", voice.name);
    }

    let handle = SessionHandle::new();
    spawn_interrupt_watch(handle.clone());

    let body = provider.generate_tts(text, &voice.voice_id, &handle).await?;
    if let Some(body) = body {
        match output {
            Some(path) => {
                std::fs::write(path, &body)?;
                if !quiet {
                    eprintln!("Wrote {} bytes to {}", body.len(), path.display());
                }
            }
            None => provider.play_complete(&body).await?,
        }
    }
    Ok(())
}

/// Run the voices command: print the discovered voice list.
pub async fn run_voices(config: Config) -> Result<()> {
    let mut provider = TtsProvider::new(config);
    let voices = provider.fetch_voice_objects().await;

    if voices.is_empty() {
        eprintln!("No voices available");
        std::process::exit(1);
    }

    println!("Available voices:");
    for voice in &voices {
        if voice.name == voice.voice_id {
            println!("  {}", voice.name);
        } else {
            println!("  {} ({})", voice.name, voice.voice_id);
        }
    }
    Ok(())
}

/// Run the preview command: speak the sample phrase with one voice.
pub async fn run_preview(config: Config, voice_name: &str) -> Result<()> {
    #[cfg(feature = "cpal-audio")]
    suppress_audio_warnings();

    let mut provider = TtsProvider::new(config);
    let voice = provider.get_voice(voice_name).await?;
    provider.preview_voice(&voice.voice_id).await
}

/// Run the check command: verify provider reachability and audio output.
pub async fn run_check(config: Config) -> Result<()> {
    #[cfg(feature = "cpal-audio")]
    suppress_audio_warnings();

    println!("Endpoint: {}", config.provider_endpoint);

    let mut provider = TtsProvider::new(config);
    match provider.check_ready().await {
        Ok(()) => println!("Provider: ok"),
        Err(e) => {
            println!("Provider: unavailable ({})", e);
            std::process::exit(1);
        }
    }

    if live_output_available() {
        println!("Audio output: ok (low-latency streaming available)");
    } else {
        println!("Audio output: none (streaming falls back to chained segments)");
    }
    Ok(())
}

/// Print the default configuration file path.
pub fn run_config_path() {
    println!("{}", Config::default_path().display());
}

/// Show the effective configuration as TOML.
pub fn run_config_show(config: &Config) -> Result<()> {
    match toml::to_string_pretty(config) {
        Ok(rendered) => {
            print!("{}", rendered);
            Ok(())
        }
        Err(e) => Err(crate::error::TtscastError::Other(format!(
            "failed to render configuration: {}",
            e
        ))),
    }
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/ttscast/config.toml)
/// 3. Built-in defaults with environment variable overrides
pub fn load_config(custom_path: Option<&Path>) -> anyhow::Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        let default_path: PathBuf = Config::default_path();
        Config::load_or_default(&default_path)
    };
    Ok(config.with_env_overrides())
}

/// Pick the requested voice, or the first available one.
async fn resolve_voice(
    provider: &mut TtsProvider,
    voice_name: Option<&str>,
) -> Result<crate::client::Voice> {
    match voice_name {
        Some(name) => provider.get_voice(name).await,
        None => {
            let voices = provider.fetch_voice_objects().await;
            voices
                .into_iter()
                .next()
                .ok_or_else(|| crate::error::TtscastError::Other(
                    "no voices available from discovery or configuration".to_string(),
                ))
        }
    }
}

/// Stop the streaming session on Ctrl-C instead of killing playback
/// mid-callback.
fn spawn_interrupt_watch(handle: SessionHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.stop();
        }
    });
}
