//! Provider facade tying configuration, the HTTP client, and playback
//! together. This is the surface the CLI drives.

use crate::client::{GenerationRequest, TtsClient, Voice};
use crate::config::Config;
use crate::defaults::{MAX_VOLUME, PREVIEW_TEXT, VOICE_LANG};
use crate::error::{Result, TtscastError};
use crate::playback::SessionHandle;

#[cfg(feature = "cpal-audio")]
use crate::config::StreamingMode;
#[cfg(feature = "cpal-audio")]
use crate::playback::chained::ChainedSink;
#[cfg(feature = "cpal-audio")]
use crate::playback::live::{LiveSink, WavStreamSink};
#[cfg(feature = "cpal-audio")]
use crate::playback::output::{self, CpalSegmentOutput};
#[cfg(feature = "cpal-audio")]
use crate::playback::{pump_stream, resolve_playback_mode};
#[cfg(feature = "cpal-audio")]
use std::sync::Arc;

/// Map configured voice names to voice objects when discovery fails.
fn fallback_voices(names: &[String]) -> Vec<Voice> {
    names
        .iter()
        .filter(|name| !name.is_empty())
        .map(|name| Voice {
            name: name.clone(),
            voice_id: name.clone(),
            lang: VOICE_LANG.to_string(),
        })
        .collect()
}

/// TTS provider bound to one endpoint and configuration.
pub struct TtsProvider {
    config: Config,
    client: TtsClient,
    voices: Vec<Voice>,
}

impl TtsProvider {
    pub fn new(config: Config) -> Self {
        let client = TtsClient::from_config(&config);
        Self {
            config,
            client,
            voices: Vec::new(),
        }
    }

    /// Construct from a persisted flat settings record, rejecting
    /// unrecognized keys.
    pub fn from_persisted(settings: serde_json::Value) -> Result<Self> {
        Ok(Self::new(Config::from_persisted(settings)?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Update the playback volume for subsequent sessions, clamped to
    /// [0, 2].
    pub fn set_volume(&mut self, volume: f32) {
        self.config.volume = volume.clamp(0.0, MAX_VOLUME);
    }

    /// Readiness check: the provider is usable once a voice list exists.
    pub async fn check_ready(&mut self) -> Result<()> {
        let voices = self.fetch_voice_objects().await;
        if voices.is_empty() {
            return Err(TtscastError::Other(
                "no voices available from discovery or configuration".to_string(),
            ));
        }
        Ok(())
    }

    /// Discover voices from the provider, falling back to the configured
    /// voice names when discovery fails. Never errors; the fallback list
    /// may be empty.
    pub async fn fetch_voice_objects(&mut self) -> Vec<Voice> {
        match self.client.fetch_voices(&self.config.model, VOICE_LANG).await {
            Ok(voices) => self.voices = voices,
            Err(e) => {
                eprintln!("Voice discovery failed, using configured voices: {}", e);
                self.voices = fallback_voices(&self.config.available_voices);
            }
        }
        self.voices.clone()
    }

    /// Look up a voice by display name, fetching the list first if it
    /// has not been loaded yet.
    pub async fn get_voice(&mut self, name: &str) -> Result<Voice> {
        if self.voices.is_empty() {
            self.fetch_voice_objects().await;
        }
        self.voices
            .iter()
            .find(|voice| voice.name == name)
            .cloned()
            .ok_or_else(|| TtscastError::VoiceNotFound {
                name: name.to_string(),
            })
    }

    /// Generate speech for `text` with the given voice.
    ///
    /// When streaming is enabled the audio is played during the request
    /// and `None` is returned; otherwise the complete WAV body comes
    /// back for the caller to play or save.
    pub async fn generate_tts(
        &self,
        text: &str,
        voice_id: &str,
        handle: &SessionHandle,
    ) -> Result<Option<Vec<u8>>> {
        let request = GenerationRequest::from_config(&self.config, text, voice_id);
        let response = self.client.fetch_generation(&request).await?;

        if self.config.streaming {
            self.play_streaming(response, handle).await?;
            Ok(None)
        } else {
            Ok(Some(response.bytes().await?.to_vec()))
        }
    }

    /// Synthesize and play a short preview phrase for one voice.
    pub async fn preview_voice(&self, voice_id: &str) -> Result<()> {
        let handle = SessionHandle::new();
        if let Some(body) = self.generate_tts(PREVIEW_TEXT, voice_id, &handle).await? {
            self.play_complete(&body).await?;
        }
        Ok(())
    }

    #[cfg(feature = "cpal-audio")]
    async fn play_streaming(
        &self,
        response: reqwest::Response,
        handle: &SessionHandle,
    ) -> Result<()> {
        let mode = resolve_playback_mode(self.config.streaming_mode, output::live_output_available());
        let volume = self.config.volume.clamp(0.0, MAX_VOLUME);
        let stream = Box::pin(response.bytes_stream());

        match mode {
            StreamingMode::Worklet => {
                let mut sink = WavStreamSink::new(move |format| LiveSink::start(format, volume));
                pump_stream(stream, &mut sink, handle).await?;
                if let Some(live) = sink.into_inner() {
                    if handle.is_running() {
                        live.drain().await;
                    }
                    live.stop();
                }
                Ok(())
            }
            StreamingMode::Blob => {
                let segments = Arc::new(CpalSegmentOutput::new());
                let mut sink = ChainedSink::new(segments, volume);
                pump_stream(stream, &mut sink, handle).await?;
                if handle.is_running() {
                    sink.finished().await?;
                }
                Ok(())
            }
        }
    }

    #[cfg(not(feature = "cpal-audio"))]
    async fn play_streaming(
        &self,
        _response: reqwest::Response,
        _handle: &SessionHandle,
    ) -> Result<()> {
        Err(TtscastError::AudioOutput {
            message: "built without audio output support".to_string(),
        })
    }

    /// Play a complete WAV body through the segment output.
    #[cfg(feature = "cpal-audio")]
    pub async fn play_complete(&self, wav_bytes: &[u8]) -> Result<()> {
        let segments = CpalSegmentOutput::new();
        crate::playback::buffered::play_buffered(&segments, wav_bytes, self.config.volume).await
    }

    #[cfg(not(feature = "cpal-audio"))]
    pub async fn play_complete(&self, _wav_bytes: &[u8]) -> Result<()> {
        Err(TtscastError::AudioOutput {
            message: "built without audio output support".to_string(),
        })
    }

    #[cfg(test)]
    fn seed_voices(&mut self, voices: Vec<Voice>) {
        self.voices = voices;
    }
}
