//! HTTP client for the synthesis server.
//!
//! Two operations: voice discovery (GET) and speech generation (POST).
//! Generation can return the body buffered or as a chunked stream; the
//! caller decides by awaiting `bytes()` or `bytes_stream()` on the
//! response.

use crate::config::Config;
use crate::error::{Result, TtscastError};
use serde::{Deserialize, Serialize};

/// A selectable synthesis voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub voice_id: String,
    pub lang: String,
}

/// One entry of the discovery response's `voices` array.
///
/// Servers return either `{value, label}` objects or bare voice-file
/// names, depending on the model backend.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum VoiceEntry {
    Labeled { value: String, label: String },
    Bare(String),
}

impl VoiceEntry {
    pub fn into_voice(self, lang: &str) -> Voice {
        match self {
            VoiceEntry::Labeled { value, label } => Voice {
                name: label,
                voice_id: value,
                lang: lang.to_string(),
            },
            VoiceEntry::Bare(name) => Voice {
                voice_id: name.clone(),
                name,
                lang: lang.to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<VoiceEntry>,
}

/// Generation request body.
///
/// `params` carries the model-specific knobs verbatim; the server routes
/// them to the backend named by `model`.
#[derive(Debug, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub voice: String,
    pub input: String,
    pub response_format: String,
    pub speed: f64,
    pub stream: bool,
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl GenerationRequest {
    pub fn from_config(config: &Config, text: &str, voice_id: &str) -> Self {
        Self {
            model: config.model.clone(),
            voice: voice_id.to_string(),
            input: text.to_string(),
            response_format: "wav".to_string(),
            speed: config.speed,
            stream: config.streaming,
            params: config.generation_params(),
        }
    }
}

/// Derive the voice discovery URL from the generation endpoint.
///
/// The server mounts both under the same prefix, so the discovery URL is
/// the generation URL with its `/speech` segment swapped for
/// `/voices/<model>`.
pub fn voices_endpoint(endpoint: &str, model: &str) -> String {
    endpoint.replace("/speech", &format!("/voices/{}", model))
}

/// Client bound to one provider endpoint.
pub struct TtsClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl TtsClient {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            api_key: if api_key.is_empty() {
                None
            } else {
                Some(api_key.to_string())
            },
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.provider_endpoint, &config.api_key)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Fetch the voice list for a model from the discovery endpoint.
    pub async fn fetch_voices(&self, model: &str, lang: &str) -> Result<Vec<Voice>> {
        let url = voices_endpoint(&self.endpoint, model);
        let response = self.authorize(self.http.get(&url)).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TtscastError::Http { status, body });
        }

        let parsed: VoicesResponse = response.json().await?;
        Ok(parsed
            .voices
            .into_iter()
            .map(|entry| entry.into_voice(lang))
            .collect())
    }

    /// POST a generation request and return the raw response.
    ///
    /// Streaming requests carry `Cache-Control: no-cache` so intermediate
    /// proxies do not buffer the chunked body. A non-success status is
    /// turned into an error carrying the response text.
    pub async fn fetch_generation(&self, body: &GenerationRequest) -> Result<reqwest::Response> {
        let mut request = self.authorize(self.http.post(&self.endpoint)).json(body);
        if body.stream {
            request = request.header("Cache-Control", "no-cache");
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(TtscastError::Http { status, body: text });
        }
        Ok(response)
    }
}
