//! Text-to-speech.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use arrowbot_core::config::VoiceConfig;
use arrowbot_core::error::{ArrowError, Result};
use arrowbot_core::EncodedAudio;

/// Voice roster reported when no synthesis backend can be asked, with the
/// vendor's ids for those premade voices.
pub const DEFAULT_VOICES: [(&str, &str); 4] = [
    ("Rachel", "21m00Tcm4TlvDq8ikWAM"),
    ("Adam", "pNInz6obpgDQGcFmaJgB"),
    ("Domi", "AZnzlk1XvdvUeBnXmlld"),
    ("Elli", "MF3mGyEYCl7XYXbV9gbR"),
];

/// Renders text as audio.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize `text` in the named `voice`.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<EncodedAudio>;

    /// Names of the voices the backend offers.
    async fn voices(&self) -> Result<Vec<String>>;
}

const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";
const MPEG_MIME: &str = "audio/mpeg";

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct VoiceList {
    voices: Vec<VoiceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct VoiceEntry {
    voice_id: String,
    name: String,
}

/// ElevenLabs REST client.
pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
    model_id: String,
    base_url: String,
    /// Lowercased voice name to voice id.
    resolved: Mutex<HashMap<String, String>>,
}

impl std::fmt::Debug for ElevenLabsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevenLabsClient")
            .field("model_id", &self.model_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ElevenLabsClient {
    pub fn new(api_key: impl Into<String>, config: &VoiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ArrowError::Synthesis(format!("HTTP client: {}", e)))?;
        info!(model = %config.tts_model, "Speech synthesis configured");
        Ok(Self {
            client,
            api_key: api_key.into(),
            model_id: config.tts_model.clone(),
            base_url: ELEVENLABS_BASE_URL.to_string(),
            resolved: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn list_voices(&self) -> Result<Vec<VoiceEntry>> {
        let response = self
            .client
            .get(format!("{}/voices", self.base_url))
            .header("xi-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ArrowError::Synthesis(format!("Voice list request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArrowError::Synthesis(format!(
                "Voice list returned {}",
                status
            )));
        }

        let list: VoiceList = response
            .json()
            .await
            .map_err(|e| ArrowError::Synthesis(format!("Malformed voice list: {}", e)))?;
        Ok(list.voices)
    }

    fn cached_id(&self, key: &str) -> Option<String> {
        self.resolved.lock().ok().and_then(|m| m.get(key).cloned())
    }

    /// Map a voice name to a vendor voice id: live voice list first, then
    /// the default roster, then the name itself.
    async fn resolve_voice(&self, voice: &str) -> String {
        let key = voice.to_lowercase();
        if let Some(id) = self.cached_id(&key) {
            return id;
        }

        // Only ids from a successful listing are cached.
        let (live, listed) = match self.list_voices().await {
            Ok(voices) => (
                voices
                    .into_iter()
                    .find(|v| v.name.to_lowercase() == key)
                    .map(|v| v.voice_id),
                true,
            ),
            Err(e) => {
                debug!(error = %e, "Voice list unavailable; using default roster ids");
                (None, false)
            }
        };

        let id = live
            .or_else(|| default_voice_id(voice).map(str::to_string))
            .unwrap_or_else(|| voice.to_string());

        if listed {
            if let Ok(mut m) = self.resolved.lock() {
                m.insert(key, id.clone());
            }
        }
        id
    }
}

fn default_voice_id(name: &str) -> Option<&'static str> {
    DEFAULT_VOICES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, id)| *id)
}

/// Names from the default roster.
pub fn default_voice_names() -> Vec<String> {
    DEFAULT_VOICES.iter().map(|(n, _)| n.to_string()).collect()
}

#[async_trait]
impl TextToSpeech for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<EncodedAudio> {
        if text.trim().is_empty() {
            return Err(ArrowError::Synthesis("Nothing to synthesize".into()));
        }

        let voice_id = self.resolve_voice(voice).await;
        let response = self
            .client
            .post(format!("{}/text-to-speech/{}", self.base_url, voice_id))
            .header("xi-api-key", &self.api_key)
            .header("accept", MPEG_MIME)
            .json(&SynthesisRequest {
                text,
                model_id: &self.model_id,
            })
            .send()
            .await
            .map_err(|e| ArrowError::Synthesis(format!("Synthesis request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArrowError::Synthesis(format!(
                "Synthesis API returned {}: {}",
                status, body
            )));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("audio/"))
            .unwrap_or(MPEG_MIME)
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ArrowError::Synthesis(format!("Failed to read audio: {}", e)))?;
        if bytes.is_empty() {
            return Err(ArrowError::Synthesis("Empty audio response".into()));
        }

        debug!(voice, bytes = bytes.len(), "Synthesized speech");
        Ok(EncodedAudio {
            mime_type,
            data: BASE64_STANDARD.encode(&bytes),
        })
    }

    async fn voices(&self) -> Result<Vec<String>> {
        let names: Vec<String> = self.list_voices().await?.into_iter().map(|v| v.name).collect();
        if names.is_empty() {
            return Err(ArrowError::Synthesis("Voice list is empty".into()));
        }
        Ok(names)
    }
}
