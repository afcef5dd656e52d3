//! Speech to text and back, with absent results instead of errors.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use arrowbot_core::config::VoiceConfig;
use arrowbot_core::error::with_timeout;
use arrowbot_core::{Capability, EncodedAudio};

use crate::stt::SpeechToText;
use crate::tts::{default_voice_names, TextToSpeech};

/// Description of the audio backends, for status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInfo {
    pub speech_to_text: Capability,
    pub whisper_model: Option<String>,
    pub language: Option<String>,
    pub text_to_speech: Capability,
    pub default_voice: String,
    pub voices: Vec<String>,
}

pub struct AudioTranscoder {
    stt: Option<Arc<dyn SpeechToText>>,
    tts: Option<Arc<dyn TextToSpeech>>,
    default_voice: String,
    timeout: Duration,
}

impl AudioTranscoder {
    pub fn new(
        stt: Option<Arc<dyn SpeechToText>>,
        tts: Option<Arc<dyn TextToSpeech>>,
        config: &VoiceConfig,
    ) -> Self {
        info!(
            speech_to_text = stt.is_some(),
            text_to_speech = tts.is_some(),
            "Audio transcoder initialized"
        );
        Self {
            stt,
            tts,
            default_voice: config.default_voice.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// No speech backends at all.
    pub fn disabled() -> Self {
        Self::new(None, None, &VoiceConfig::default())
    }

    pub fn stt_capability(&self) -> Capability {
        if self.stt.is_some() {
            Capability::Ready
        } else {
            Capability::Unconfigured
        }
    }

    pub fn tts_capability(&self) -> Capability {
        if self.tts.is_some() {
            Capability::Ready
        } else {
            Capability::Unconfigured
        }
    }

    pub fn default_voice(&self) -> &str {
        &self.default_voice
    }

    /// Recognized text, `Some("")` for silence, `None` when no model is
    /// loaded or the audio could not be decoded.
    pub async fn speech_to_text(&self, audio: &[u8]) -> Option<String> {
        let stt = self.stt.as_ref()?;
        match with_timeout(self.timeout, "speech to text", stt.transcribe(audio)).await {
            Ok(text) => Some(text.trim().to_string()),
            Err(e) => {
                warn!(error = %e, bytes = audio.len(), "Speech-to-text failed");
                None
            }
        }
    }

    /// Synthesized audio, or `None` when synthesis is unavailable or fails.
    /// `voice` defaults to the configured voice.
    pub async fn text_to_speech(&self, text: &str, voice: Option<&str>) -> Option<EncodedAudio> {
        let tts = self.tts.as_ref()?;
        let voice = voice.unwrap_or(self.default_voice.as_str());
        match with_timeout(self.timeout, "text to speech", tts.synthesize(text, voice)).await {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!(error = %e, voice, "Text-to-speech failed");
                None
            }
        }
    }

    /// Never empty: the default roster stands in when the backend is absent
    /// or cannot list its voices.
    pub async fn available_voices(&self) -> Vec<String> {
        let Some(tts) = self.tts.as_ref() else {
            return default_voice_names();
        };
        match with_timeout(self.timeout, "list voices", tts.voices()).await {
            Ok(voices) if !voices.is_empty() => voices,
            Ok(_) => default_voice_names(),
            Err(e) => {
                warn!(error = %e, "Failed to get voices");
                default_voice_names()
            }
        }
    }

    pub async fn info(&self) -> AudioInfo {
        AudioInfo {
            speech_to_text: self.stt_capability(),
            whisper_model: self.stt.as_ref().map(|s| s.model().to_string()),
            language: self.stt.as_ref().map(|s| s.language().to_string()),
            text_to_speech: self.tts_capability(),
            default_voice: self.default_voice.clone(),
            voices: self.available_voices().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrowbot_core::error::{ArrowError, Result};
    use async_trait::async_trait;

    struct EchoStt;

    #[async_trait]
    impl SpeechToText for EchoStt {
        async fn transcribe(&self, audio: &[u8]) -> Result<String> {
            String::from_utf8(audio.to_vec())
                .map_err(|_| ArrowError::Transcription("not text".into()))
        }
        fn model(&self) -> &str {
            "echo"
        }
        fn language(&self) -> &str {
            "en"
        }
    }

    struct FakeTts {
        voices: Result<Vec<String>>,
    }

    #[async_trait]
    impl TextToSpeech for FakeTts {
        async fn synthesize(&self, text: &str, voice: &str) -> Result<EncodedAudio> {
            if voice == "Broken" {
                return Err(ArrowError::Synthesis("quota".into()));
            }
            Ok(EncodedAudio {
                mime_type: "audio/mpeg".into(),
                data: format!("{}:{}", voice, text),
            })
        }
        async fn voices(&self) -> Result<Vec<String>> {
            match &self.voices {
                Ok(v) => Ok(v.clone()),
                Err(_) => Err(ArrowError::Synthesis("offline".into())),
            }
        }
    }

    fn transcoder(tts_voices: Result<Vec<String>>) -> AudioTranscoder {
        AudioTranscoder::new(
            Some(Arc::new(EchoStt)),
            Some(Arc::new(FakeTts { voices: tts_voices })),
            &VoiceConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_disabled_returns_absent() {
        let t = AudioTranscoder::disabled();
        assert_eq!(t.stt_capability(), Capability::Unconfigured);
        assert!(t.speech_to_text(b"garbage").await.is_none());
        assert!(t.text_to_speech("hi", None).await.is_none());
        assert_eq!(t.available_voices().await, vec!["Rachel", "Adam", "Domi", "Elli"]);
    }

    #[tokio::test]
    async fn test_empty_transcription_is_distinct_from_absent() {
        let t = transcoder(Ok(vec![]));
        assert_eq!(t.speech_to_text(b"  ").await, Some(String::new()));
        assert!(t.speech_to_text(&[0xff, 0xfe]).await.is_none());
        assert_eq!(t.speech_to_text(b"what are your fees").await.as_deref(), Some("what are your fees"));
    }

    #[tokio::test]
    async fn test_tts_uses_default_voice() {
        let t = transcoder(Ok(vec![]));
        let audio = t.text_to_speech("Hello", None).await.unwrap();
        assert_eq!(audio.data, "Rachel:Hello");
        let audio = t.text_to_speech("Hello", Some("Adam")).await.unwrap();
        assert_eq!(audio.data, "Adam:Hello");
        assert!(t.text_to_speech("Hello", Some("Broken")).await.is_none());
    }

    #[tokio::test]
    async fn test_voices_never_empty() {
        let live = transcoder(Ok(vec!["Custom".to_string()]));
        assert_eq!(live.available_voices().await, vec!["Custom"]);

        let empty = transcoder(Ok(vec![]));
        assert_eq!(empty.available_voices().await.len(), 4);

        let failing = transcoder(Err(ArrowError::Synthesis("x".into())));
        assert_eq!(failing.available_voices().await.len(), 4);
    }

    #[tokio::test]
    async fn test_info() {
        let info = transcoder(Ok(vec![])).info().await;
        assert_eq!(info.speech_to_text, Capability::Ready);
        assert_eq!(info.whisper_model.as_deref(), Some("echo"));
        assert_eq!(info.text_to_speech, Capability::Ready);
        assert_eq!(info.default_voice, "Rachel");

        let none = AudioTranscoder::disabled().info().await;
        assert!(none.whisper_model.is_none());
        assert_eq!(none.text_to_speech, Capability::Unconfigured);
    }
}
