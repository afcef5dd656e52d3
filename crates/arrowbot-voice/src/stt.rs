//! Speech-to-text.
//!
//! With the `whisper` feature, [`WhisperTranscriber`] loads a GGML model via
//! whisper-rs and runs inference on the blocking pool. Without it, the
//! constructor fails so the transcoder starts with speech input unconfigured.

use async_trait::async_trait;

use arrowbot_core::error::{ArrowError, Result};

#[cfg(feature = "whisper")]
use crate::wav::{decode_wav, resample};

/// Sample rate whisper expects.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Transcribes an uploaded audio file.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Returns the recognized text, which may be empty for silence.
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;

    /// Model identifier for status output.
    fn model(&self) -> &str;

    fn language(&self) -> &str;
}

/// Settings for the whisper backend.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to a GGML model file.
    pub model_path: String,
    /// Language code, or "auto" to detect.
    pub language: String,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            language: "en".to_string(),
        }
    }
}

/// whisper.cpp speech recognizer. Accepts 16-bit PCM WAV uploads.
pub struct WhisperTranscriber {
    #[cfg(feature = "whisper")]
    ctx: std::sync::Arc<whisper_rs::WhisperContext>,
    config: WhisperConfig,
}

impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("config", &self.config)
            .finish()
    }
}

impl WhisperTranscriber {
    /// Load the model named in `config`.
    #[cfg(feature = "whisper")]
    pub fn new(config: WhisperConfig) -> Result<Self> {
        use whisper_rs::{WhisperContext, WhisperContextParameters};

        if !std::path::Path::new(&config.model_path).exists() {
            return Err(ArrowError::Transcription(format!(
                "Whisper model file not found: {}",
                config.model_path
            )));
        }

        tracing::info!(model = %config.model_path, lang = %config.language, "Loading Whisper model");
        let ctx = WhisperContext::new_with_params(&config.model_path, WhisperContextParameters::default())
            .map_err(|e| ArrowError::Transcription(format!("Failed to load Whisper model: {}", e)))?;
        tracing::info!("Whisper model loaded");

        Ok(Self {
            ctx: std::sync::Arc::new(ctx),
            config,
        })
    }

    #[cfg(not(feature = "whisper"))]
    pub fn new(config: WhisperConfig) -> Result<Self> {
        let _ = config;
        Err(ArrowError::Transcription(
            "speech-to-text requires the `whisper` feature".into(),
        ))
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(feature = "whisper")]
fn run_whisper(ctx: &whisper_rs::WhisperContext, language: &str, samples: &[f32]) -> Result<String> {
    use whisper_rs::{FullParams, SamplingStrategy};

    let mut state = ctx
        .create_state()
        .map_err(|e| ArrowError::Transcription(format!("Failed to create Whisper state: {}", e)))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    let lang = if language == "auto" { None } else { Some(language) };
    params.set_language(lang);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    state
        .full(params, samples)
        .map_err(|e| ArrowError::Transcription(format!("Whisper inference failed: {}", e)))?;

    let n_segments = state
        .full_n_segments()
        .map_err(|e| ArrowError::Transcription(format!("Failed to get segment count: {}", e)))?;

    let mut text = String::new();
    for i in 0..n_segments {
        let segment = state.full_get_segment_text(i).map_err(|e| {
            ArrowError::Transcription(format!("Failed to get segment {} text: {}", i, e))
        })?;
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(segment);
    }
    Ok(text)
}

#[async_trait]
impl SpeechToText for WhisperTranscriber {
    #[cfg(feature = "whisper")]
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let pcm = decode_wav(audio)?;
        let samples = resample(&pcm.samples, pcm.sample_rate, WHISPER_SAMPLE_RATE);
        tracing::debug!(
            samples = samples.len(),
            duration_secs = samples.len() as f32 / WHISPER_SAMPLE_RATE as f32,
            "Starting Whisper transcription"
        );

        let ctx = std::sync::Arc::clone(&self.ctx);
        let language = self.config.language.clone();
        let text = tokio::task::spawn_blocking(move || run_whisper(&ctx, &language, &samples))
            .await
            .map_err(|e| ArrowError::Transcription(format!("Transcription task failed: {}", e)))??;

        tracing::info!(text_len = text.len(), "Transcription complete");
        Ok(text)
    }

    #[cfg(not(feature = "whisper"))]
    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        Err(ArrowError::Transcription(
            "speech-to-text requires the `whisper` feature".into(),
        ))
    }

    fn model(&self) -> &str {
        &self.config.model_path
    }

    fn language(&self) -> &str {
        &self.config.language
    }
}
