use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for the Arrowbot service.
///
/// Loaded from a TOML file, then overlaid with environment variables by
/// [`ArrowConfig::apply_env`]. Every backend is optional: a missing key or
/// path leaves the matching component unconfigured, never failing startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArrowConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default, skip_serializing)]
    pub secrets: SecretsConfig,
}

impl ArrowConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ArrowConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the configuration to a TOML file. Secrets are never written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup (used by tests).
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.secrets.openai_api_key = Some(key);
        }
        if let Some(key) = non_empty("ELEVENLABS_API_KEY") {
            self.secrets.elevenlabs_api_key = Some(key);
        }
        if let Some(path) = non_empty("ARROWBOT_DB_PATH") {
            self.storage.db_path = Some(path);
        }
        if let Some(path) = non_empty("WHISPER_MODEL_PATH") {
            self.voice.whisper_model_path = Some(path);
        }
        if let Some(lang) = non_empty("WHISPER_LANGUAGE") {
            self.voice.whisper_language = lang;
        }
        if let Some(port) = non_empty("ARROWBOT_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.general.port = p,
                Err(_) => warn!(value = %port, "Ignoring invalid ARROWBOT_PORT"),
            }
        }
    }
}

/// General service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    pub host: String,
    pub port: u16,
    /// Requests allowed per client per window.
    pub rate_limit_per_window: u64,
    pub rate_limit_window_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            rate_limit_per_window: 100,
            rate_limit_window_secs: 3600,
        }
    }
}

/// Response cache and counter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub response_ttl_secs: u64,
    pub session_ttl_secs: u64,
    pub timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            response_ttl_secs: 1800,
            session_ttl_secs: 7200,
            timeout_ms: 250,
        }
    }
}

/// Knowledge store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub enabled: bool,
    pub embedding_dim: usize,
    /// Snippets retrieved per question.
    pub top_k: usize,
    /// Use the remote embedding model when an API key is present.
    pub use_remote_embeddings: bool,
    pub embedding_model: String,
    /// Ingest the built-in facts at startup.
    pub seed_defaults: bool,
    pub timeout_secs: u64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            embedding_dim: 384,
            top_k: 3,
            use_remote_embeddings: true,
            embedding_model: "text-embedding-3-small".to_string(),
            seed_defaults: true,
            timeout_secs: 10,
        }
    }
}

/// Generative backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 150,
            temperature: 0.7,
            timeout_secs: 20,
        }
    }
}

/// Conversation log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file. `None` leaves the durable log unconfigured.
    pub db_path: Option<String>,
    pub history_limit: usize,
    pub timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            history_limit: 10,
            timeout_ms: 2000,
        }
    }
}

/// Speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// GGML whisper model. `None` disables speech-to-text.
    pub whisper_model_path: Option<String>,
    pub whisper_language: String,
    pub default_voice: String,
    pub tts_model: String,
    pub timeout_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            whisper_model_path: None,
            whisper_language: "en".to_string(),
            default_voice: "Rachel".to_string(),
            tts_model: "eleven_monolingual_v1".to_string(),
            timeout_secs: 30,
        }
    }
}

/// API keys. Read from the file or environment, never written back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    pub openai_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
}
