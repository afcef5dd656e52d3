//! Collaborator wiring.
//!
//! Each optional backend is built only when its configuration is present.
//! A backend that fails to build is logged and left absent; nothing here
//! aborts startup.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use arrowbot_cache::{KvBackend, MemoryBackend, RateLimiter, ResponseCache};
use arrowbot_chat::{ChatOrchestrator, PipelineSettings};
use arrowbot_core::config::ArrowConfig;
use arrowbot_knowledge::{DynEmbeddingService, KnowledgeStore, OpenAiEmbedding, VectorBackend, VectorIndex};
use arrowbot_llm::{CompletionBackend, OpenAiCompletion, ResponseGenerator};
use arrowbot_storage::{ConversationStore, Database, ExchangeLog, SqliteExchangeLog};
use arrowbot_voice::{
    AudioTranscoder, ElevenLabsClient, SpeechToText, TextToSpeech, WhisperConfig, WhisperTranscriber,
};

/// Everything the HTTP layer needs.
pub struct Services {
    pub orchestrator: ChatOrchestrator,
    pub limiter: RateLimiter,
    /// Shared in-process key/value store, when caching is enabled.
    pub memory: Option<Arc<MemoryBackend>>,
}

pub async fn build_services(config: &ArrowConfig) -> Services {
    let memory = config.cache.enabled.then(|| Arc::new(MemoryBackend::new()));
    let kv: Option<Arc<dyn KvBackend>> = memory.clone().map(|m| m as Arc<dyn KvBackend>);

    let cache = ResponseCache::connect(kv.clone(), &config.cache).await;
    let limiter = RateLimiter::new(
        kv,
        Duration::from_secs(config.general.rate_limit_window_secs),
        Duration::from_millis(config.cache.timeout_ms),
    );

    let knowledge = build_knowledge(config);
    if config.knowledge.seed_defaults {
        let seeded = knowledge.seed_defaults().await;
        info!(seeded, "Knowledge base seeded");
    }

    let orchestrator = ChatOrchestrator::new(
        cache,
        knowledge,
        build_generator(config),
        build_conversations(config),
        build_audio(config),
    )
    .with_settings(PipelineSettings::from_config(config));

    Services {
        orchestrator,
        limiter,
        memory,
    }
}

fn build_knowledge(config: &ArrowConfig) -> KnowledgeStore {
    let kc = &config.knowledge;
    if !kc.enabled {
        info!("Knowledge store disabled");
        return KnowledgeStore::unconfigured();
    }

    let timeout = Duration::from_secs(kc.timeout_secs);
    let embedder: Option<Box<dyn DynEmbeddingService>> = match &config.secrets.openai_api_key {
        Some(key) if kc.use_remote_embeddings => {
            match OpenAiEmbedding::new(key.clone(), kc.embedding_model.clone(), kc.embedding_dim, timeout) {
                Ok(e) => Some(Box::new(e)),
                Err(e) => {
                    warn!(error = %e, "Remote embeddings unavailable");
                    None
                }
            }
        }
        _ => None,
    };

    let index: Arc<dyn VectorBackend> = Arc::new(VectorIndex::new());
    KnowledgeStore::new(Some(index), embedder, kc.embedding_dim, timeout)
}

fn build_generator(config: &ArrowConfig) -> ResponseGenerator {
    let timeout = Duration::from_secs(config.llm.timeout_secs);
    let backend: Option<Arc<dyn CompletionBackend>> = match &config.secrets.openai_api_key {
        Some(key) => match OpenAiCompletion::new(key.clone(), &config.llm) {
            Ok(c) => Some(Arc::new(c)),
            Err(e) => {
                warn!(error = %e, "Completion backend unavailable");
                None
            }
        },
        None => {
            info!("No OpenAI key; answers come from the fallback table");
            None
        }
    };
    ResponseGenerator::new(backend, timeout)
}

fn build_conversations(config: &ArrowConfig) -> ConversationStore {
    let Some(path) = config.storage.db_path.as_deref() else {
        info!("No database path; conversation log kept in process only");
        return ConversationStore::unconfigured();
    };

    let log: Option<Arc<dyn ExchangeLog>> = match Database::open(Path::new(path)) {
        Ok(db) => Some(Arc::new(SqliteExchangeLog::new(Arc::new(db)))),
        Err(e) => {
            warn!(path, error = %e, "Conversation database unavailable");
            None
        }
    };
    ConversationStore::new(log, Duration::from_millis(config.storage.timeout_ms))
}

fn build_audio(config: &ArrowConfig) -> AudioTranscoder {
    let vc = &config.voice;

    let stt: Option<Arc<dyn SpeechToText>> = match &vc.whisper_model_path {
        Some(path) => {
            let whisper = WhisperTranscriber::new(WhisperConfig {
                model_path: path.clone(),
                language: vc.whisper_language.clone(),
            });
            match whisper {
                Ok(w) => Some(Arc::new(w)),
                Err(e) => {
                    warn!(error = %e, "Speech-to-text unavailable");
                    None
                }
            }
        }
        None => None,
    };

    let tts: Option<Arc<dyn TextToSpeech>> = match &config.secrets.elevenlabs_api_key {
        Some(key) => match ElevenLabsClient::new(key.clone(), vc) {
            Ok(c) => Some(Arc::new(c)),
            Err(e) => {
                warn!(error = %e, "Text-to-speech unavailable");
                None
            }
        },
        None => None,
    };

    AudioTranscoder::new(stt, tts, vc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrowbot_core::Capability;

    #[tokio::test]
    async fn test_default_config_runs_without_secrets() {
        let services = build_services(&ArrowConfig::default()).await;
        let status = services.orchestrator.status();
        assert_eq!(status.caching, Capability::Ready);
        assert_eq!(status.vector_search, Capability::Degraded);
        assert_eq!(status.ai_responses, Capability::Unconfigured);
        assert_eq!(status.database, Capability::Unconfigured);
        assert_eq!(status.audio, Capability::Unconfigured);
        assert_eq!(services.orchestrator.knowledge().len().await, 6);
        assert!(services.memory.is_some());
    }

    #[tokio::test]
    async fn test_disabled_sections_stay_unconfigured() {
        let mut config = ArrowConfig::default();
        config.cache.enabled = false;
        config.knowledge.enabled = false;
        let services = build_services(&config).await;
        let status = services.orchestrator.status();
        assert_eq!(status.caching, Capability::Unconfigured);
        assert_eq!(status.vector_search, Capability::Unconfigured);
        assert_eq!(services.limiter.capability(), Capability::Unconfigured);
        assert!(services.memory.is_none());
    }

    #[tokio::test]
    async fn test_database_path_enables_durable_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ArrowConfig::default();
        config.storage.db_path = Some(dir.path().join("nested/chat.db").to_string_lossy().to_string());
        let services = build_services(&config).await;
        assert_eq!(services.orchestrator.status().database, Capability::Ready);
    }

    #[tokio::test]
    async fn test_missing_whisper_model_is_not_fatal() {
        let mut config = ArrowConfig::default();
        config.voice.whisper_model_path = Some("/nonexistent/ggml-base.en.bin".into());
        let services = build_services(&config).await;
        assert_eq!(services.orchestrator.status().audio, Capability::Unconfigured);
    }

    #[tokio::test]
    async fn test_keys_enable_remote_backends() {
        let mut config = ArrowConfig::default();
        config.secrets.openai_api_key = Some("sk-test".into());
        config.secrets.elevenlabs_api_key = Some("xi-test".into());
        let services = build_services(&config).await;
        let status = services.orchestrator.status();
        assert_eq!(status.ai_responses, Capability::Ready);
        assert_eq!(status.speech_synthesis, Capability::Ready);
    }
}
