//! Chat orchestrator: runs one message through cache, retrieval, generation,
//! and persistence.
//!
//! The pipeline is strictly sequential per call. Shared state is limited to
//! the collaborators themselves and the transient in-process log.

use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info, warn};

use arrowbot_cache::ResponseCache;
use arrowbot_core::{
    new_session_id, response_cache_key, ArrowConfig, Exchange, FeedbackRecord, Message,
};
use arrowbot_knowledge::KnowledgeStore;
use arrowbot_llm::ResponseGenerator;
use arrowbot_storage::ConversationStore;
use arrowbot_voice::AudioTranscoder;

use crate::error::ChatError;
use crate::types::{AudioReply, ChatReply, ServiceStatus};

/// Oldest transient entries are dropped past this size.
const MAX_TRANSIENT_EXCHANGES: usize = 1000;

/// Tunables for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub response_ttl: Duration,
    pub top_k: usize,
    pub history_limit: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            response_ttl: Duration::from_secs(1800),
            top_k: 3,
            history_limit: 10,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &ArrowConfig) -> Self {
        Self {
            response_ttl: Duration::from_secs(config.cache.response_ttl_secs),
            top_k: config.knowledge.top_k,
            history_limit: config.storage.history_limit,
        }
    }
}

/// Composes the collaborators into the end-to-end chat flows.
pub struct ChatOrchestrator {
    cache: ResponseCache,
    knowledge: KnowledgeStore,
    generator: ResponseGenerator,
    conversations: ConversationStore,
    audio: AudioTranscoder,
    settings: PipelineSettings,
    transient: Mutex<Vec<Exchange>>,
}

impl ChatOrchestrator {
    pub fn new(
        cache: ResponseCache,
        knowledge: KnowledgeStore,
        generator: ResponseGenerator,
        conversations: ConversationStore,
        audio: AudioTranscoder,
    ) -> Self {
        let orchestrator = Self {
            cache,
            knowledge,
            generator,
            conversations,
            audio,
            settings: PipelineSettings::default(),
            transient: Mutex::new(Vec::new()),
        };
        info!(status = ?orchestrator.status(), "Chat orchestrator ready");
        orchestrator
    }

    /// Orchestrator with every optional backend absent.
    pub fn offline() -> Self {
        Self::new(
            ResponseCache::disabled(),
            KnowledgeStore::unconfigured(),
            ResponseGenerator::fallback_only(),
            ConversationStore::unconfigured(),
            AudioTranscoder::disabled(),
        )
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Answer `message`. A missing or blank `session_id` starts a new
    /// session. Any text is answered, blank included; collaborator trouble
    /// degrades to the fallback table.
    pub async fn respond(
        &self,
        message: &str,
        session_id: Option<&str>,
        wants_audio: bool,
    ) -> ChatReply {
        let session_id = session_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(new_session_id);
        let inbound = Message::new(message, session_id);

        let key = response_cache_key(&inbound.text);
        let (response, message_id) = match self.cache.get::<String>(&key).await {
            Some(cached) => {
                debug!(session_id = %inbound.session_id, "Serving cached answer");
                (cached, None)
            }
            None => {
                let answer = self.generate_fresh(&inbound.text, &key).await;
                let exchange =
                    Exchange::new(&inbound.text, answer.clone(), inbound.session_id.clone());
                if !self.conversations.append_exchange(&exchange).await {
                    debug!(id = %exchange.id, "Exchange not persisted");
                }
                let id = exchange.id.to_string();
                self.push_transient(exchange);
                (answer, Some(id))
            }
        };

        let audio = if wants_audio {
            self.audio.text_to_speech(&response, None).await
        } else {
            None
        };

        ChatReply {
            response,
            session_id: inbound.session_id,
            success: true,
            audio,
            user_message: inbound.text,
            message_id,
        }
    }

    /// Retrieve, generate, and cache an answer for a cache miss.
    async fn generate_fresh(&self, message: &str, key: &str) -> String {
        let snippets = self.knowledge.search(message, self.settings.top_k).await;
        debug!(snippets = snippets.len(), "Retrieved context");
        let context = snippets.join(" ");

        let answer = self.generator.generate(message, &context).await;
        if !self.cache.set(key, &answer, self.settings.response_ttl).await {
            debug!("Answer not cached");
        }
        answer
    }

    fn push_transient(&self, exchange: Exchange) {
        let mut log = match self.transient.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Transient history lock poisoned; recovering");
                poisoned.into_inner()
            }
        };
        log.push(exchange);
        if log.len() > MAX_TRANSIENT_EXCHANGES {
            let excess = log.len() - MAX_TRANSIENT_EXCHANGES;
            log.drain(..excess);
        }
    }

    fn transient_snapshot(&self) -> Vec<Exchange> {
        match self.transient.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Transcribe spoken input and answer it with synthesized audio.
    pub async fn process_audio_input(
        &self,
        audio: &[u8],
        session_id: Option<&str>,
    ) -> Result<AudioReply, ChatError> {
        if audio.is_empty() {
            return Err(ChatError::EmptyAudio);
        }

        let text = match self.audio.speech_to_text(audio).await {
            None => return Ok(AudioReply::failed("Could not process audio")),
            Some(text) if text.is_empty() => {
                return Ok(AudioReply::failed("No speech detected in audio"))
            }
            Some(text) => text,
        };
        debug!(chars = text.len(), "Transcribed audio input");

        let reply = self.respond(&text, session_id, true).await;
        Ok(AudioReply::Answered {
            reply,
            transcribed_text: text,
        })
    }

    /// Exchanges, most recent first, capped at the history limit.
    ///
    /// With a session id the durable log is queried; if no durable log is
    /// configured the transient log is filtered by session instead. Without
    /// a session id the transient log is returned.
    pub async fn get_conversation_history(&self, session_id: Option<&str>) -> Vec<Exchange> {
        let limit = self.settings.history_limit;
        let session_id = session_id.map(str::trim).filter(|s| !s.is_empty());

        if let Some(sid) = session_id {
            if self.conversations.capability().is_available() {
                return self.conversations.list_exchanges(Some(sid), limit).await;
            }
        }

        self.transient_snapshot()
            .into_iter()
            .rev()
            .filter(|e| session_id.map_or(true, |sid| e.session_id == sid))
            .take(limit)
            .collect()
    }

    /// Record a rating. `message_id` is not checked against the log.
    pub async fn save_feedback(
        &self,
        message_id: Option<&str>,
        rating: f64,
        feedback_text: Option<&str>,
    ) -> bool {
        let record = FeedbackRecord::new(
            message_id.map(str::to_string),
            rating,
            feedback_text.map(str::to_string),
        );
        self.conversations.append_feedback(&record).await
    }

    pub async fn get_available_voices(&self) -> Vec<String> {
        self.audio.available_voices().await
    }

    pub async fn audio_info(&self) -> arrowbot_voice::AudioInfo {
        self.audio.info().await
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            ai_responses: self.generator.capability(),
            vector_search: self.knowledge.capability(),
            database: self.conversations.capability(),
            caching: self.cache.capability(),
            audio: self.audio.stt_capability(),
            speech_synthesis: self.audio.tts_capability(),
        }
    }

    /// Answer text only.
    pub async fn respond_text(&self, message: &str) -> String {
        self.respond(message, None, false).await.response
    }
}
