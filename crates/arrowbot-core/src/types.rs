use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::digest::knowledge_id;

// =============================================================================
// Message
// =============================================================================

/// An inbound user message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(text: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            session_id: session_id.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Generate a fresh opaque session identifier.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Exchange / Feedback
// =============================================================================

/// One logged user-message/bot-response pair. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: Uuid,
    pub user_message: String,
    pub bot_response: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Exchange {
    pub fn new(
        user_message: impl Into<String>,
        bot_response: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_message: user_message.into(),
            bot_response: bot_response.into(),
            session_id: session_id.into(),
            timestamp: Utc::now(),
        }
    }
}

/// User feedback on a response.
///
/// `message_id` is not checked against stored exchanges; dangling ids are
/// accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub message_id: Option<String>,
    pub rating: f64,
    pub feedback_text: String,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(message_id: Option<String>, rating: f64, feedback_text: Option<String>) -> Self {
        Self {
            message_id,
            rating,
            feedback_text: feedback_text.unwrap_or_default(),
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// Knowledge
// =============================================================================

/// A stored knowledge snippet with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    /// Derived from `text`; identical text always yields the same id.
    pub id: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
    pub embedding: Vec<f32>,
}

impl KnowledgeItem {
    pub fn new(text: impl Into<String>, metadata: BTreeMap<String, String>, embedding: Vec<f32>) -> Self {
        let text = text.into();
        Self {
            id: knowledge_id(&text),
            text,
            metadata,
            embedding,
        }
    }
}

// =============================================================================
// Audio
// =============================================================================

/// Synthesized speech, base64-encoded, tagged with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedAudio {
    pub mime_type: String,
    /// Standard base64 of the raw audio bytes.
    pub data: String,
}
