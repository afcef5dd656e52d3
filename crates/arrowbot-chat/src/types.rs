use serde::{Deserialize, Serialize};

use arrowbot_core::{Capability, EncodedAudio};

// =============================================================================
// Replies
// =============================================================================

/// Result of one pass through the response pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
    pub success: bool,
    /// Present only when audio was requested and synthesis succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<EncodedAudio>,
    pub user_message: String,
    /// Id of the logged exchange. Absent for answers served from cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// Result of the spoken-input flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AudioReply {
    Answered {
        #[serde(flatten)]
        reply: ChatReply,
        transcribed_text: String,
    },
    Failed {
        success: bool,
        error: String,
    },
}

impl AudioReply {
    pub fn failed(error: impl Into<String>) -> Self {
        AudioReply::Failed {
            success: false,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AudioReply::Answered { .. })
    }
}

// =============================================================================
// Status
// =============================================================================

/// Capability of every collaborator, captured without invoking any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub ai_responses: Capability,
    pub vector_search: Capability,
    pub database: Capability,
    pub caching: Capability,
    pub audio: Capability,
    pub speech_synthesis: Capability,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply() -> ChatReply {
        ChatReply {
            response: "Hello!".into(),
            session_id: "s".into(),
            success: true,
            audio: None,
            user_message: "hi".into(),
            message_id: None,
        }
    }

    #[test]
    fn test_audio_field_omitted_when_absent() {
        let json = serde_json::to_value(reply()).unwrap();
        assert!(json.get("audio").is_none());
        assert!(json.get("message_id").is_none());
        assert_eq!(json["success"], true);
    }

    #[test]
    fn test_audio_reply_shapes() {
        let answered = AudioReply::Answered {
            reply: reply(),
            transcribed_text: "hi".into(),
        };
        let json = serde_json::to_value(&answered).unwrap();
        assert_eq!(json["transcribed_text"], "hi");
        assert_eq!(json["response"], "Hello!");
        assert!(answered.is_success());

        let failed = AudioReply::failed("Could not process audio");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "Could not process audio"}));
        assert!(!failed.is_success());
    }
}
