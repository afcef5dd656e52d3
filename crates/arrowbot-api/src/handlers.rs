//! Route handlers for all API endpoints.
//!
//! Each handler extracts the request, calls into the orchestrator, and
//! returns a JSON response. Only malformed input produces an error status;
//! collaborator trouble is absorbed by the orchestrator.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use arrowbot_chat::{AudioReply, ChatReply, ServiceStatus};
use arrowbot_core::Exchange;
use arrowbot_voice::AudioInfo;

use crate::error::ApiError;
use crate::state::AppState;

const SERVICE_NAME: &str = "Arrow Conveyancing AI Chatbot";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest `/api/chat` message accepted, in characters.
const MAX_MESSAGE_LENGTH: usize = 2000;

// =============================================================================
// Index and status
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub message: String,
    pub status: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
}

/// GET / - service banner with the endpoint list.
pub async fn index() -> Json<IndexResponse> {
    let endpoints = [
        ("/api/chat", "POST - Chat with the assistant"),
        ("/api/chat/audio", "POST - Spoken question as WAV body"),
        ("/api/history", "GET - Conversation history"),
        ("/api/feedback", "POST - Rate a response"),
        ("/api/status", "GET - Backend capabilities"),
        ("/api/voices", "GET - Text-to-speech voices"),
        ("/api/audio/info", "GET - Audio backend details"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Json(IndexResponse {
        message: format!("{} API", SERVICE_NAME),
        status: "active".to_string(),
        version: VERSION.to_string(),
        endpoints,
    })
}

/// Which features are usable right now, as plain flags.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeaturesEnabled {
    pub ai_responses: bool,
    pub vector_search: bool,
    pub database: bool,
    pub caching: bool,
    pub audio: bool,
    pub speech_synthesis: bool,
}

impl From<ServiceStatus> for FeaturesEnabled {
    fn from(s: ServiceStatus) -> Self {
        Self {
            ai_responses: s.ai_responses.is_available(),
            vector_search: s.vector_search.is_available(),
            database: s.database.is_available(),
            caching: s.caching.is_available(),
            audio: s.audio.is_available(),
            speech_synthesis: s.speech_synthesis.is_available(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub features_enabled: FeaturesEnabled,
    pub capabilities: ServiceStatus,
}

/// GET /api/status - capability report. Never calls a backend.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let capabilities = state.orchestrator.status();
    Json(StatusResponse {
        status: "online".to_string(),
        service: SERVICE_NAME.to_string(),
        version: VERSION.to_string(),
        features_enabled: capabilities.into(),
        capabilities,
    })
}

// =============================================================================
// Chat
// =============================================================================

/// Request body for POST /api/chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub session_id: Option<String>,
    #[serde(default)]
    pub use_audio: bool,
}

/// POST /api/chat - answer a text message.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = body?;
    let message = body
        .message
        .ok_or_else(|| ApiError::BadRequest("Send JSON with \"message\" field".to_string()))?;
    if message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "message exceeds maximum length of {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }

    let reply = state
        .orchestrator
        .respond(&message, body.session_id.as_deref(), body.use_audio)
        .await;
    Ok(Json(reply))
}

#[derive(Debug, Deserialize)]
pub struct SessionParams {
    pub session_id: Option<String>,
}

/// POST /api/chat/audio - spoken question as the raw request body.
pub async fn chat_audio(
    State(state): State<AppState>,
    Query(params): Query<SessionParams>,
    body: Bytes,
) -> Result<Json<AudioReply>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("No audio data provided".to_string()));
    }
    let reply = state
        .orchestrator
        .process_audio_input(&body, params.session_id.as_deref())
        .await?;
    Ok(Json(reply))
}

// =============================================================================
// History and feedback
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<Exchange>,
    pub total: usize,
    pub session_id: Option<String>,
}

/// GET /api/history - most recent exchanges first.
pub async fn history(
    State(state): State<AppState>,
    Query(params): Query<SessionParams>,
) -> Json<HistoryResponse> {
    let session_id = params.session_id.filter(|s| !s.trim().is_empty());
    let history = state
        .orchestrator
        .get_conversation_history(session_id.as_deref())
        .await;
    Json(HistoryResponse {
        total: history.len(),
        history,
        session_id,
    })
}

/// Request body for POST /api/feedback.
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub message_id: Option<String>,
    pub rating: Option<f64>,
    pub feedback_text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/feedback - record a rating for a response.
pub async fn feedback(
    State(state): State<AppState>,
    body: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let Json(body) = body?;
    let rating = body
        .rating
        .filter(|r| r.is_finite())
        .ok_or_else(|| ApiError::BadRequest("Send JSON with \"rating\" field".to_string()))?;

    let success = state
        .orchestrator
        .save_feedback(body.message_id.as_deref(), rating, body.feedback_text.as_deref())
        .await;

    Ok(Json(FeedbackResponse {
        success,
        message: if success {
            "Feedback saved".to_string()
        } else {
            "Failed to save feedback".to_string()
        },
    }))
}

// =============================================================================
// Voices
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct VoicesResponse {
    pub voices: Vec<String>,
}

/// GET /api/voices - synthesis voices, never empty.
pub async fn voices(State(state): State<AppState>) -> Json<VoicesResponse> {
    Json(VoicesResponse {
        voices: state.orchestrator.get_available_voices().await,
    })
}

/// GET /api/audio/info - speech backend description.
pub async fn audio_info(State(state): State<AppState>) -> Json<AudioInfo> {
    Json(state.orchestrator.audio_info().await)
}
