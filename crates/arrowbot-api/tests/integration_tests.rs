//! Integration tests for the HTTP surface, each against its own in-memory
//! state.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use arrowbot_api::create_router;
use arrowbot_api::state::AppState;
use arrowbot_cache::{MemoryBackend, RateLimiter, ResponseCache};
use arrowbot_chat::ChatOrchestrator;
use arrowbot_knowledge::KnowledgeStore;
use arrowbot_llm::ResponseGenerator;
use arrowbot_storage::{ConversationStore, Database, SqliteExchangeLog};
use arrowbot_voice::AudioTranscoder;

// =============================================================================
// Helpers
// =============================================================================

fn limiter() -> RateLimiter {
    RateLimiter::new(
        Some(Arc::new(MemoryBackend::new())),
        Duration::from_secs(3600),
        Duration::from_secs(1),
    )
}

/// Offline orchestrator, generous rate limit.
fn make_app() -> axum::Router {
    create_router(AppState::new(ChatOrchestrator::offline(), limiter(), 100))
}

fn make_app_with_limit(limit: u64) -> axum::Router {
    create_router(AppState::new(ChatOrchestrator::offline(), limiter(), limit))
}

/// Orchestrator with a SQLite conversation log.
fn make_persistent_app() -> axum::Router {
    let log = SqliteExchangeLog::new(Arc::new(Database::in_memory().unwrap()));
    let orchestrator = ChatOrchestrator::new(
        ResponseCache::disabled(),
        KnowledgeStore::unconfigured(),
        ResponseGenerator::fallback_only(),
        ConversationStore::new(Some(Arc::new(log)), Duration::from_secs(2)),
        AudioTranscoder::disabled(),
    );
    create_router(AppState::new(orchestrator, limiter(), 100))
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn post_json_from(uri: &str, json: &str, client: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(json.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Index and status
// =============================================================================

#[tokio::test]
async fn test_index_lists_endpoints() {
    let resp = make_app().oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "active");
    assert!(json["endpoints"]["/api/chat"].is_string());
}

#[tokio::test]
async fn test_status_reports_offline_capabilities() {
    let resp = make_app().oneshot(get("/api/status")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "online");
    assert_eq!(json["features_enabled"]["ai_responses"], false);
    assert_eq!(json["features_enabled"]["database"], false);
    assert_eq!(json["capabilities"]["caching"], "unconfigured");
}

#[tokio::test]
async fn test_status_reports_database() {
    let resp = make_persistent_app().oneshot(get("/api/status")).await.unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["features_enabled"]["database"], true);
    assert_eq!(json["capabilities"]["database"], "ready");
}

// =============================================================================
// Chat
// =============================================================================

#[tokio::test]
async fn test_chat_happy_path() {
    let resp = make_app()
        .oneshot(post_json("/api/chat", r#"{"message":"What services do you offer?"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(
        json["response"],
        "Arrow Conveyancing offers property legal services, conveyancing, and fixed-fee legal work."
    );
    assert_eq!(json["user_message"], "What services do you offer?");
    assert!(!json["session_id"].as_str().unwrap().is_empty());
    assert!(json["message_id"].is_string());
    assert!(json.get("audio").is_none());
}

#[tokio::test]
async fn test_chat_keeps_given_session() {
    let resp = make_app()
        .oneshot(post_json(
            "/api/chat",
            r#"{"message":"hello","session_id":"abc","use_audio":true}"#,
        ))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["session_id"], "abc");
    // No synthesis backend, so no audio even though it was requested.
    assert!(json.get("audio").is_none());
}

#[tokio::test]
async fn test_chat_missing_message_returns_400() {
    let resp = make_app()
        .oneshot(post_json("/api/chat", r#"{"session_id":"abc"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "bad_request");
}

#[tokio::test]
async fn test_chat_blank_message_gets_default_answer() {
    let resp = make_app()
        .oneshot(post_json("/api/chat", r#"{"message":"   "}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(
        json["response"],
        "I can help with conveyancing questions. Ask about services, fees, or contact information."
    );
}

#[tokio::test]
async fn test_chat_oversized_message_returns_400() {
    let body = serde_json::json!({ "message": "a".repeat(2001) }).to_string();
    let resp = make_app().oneshot(post_json("/api/chat", &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("2000"));

    let body = serde_json::json!({ "message": "é".repeat(2000) }).to_string();
    let resp = make_app().oneshot(post_json("/api/chat", &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_chat_malformed_json_returns_400() {
    let resp = make_app()
        .oneshot(post_json("/api/chat", "{not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let no_content_type = Request::post("/api/chat")
        .body(Body::from(r#"{"message":"hi"}"#))
        .unwrap();
    let resp = make_app().oneshot(no_content_type).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test]
async fn test_rate_limit_per_client() {
    let app = make_app_with_limit(2);
    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(post_json_from("/api/chat", r#"{"message":"hello"}"#, "198.51.100.1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .clone()
        .oneshot(post_json_from("/api/chat", r#"{"message":"hello"}"#, "198.51.100.1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "too_many_requests");

    let resp = app
        .oneshot(post_json_from("/api/chat", r#"{"message":"hello"}"#, "198.51.100.2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_only_guards_chat_routes() {
    let app = make_app_with_limit(0);
    let resp = app
        .clone()
        .oneshot(post_json("/api/chat", r#"{"message":"hello"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let resp = app.oneshot(get("/api/status")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unreachable_limiter_lets_requests_through() {
    let limiter = RateLimiter::new(None, Duration::from_secs(3600), Duration::from_secs(1));
    let app = create_router(AppState::new(ChatOrchestrator::offline(), limiter, 1));
    for _ in 0..3 {
        let resp = app
            .clone()
            .oneshot(post_json("/api/chat", r#"{"message":"hello"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

// =============================================================================
// Audio
// =============================================================================

#[tokio::test]
async fn test_chat_audio_empty_body_returns_400() {
    let req = Request::post("/api/chat/audio").body(Body::empty()).unwrap();
    let resp = make_app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_audio_without_model_fails_softly() {
    let req = Request::post("/api/chat/audio?session_id=v1")
        .header("content-type", "audio/wav")
        .body(Body::from(vec![0u8, 1, 2, 3, 4]))
        .unwrap();
    let resp = make_app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Could not process audio");
}

#[tokio::test]
async fn test_voices_never_empty() {
    let resp = make_app().oneshot(get("/api/voices")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let voices = json["voices"].as_array().unwrap();
    assert_eq!(voices.len(), 4);
    assert_eq!(voices[0], "Rachel");
}

#[tokio::test]
async fn test_audio_info_offline() {
    let resp = make_app().oneshot(get("/api/audio/info")).await.unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["speech_to_text"], "unconfigured");
    assert_eq!(json["text_to_speech"], "unconfigured");
    assert_eq!(json["default_voice"], "Rachel");
    assert!(json["whisper_model"].is_null());
}

// =============================================================================
// History and feedback
// =============================================================================

#[tokio::test]
async fn test_history_by_session_most_recent_first() {
    let app = make_persistent_app();
    for (msg, sid) in [("hello", "s1"), ("fees", "s2"), ("contact", "s1")] {
        let body = serde_json::json!({ "message": msg, "session_id": sid }).to_string();
        let resp = app.clone().oneshot(post_json("/api/chat", &body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app.clone().oneshot(get("/api/history?session_id=s1")).await.unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["session_id"], "s1");
    assert_eq!(json["history"][0]["user_message"], "contact");
    assert_eq!(json["history"][1]["user_message"], "hello");

    let resp = app.oneshot(get("/api/history")).await.unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["total"], 3);
    assert!(json["session_id"].is_null());
}

#[tokio::test]
async fn test_history_without_storage_uses_process_log() {
    let app = make_app();
    app.clone()
        .oneshot(post_json("/api/chat", r#"{"message":"hello","session_id":"t"}"#))
        .await
        .unwrap();

    let resp = app.oneshot(get("/api/history?session_id=t")).await.unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["total"], 1);
    assert!(!json["history"][0]["bot_response"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_feedback_saved() {
    let resp = make_persistent_app()
        .oneshot(post_json(
            "/api/feedback",
            r#"{"message_id":"whatever","rating":5,"feedback_text":"great"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Feedback saved");
}

#[tokio::test]
async fn test_feedback_without_storage_reports_failure() {
    let resp = make_app()
        .oneshot(post_json("/api/feedback", r#"{"rating":3}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Failed to save feedback");
}

#[tokio::test]
async fn test_feedback_missing_rating_returns_400() {
    let resp = make_app()
        .oneshot(post_json("/api/feedback", r#"{"message_id":"x"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "bad_request");
}
