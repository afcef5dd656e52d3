//! Router setup with all API routes and middleware.

use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use arrowbot_core::config::ArrowConfig;
use arrowbot_core::error::{ArrowError, Result};

use crate::handlers;
use crate::state::AppState;

/// Uploaded audio may be far larger than a JSON body.
const AUDIO_BODY_LIMIT: usize = 25 * 1024 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Browser widgets are embedded on other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let public_routes = Router::new()
        .route("/", get(handlers::index))
        .route("/api/status", get(handlers::status))
        .route("/api/history", get(handlers::history))
        .route("/api/feedback", post(handlers::feedback))
        .route("/api/voices", get(handlers::voices))
        .route("/api/audio/info", get(handlers::audio_info));

    let rate_limited_routes = Router::new()
        .route("/api/chat", post(handlers::chat))
        .route(
            "/api/chat/audio",
            post(handlers::chat_audio).layer(DefaultBodyLimit::max(AUDIO_BODY_LIMIT)),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::rate_limit::rate_limit_middleware,
        ));

    public_routes
        .merge(rate_limited_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured host and port.
pub async fn start_server(config: &ArrowConfig, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", config.general.host, config.general.port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ArrowError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
