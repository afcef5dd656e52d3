//! Application state shared across all route handlers.

use std::sync::Arc;

use arrowbot_cache::RateLimiter;
use arrowbot_chat::ChatOrchestrator;

/// Shared application state, cloned into every handler task.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    /// Per-client request counter guarding the chat routes.
    pub limiter: RateLimiter,
    /// Requests allowed per client per limiter window.
    pub rate_limit: u64,
}

impl AppState {
    pub fn new(orchestrator: ChatOrchestrator, limiter: RateLimiter, rate_limit: u64) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            limiter,
            rate_limit,
        }
    }
}
