//! Arrowbot API crate - axum HTTP transport over the chat orchestrator.
//!
//! Exposes the chat, spoken-input, history, feedback, and voice endpoints,
//! with a per-client request gate in front of the chat routes.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
