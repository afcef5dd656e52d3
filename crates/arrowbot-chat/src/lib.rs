//! Arrowbot Chat crate - the response pipeline.
//!
//! [`ChatOrchestrator`] composes the cache, knowledge store, generator,
//! conversation store, and audio transcoder into the respond and
//! process-audio flows. Only malformed input is reported as an error; every
//! collaborator failure degrades to a fallback.

pub mod error;
pub mod orchestrator;
pub mod types;

pub use error::ChatError;
pub use orchestrator::{ChatOrchestrator, PipelineSettings};
pub use types::{AudioReply, ChatReply, ServiceStatus};
