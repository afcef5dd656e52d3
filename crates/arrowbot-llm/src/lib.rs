//! Arrowbot LLM crate - answer generation.
//!
//! A generative backend is tried first; any failure or absence falls through
//! to a deterministic keyword table that needs no network.

pub mod completion;
pub mod fallback;
pub mod generator;

pub use completion::{CompletionBackend, OpenAiCompletion};
pub use fallback::FallbackTable;
pub use generator::ResponseGenerator;
