//! Input errors for the chat pipeline.

/// Malformed input rejected before the pipeline runs.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("no audio data provided")]
    EmptyAudio,
}
