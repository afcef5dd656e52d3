use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the Arrowbot system.
///
/// Collaborator calls return this type so each component can branch on a
/// typed failure and take its fallback. None of these reach the caller of
/// the chat pipeline except [`ArrowError::InvalidInput`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArrowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} is not configured")]
    Unconfigured(&'static str),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("{operation} timed out after {millis} ms")]
    Timeout { operation: String, millis: u128 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ArrowError {
    fn from(err: toml::de::Error) -> Self {
        ArrowError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ArrowError {
    fn from(err: toml::ser::Error) -> Self {
        ArrowError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ArrowError {
    fn from(err: serde_json::Error) -> Self {
        ArrowError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Arrowbot operations.
pub type Result<T> = std::result::Result<T, ArrowError>;

/// Run a collaborator call under a deadline.
///
/// An elapsed deadline is reported as [`ArrowError::Timeout`], which callers
/// handle exactly like any other backend failure.
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ArrowError::Timeout {
            operation: operation.to_string(),
            millis: limit.as_millis(),
        }),
    }
}
