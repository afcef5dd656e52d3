//! Embedding service trait and implementations.
//!
//! - `OpenAiEmbedding` calls a hosted embedding model over HTTP. This is the
//!   semantic backend.
//! - `HashEmbedding` is the deterministic fallback used when no semantic
//!   model is configured. It fills every dimension with one value derived
//!   from a SHA-256 of the text, so all non-zero vectors point the same way
//!   and cosine similarity cannot tell them apart. Retrieval keeps working
//!   but degenerates to insertion order.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use arrowbot_core::digest::digest_u64;
use arrowbot_core::error::{ArrowError, Result};

/// Service for generating text embeddings of a fixed dimensionality.
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;

    /// Short name used in logs and status output.
    fn name(&self) -> &str;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
pub trait DynEmbeddingService: Send + Sync {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>>> + Send + 'a>>;

    fn dimensions(&self) -> usize;

    fn name(&self) -> &str;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }

    fn name(&self) -> &str {
        EmbeddingService::name(self)
    }
}

// ---------------------------------------------------------------------------
// HashEmbedding
// ---------------------------------------------------------------------------

/// Deterministic low-quality embedding: `(hash % 1000) / 1000` broadcast to
/// every dimension.
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dimensions: usize,
}

impl HashEmbedding {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let value = (digest_u64(text) % 1000) as f32 / 1000.0;
        vec![value; self.dimensions]
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingService for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

// ---------------------------------------------------------------------------
// OpenAiEmbedding
// ---------------------------------------------------------------------------

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Hosted embedding model reached over the OpenAI embeddings endpoint.
#[derive(Clone)]
pub struct OpenAiEmbedding {
    client: Client,
    api_key: String,
    model: String,
    dimensions: usize,
    url: String,
}

impl std::fmt::Debug for OpenAiEmbedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedding")
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl OpenAiEmbedding {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ArrowError::Embedding(format!("HTTP client: {}", e)))?;
        let model = model.into();
        info!(model = %model, dimensions, "Remote embedding model configured");
        Ok(Self {
            client,
            api_key: api_key.into(),
            model,
            dimensions,
            url: OPENAI_EMBEDDINGS_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (proxies, self-hosted APIs).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn parse_response(&self, body: EmbeddingResponse) -> Result<Vec<f32>> {
        let vector = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ArrowError::Embedding("Empty embedding response".to_string()))?;
        if vector.len() != self.dimensions {
            return Err(ArrowError::Embedding(format!(
                "Expected {} dimensions, got {}",
                self.dimensions,
                vector.len()
            )));
        }
        Ok(vector)
    }
}

impl EmbeddingService for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(ArrowError::Embedding("Cannot embed empty text".to_string()));
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
            dimensions: self.dimensions,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ArrowError::Embedding(format!("Embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArrowError::Embedding(format!(
                "Embedding API returned {}: {}",
                status, body
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ArrowError::Embedding(format!("Malformed embedding response: {}", e)))?;
        self.parse_response(body)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_embedding_dimension() {
        let service = HashEmbedding::new(384);
        let vec = service.embed("hello world").await.unwrap();
        assert_eq!(vec.len(), 384);
    }

    #[tokio::test]
    async fn test_hash_embedding_deterministic() {
        let service = HashEmbedding::default();
        let v1 = service.embed("same text").await.unwrap();
        let v2 = service.embed("same text").await.unwrap();
        assert_eq!(v1, v2);
    }

    #[tokio::test]
    async fn test_hash_embedding_is_broadcast() {
        let service = HashEmbedding::new(16);
        let vec = service.embed("fixed fees").await.unwrap();
        assert!(vec.iter().all(|v| *v == vec[0]));
        assert!((0.0..1.0).contains(&vec[0]));
    }

    #[tokio::test]
    async fn test_hash_embedding_accepts_empty_and_unicode() {
        let service = HashEmbedding::new(8);
        assert_eq!(service.embed("").await.unwrap().len(), 8);
        assert_eq!(service.embed("\u{1f3e0} conveyancing").await.unwrap().len(), 8);
    }

    #[test]
    fn test_dyn_dispatch() {
        let boxed: Box<dyn DynEmbeddingService> = Box::new(HashEmbedding::new(32));
        assert_eq!(boxed.dimensions(), 32);
        assert_eq!(boxed.name(), "hash");
    }

    #[test]
    fn test_request_body_shape() {
        let req = EmbeddingRequest {
            model: "text-embedding-3-small",
            input: "hello",
            dimensions: 384,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "text-embedding-3-small");
        assert_eq!(json["input"], "hello");
        assert_eq!(json["dimensions"], 384);
    }

    #[test]
    fn test_parse_response_checks_dimensions() {
        let svc = OpenAiEmbedding::new("sk", "m", 3, Duration::from_secs(1)).unwrap();

        let ok: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[0.1,0.2,0.3]}]}"#).unwrap();
        assert_eq!(svc.parse_response(ok).unwrap(), vec![0.1, 0.2, 0.3]);

        let wrong: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[0.1]}]}"#).unwrap();
        assert!(svc.parse_response(wrong).is_err());

        let empty: EmbeddingResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(svc.parse_response(empty).is_err());
    }

    #[tokio::test]
    async fn test_remote_embedding_rejects_empty_text() {
        let svc = OpenAiEmbedding::new("sk", "m", 3, Duration::from_secs(1)).unwrap();
        assert!(svc.embed("  ").await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let svc = OpenAiEmbedding::new("sk", "m", 3, Duration::from_millis(500))
            .unwrap()
            .with_url("http://127.0.0.1:9/v1/embeddings");
        assert!(svc.embed("hello").await.is_err());
    }
}
