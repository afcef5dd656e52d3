//! Arrowbot knowledge crate - embeddings, vector index, and knowledge store.
//!
//! Snippets are embedded at ingest time and retrieved by cosine similarity.
//! The same embedding function must be used for ingest and query; the store
//! picks it once at construction and never mixes the two.

pub mod defaults;
pub mod embedding;
pub mod index;
pub mod store;

pub use embedding::{DynEmbeddingService, EmbeddingService, HashEmbedding, OpenAiEmbedding};
pub use index::{SearchHit, VectorBackend, VectorIndex};
pub use store::KnowledgeStore;
