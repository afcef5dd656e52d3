//! Knowledge store: embed-and-index on ingest, embed-and-rank on search.
//!
//! The embedding function is fixed when the store is built. Switching
//! functions between ingest and query gives no error, only silently worse
//! rankings, so a semantic model that fails at call time makes that call
//! fail soft instead of falling back to the hash embedding.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use arrowbot_core::error::with_timeout;
use arrowbot_core::{Capability, KnowledgeItem};

use crate::defaults::{DEFAULT_FACTS, DEFAULT_SOURCE};
use crate::embedding::{DynEmbeddingService, HashEmbedding};
use crate::index::{SearchHit, VectorBackend};

/// Stores and retrieves semantically-embedded text snippets.
pub struct KnowledgeStore {
    index: Option<Arc<dyn VectorBackend>>,
    embedder: Box<dyn DynEmbeddingService>,
    capability: Capability,
    timeout: Duration,
}

impl KnowledgeStore {
    /// Build a store.
    ///
    /// Without a semantic `embedder`, or with one whose dimensionality does
    /// not match `dimensions`, the hash embedding is used and the store
    /// reports [`Capability::Degraded`]. Without an `index` the store is
    /// unconfigured: ingest returns false and search returns nothing.
    pub fn new(
        index: Option<Arc<dyn VectorBackend>>,
        embedder: Option<Box<dyn DynEmbeddingService>>,
        dimensions: usize,
        timeout: Duration,
    ) -> Self {
        let semantic = embedder.filter(|e| {
            let ok = e.dimensions() == dimensions;
            if !ok {
                warn!(
                    model = e.name(),
                    expected = dimensions,
                    actual = e.dimensions(),
                    "Embedding dimensions mismatch; using hash embedding"
                );
            }
            ok
        });

        let (embedder, capability): (Box<dyn DynEmbeddingService>, Capability) =
            match (&index, semantic) {
                (None, _) => (Box::new(HashEmbedding::new(dimensions)), Capability::Unconfigured),
                (Some(_), Some(e)) => (e, Capability::Ready),
                (Some(_), None) => {
                    warn!("No semantic embedding model; retrieval quality reduced");
                    (Box::new(HashEmbedding::new(dimensions)), Capability::Degraded)
                }
            };

        info!(
            capability = %capability,
            embedder = embedder.name(),
            dimensions,
            "Knowledge store initialized"
        );

        Self {
            index,
            embedder,
            capability,
            timeout,
        }
    }

    /// A store with no index.
    pub fn unconfigured() -> Self {
        Self::new(None, None, 384, Duration::from_secs(10))
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Name of the embedding function in use.
    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    /// Embed and store `text`. Re-ingesting identical text overwrites the
    /// previous entry. Returns whether the snippet was stored.
    pub async fn ingest(&self, text: &str, metadata: BTreeMap<String, String>) -> bool {
        let Some(index) = self.index.as_ref() else {
            return false;
        };
        if text.trim().is_empty() {
            debug!("Skipping empty knowledge snippet");
            return false;
        }

        let embedding =
            match with_timeout(self.timeout, "embed snippet", self.embedder.embed_boxed(text)).await
            {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "Failed to embed knowledge snippet");
                    return false;
                }
            };

        let item = KnowledgeItem::new(text, metadata, embedding);
        let id = item.id.clone();
        match with_timeout(self.timeout, "index upsert", index.upsert(item)).await {
            Ok(()) => {
                debug!(id = %id, "Stored knowledge snippet");
                true
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Failed to store knowledge snippet");
                false
            }
        }
    }

    /// Texts of the `k` most relevant snippets, most relevant first.
    pub async fn search(&self, query: &str, k: usize) -> Vec<String> {
        self.search_hits(query, k)
            .await
            .into_iter()
            .map(|hit| hit.text)
            .collect()
    }

    /// Like [`KnowledgeStore::search`] but with scores and metadata.
    pub async fn search_hits(&self, query: &str, k: usize) -> Vec<SearchHit> {
        let Some(index) = self.index.as_ref() else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        let vector =
            match with_timeout(self.timeout, "embed query", self.embedder.embed_boxed(query)).await
            {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "Failed to embed query");
                    return Vec::new();
                }
            };

        match with_timeout(self.timeout, "index query", index.query(&vector, k)).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Knowledge search failed");
                Vec::new()
            }
        }
    }

    /// Ingest the built-in facts. Returns how many were stored.
    pub async fn seed_defaults(&self) -> usize {
        let mut stored = 0;
        for fact in DEFAULT_FACTS {
            let mut metadata = BTreeMap::new();
            metadata.insert("source".to_string(), DEFAULT_SOURCE.to_string());
            if self.ingest(fact, metadata).await {
                stored += 1;
            }
        }
        info!(stored, "Seeded default knowledge base");
        stored
    }

    /// Number of indexed snippets, 0 when the index is unavailable.
    pub async fn len(&self) -> usize {
        match self.index.as_ref() {
            Some(index) => with_timeout(self.timeout, "index count", index.count())
                .await
                .unwrap_or(0),
            None => 0,
        }
    }
}
