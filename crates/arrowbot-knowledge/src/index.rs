//! In-memory vector index with brute-force cosine similarity search.
//!
//! All operations are O(n) for search, which is fine for a knowledge base of
//! a few thousand snippets. Readers never observe a half-applied write; a
//! search running during an ingest may miss the new entry.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use arrowbot_core::error::{ArrowError, Result};
use arrowbot_core::KnowledgeItem;

/// A single hit returned from a vector search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    /// Cosine similarity in [-1.0, 1.0].
    pub score: f64,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

/// Capability contract of a content-addressed embedding index.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Insert or overwrite the item with the same id.
    async fn upsert(&self, item: KnowledgeItem) -> Result<()>;

    /// Return at most `k` hits, most similar first. Equal scores keep
    /// insertion order.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// Number of stored items.
    async fn count(&self) -> Result<usize>;
}

#[derive(Debug, Clone)]
struct IndexEntry {
    seq: u64,
    item: KnowledgeItem,
}

#[derive(Debug, Default)]
struct IndexState {
    entries: HashMap<String, IndexEntry>,
    next_seq: u64,
}

/// In-memory vector index. Thread-safe via interior RwLock.
#[derive(Debug, Default)]
pub struct VectorIndex {
    state: RwLock<IndexState>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, overwriting any entry with the same id.
    ///
    /// An overwritten entry keeps its original insertion position.
    pub fn insert(&self, item: KnowledgeItem) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| ArrowError::Index(format!("Lock poisoned: {}", e)))?;

        let existing = state.entries.get(&item.id).map(|e| e.seq);
        let seq = match existing {
            Some(seq) => seq,
            None => {
                let seq = state.next_seq;
                state.next_seq += 1;
                seq
            }
        };
        state.entries.insert(item.id.clone(), IndexEntry { seq, item });
        Ok(())
    }

    /// Search for the k nearest neighbors by cosine similarity.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let state = self
            .state
            .read()
            .map_err(|e| ArrowError::Index(format!("Lock poisoned: {}", e)))?;

        let mut scored: Vec<(f64, u64, &KnowledgeItem)> = state
            .entries
            .values()
            .map(|entry| {
                (
                    cosine_similarity(query, &entry.item.embedding),
                    entry.seq,
                    &entry.item,
                )
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, _, item)| SearchHit {
                id: item.id.clone(),
                score,
                text: item.text.clone(),
                metadata: item.metadata.clone(),
            })
            .collect())
    }

    /// Look up a stored item by id.
    pub fn get(&self, id: &str) -> Option<KnowledgeItem> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.entries.get(id).map(|e| e.item.clone()))
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorBackend for VectorIndex {
    async fn upsert(&self, item: KnowledgeItem) -> Result<()> {
        self.insert(item)
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.search(vector, k)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.len())
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
