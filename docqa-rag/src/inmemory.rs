//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by
//! nested `HashMap`s protected by a `tokio::sync::RwLock`. It is suitable for
//! development, testing, and the offline demo.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Metadata, RetrievedDocument};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// A chunk stored in an [`InMemoryVectorStore`] namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub content: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

impl StoredChunk {
    pub fn new(content: impl Into<String>, metadata: Metadata, embedding: Vec<f32>) -> Self {
        Self { content: content.into(), metadata, embedding }
    }
}

type Namespaces = HashMap<String, Vec<StoredChunk>>;

/// An in-memory vector store using cosine similarity for search.
///
/// Indexes are stored as nested maps: index name → namespace → chunks in
/// insertion order. Scores are cosine similarities, so higher is better.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorStore, StoredChunk};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert("acme", "policies", vec![StoredChunk::new(text, metadata, embedding)]).await;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    indexes: RwLock<HashMap<String, Namespaces>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index. No-op if it already exists.
    pub async fn create_index(&self, index: &str) {
        self.indexes.write().await.entry(index.to_string()).or_default();
    }

    /// Append chunks to a namespace, creating the index and namespace if needed.
    pub async fn upsert(&self, index: &str, namespace: &str, chunks: Vec<StoredChunk>) {
        let mut indexes = self.indexes.write().await;
        let stored = indexes
            .entry(index.to_string())
            .or_default()
            .entry(namespace.to_string())
            .or_default();
        debug!(index, namespace, count = chunks.len(), "upserted chunks");
        stored.extend(chunks);
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn search(
        &self,
        index: &str,
        namespace: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        let indexes = self.indexes.read().await;
        let namespaces = indexes.get(index).ok_or_else(|| RagError::index_not_found(index))?;
        let chunks = namespaces
            .get(namespace)
            .ok_or_else(|| RagError::namespace_not_found(index, namespace))?;

        let mut scored: Vec<RetrievedDocument> = chunks
            .iter()
            .map(|chunk| {
                RetrievedDocument::new(
                    chunk.content.clone(),
                    chunk.metadata.clone(),
                    cosine_similarity(&chunk.embedding, embedding),
                )
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}
