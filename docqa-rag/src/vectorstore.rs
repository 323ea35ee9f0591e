//! Vector store trait for namespace-scoped similarity search.

use async_trait::async_trait;

use crate::document::RetrievedDocument;
use crate::error::Result;

/// A read-only view of a vector index partitioned into namespaces.
///
/// Each tenant owns one index; each of the tenant's collections is a
/// namespace inside it. A search never sees documents from another
/// namespace or another index.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert("acme", "policies", documents).await;
/// let results = store.search("acme", "policies", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Search `namespace` of `index` for the `top_k` chunks nearest to `embedding`.
    ///
    /// Results come back in the store's native order with the store's native
    /// scores; callers must not assume the order is descending.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`](crate::RagError::NotFound) when the
    /// index or namespace does not exist.
    async fn search(
        &self,
        index: &str,
        namespace: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>>;
}
