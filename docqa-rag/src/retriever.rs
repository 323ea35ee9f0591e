//! Namespace-scoped retrieval over a tenant's vector index.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::document::RetrievedDocument;
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, UpstreamService};
use crate::retry::with_timeout;
use crate::vectorstore::VectorStore;

/// Embeds a query and searches one collection of one tenant.
///
/// The tenant id is the index identity and the collection id is the
/// namespace inside it. Each call performs exactly one embedding and one
/// similarity query, and never retries.
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    call_timeout: Option<Duration>,
}

impl Retriever {
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { embedding_provider, vector_store, call_timeout: None }
    }

    /// Bound the embedding call and the search call, each on its own.
    ///
    /// Expiry is reported against the service that timed out.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Return up to `k` documents from `collection_id` of `tenant_id`.
    ///
    /// Documents keep the store's order and scores.
    ///
    /// # Errors
    ///
    /// Propagates [`RagError::NotFound`](crate::RagError::NotFound) for a
    /// missing index or namespace and upstream errors from the embedding
    /// provider or the store unchanged.
    pub async fn retrieve(
        &self,
        tenant_id: &str,
        collection_id: &str,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        let embedding = with_timeout(
            self.call_timeout,
            UpstreamService::Embedding,
            self.embedding_provider.embed(query_text),
        )
        .await
        .inspect_err(|e| {
            error!(tenant = tenant_id, error = %e, "query embedding failed");
        })?;

        let mut documents = with_timeout(
            self.call_timeout,
            UpstreamService::VectorStore,
            self.vector_store.search(tenant_id, collection_id, &embedding, k),
        )
        .await
        .inspect_err(|e| {
            error!(
                tenant = tenant_id,
                collection = collection_id,
                error = %e,
                "vector search failed"
            );
        })?;

        // Stores are trusted for ordering but not for honouring `k`.
        documents.truncate(k);

        debug!(
            tenant = tenant_id,
            collection = collection_id,
            result_count = documents.len(),
            "retrieved documents"
        );
        Ok(documents)
    }
}
