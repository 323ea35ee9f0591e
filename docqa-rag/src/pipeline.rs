//! Question-answering pipeline orchestrator.
//!
//! The [`RagPipeline`] answers one question against one tenant collection:
//! read history → retrieve → rerank → assemble prompt → complete → record
//! the turn. It composes an [`EmbeddingProvider`], a [`VectorStore`], a
//! [`LanguageModel`], a [`Reranker`] and a [`ConversationStore`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{
//!     GeminiChatModel, GeminiEmbeddingProvider, PineconeVectorStore, RagConfig, RagPipeline,
//! };
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(GeminiEmbeddingProvider::new(&google_key)?))
//!     .vector_store(Arc::new(PineconeVectorStore::new(&pinecone_key)?))
//!     .language_model(Arc::new(GeminiChatModel::new(&google_key)?))
//!     .build()?;
//!
//! let result = pipeline.answer("acme", "policies", "What is the refund policy?").await?;
//! println!("{}", result.llm_response);
//! ```

use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use crate::config::{ChainMode, RagConfig};
use crate::document::{ConversationTurn, QueryResult, SourceDocument};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, UpstreamService};
use crate::history::{ConversationKey, ConversationStore, InMemoryConversationStore};
use crate::llm::LanguageModel;
use crate::prompt::{ContextAssembler, PromptTemplate, condense_question_prompt};
use crate::reranker::{Reranker, ScoreReranker};
use crate::retriever::Retriever;
use crate::retry::{with_retry, with_timeout};
use crate::vectorstore::VectorStore;

/// The question-answering orchestrator.
///
/// Each [`answer`](RagPipeline::answer) call is an independent sequential
/// pipeline. The only shared mutable state is the conversation store, and
/// the only write to it is the final append after a successful completion.
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    retriever: Retriever,
    reranker: Arc<dyn Reranker>,
    assembler: ContextAssembler,
    language_model: Arc<dyn LanguageModel>,
    conversations: Arc<dyn ConversationStore>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the conversation store backing this pipeline.
    pub fn conversations(&self) -> &Arc<dyn ConversationStore> {
        &self.conversations
    }

    /// Return the turns recorded for a tenant collection, oldest first.
    pub async fn history(
        &self,
        tenant_id: &str,
        collection_id: &str,
    ) -> Result<Vec<ConversationTurn>> {
        self.conversations.history(&ConversationKey::new(tenant_id, collection_id)).await
    }

    /// Answer `query_text` from the `collection_id` namespace of `tenant_id`'s index.
    ///
    /// On success the `(query_text, answer)` turn is appended to the
    /// conversation. On any failure the error is returned as-is and the
    /// conversation is left untouched.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotFound`] if the index or namespace does not exist.
    /// - [`RagError::Upstream`] if the embedding, vector store or LLM call
    ///   fails (after any configured retries).
    #[instrument(skip_all, fields(tenant = tenant_id, collection = collection_id))]
    pub async fn answer(
        &self,
        tenant_id: &str,
        collection_id: &str,
        query_text: &str,
    ) -> Result<QueryResult> {
        // 1. Read (or lazily create) the conversation
        let key = ConversationKey::new(tenant_id, collection_id);
        let history = self.conversations.history(&key).await?;

        // 2. Retrieve top-k for the (possibly condensed) question
        let retrieval_query = self.retrieval_query(&history, query_text).await?;
        let timeout = self.config.call_timeout();
        let top_k = self.config.top_k;
        let retrieved = with_retry(&self.config.retry, "retrieve", || {
            self.retriever.retrieve(tenant_id, collection_id, &retrieval_query, top_k)
        })
        .await?;
        let retrieved_documents: Vec<SourceDocument> =
            retrieved.iter().map(|doc| doc.to_source()).collect();

        // 3. Rerank by store score
        let ranked = self.reranker.rerank(retrieved);

        // 4. Render the grounded prompt
        let prompt = self.assembler.assemble(&ranked, &history, query_text);

        // 5. Complete
        let answer = with_retry(&self.config.retry, "complete", || {
            with_timeout(timeout, UpstreamService::Llm, self.language_model.complete(&prompt))
        })
        .await
        .inspect_err(|e| error!(error = %e, "answer generation failed"))?;

        // 6. Record the turn
        self.conversations.append(&key, ConversationTurn::new(query_text, answer.clone())).await?;

        info!(result_count = ranked.len(), history_turns = history.len(), "query answered");

        // 7. Bundle the response
        Ok(QueryResult {
            query: query_text.to_string(),
            retrieved_documents,
            reranked_documents: ranked.iter().map(|doc| doc.to_ranked()).collect(),
            llm_response: answer,
        })
    }

    /// The text used for retrieval under the configured [`ChainMode`].
    async fn retrieval_query(
        &self,
        history: &[ConversationTurn],
        question: &str,
    ) -> Result<String> {
        if self.config.chain_mode == ChainMode::Direct || history.is_empty() {
            return Ok(question.to_string());
        }

        let prompt = condense_question_prompt(history, question);
        let timeout = self.config.call_timeout();
        let condensed = with_retry(&self.config.retry, "condense", || {
            with_timeout(timeout, UpstreamService::Llm, self.language_model.complete(&prompt))
        })
        .await?;

        let condensed = condensed.trim();
        if condensed.is_empty() {
            debug!("condensed question was empty, retrieving with the original");
            return Ok(question.to_string());
        }
        debug!(standalone = condensed, "condensed follow-up question");
        Ok(condensed.to_string())
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding provider, vector store and language model are required.
/// Everything else has a default:
/// - `config`: [`RagConfig::default()`]
/// - `reranker`: [`ScoreReranker`] using the configured score polarity
/// - `prompt_template`: the grounded template
/// - `conversation_store`: an [`InMemoryConversationStore`] honouring
///   `max_history_turns`
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .language_model(Arc::new(model))
///     .conversation_store(Arc::new(shared_store))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    language_model: Option<Arc<dyn LanguageModel>>,
    reranker: Option<Arc<dyn Reranker>>,
    prompt_template: Option<PromptTemplate>,
    conversation_store: Option<Arc<dyn ConversationStore>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the language model used for answers (and question condensing).
    pub fn language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.language_model = Some(model);
        self
    }

    /// Replace the default score reranker.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Replace the default grounded prompt template.
    pub fn prompt_template(mut self, template: PromptTemplate) -> Self {
        self.prompt_template = Some(template);
        self
    }

    /// Use an existing conversation store, e.g. one shared between pipelines.
    pub fn conversation_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.conversation_store = Some(store);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing,
    /// the configuration is invalid or the prompt template lacks a slot.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let language_model = self
            .language_model
            .ok_or_else(|| RagError::ConfigError("language_model is required".to_string()))?;

        let assembler = match self.prompt_template {
            Some(template) => ContextAssembler::with_template(template)?,
            None => ContextAssembler::new(),
        };
        let reranker = self
            .reranker
            .unwrap_or_else(|| Arc::new(ScoreReranker::new(config.score_polarity)));
        let conversations = self.conversation_store.unwrap_or_else(|| {
            let store = match config.max_history_turns.and_then(NonZeroUsize::new) {
                Some(max) => InMemoryConversationStore::with_max_turns(max),
                None => InMemoryConversationStore::new(),
            };
            Arc::new(store)
        });

        Ok(RagPipeline {
            retriever: Retriever::new(embedding_provider, vector_store)
                .with_call_timeout(config.call_timeout()),
            reranker,
            assembler,
            language_model,
            conversations,
            config,
        })
    }
}
