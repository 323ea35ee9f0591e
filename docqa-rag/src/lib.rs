//! Multi-tenant retrieval-augmented question answering.
//!
//! This crate answers natural-language questions against per-tenant vector
//! indexes, one namespace per document collection:
//! - namespace-scoped similarity retrieval ([`Retriever`])
//! - score-based reranking with an explicit polarity ([`ScoreReranker`])
//! - grounded prompt assembly with conversation history ([`ContextAssembler`])
//! - per-tenant, per-collection conversation state ([`ConversationStore`])
//! - the orchestrator tying them to a hosted LLM ([`RagPipeline`])
//!
//! Hosted collaborators are behind traits ([`EmbeddingProvider`],
//! [`VectorStore`], [`LanguageModel`]). Gemini and Pinecone clients are
//! provided behind the `gemini` and `pinecone` features.

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod history;
pub mod inmemory;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod reranker;
pub mod retriever;
pub mod retry;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "pinecone")]
pub mod pinecone;

pub use config::{
    ChainMode, Credentials, ModelConfig, RagConfig, RagConfigBuilder, RetryConfig, ScorePolarity,
};
pub use document::{
    ConversationTurn, Metadata, QueryResult, RankedContext, RankedDocument, RetrievedDocument,
    SourceDocument,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result, UpstreamService};
pub use history::{ConversationKey, ConversationStore, InMemoryConversationStore};
pub use inmemory::{InMemoryVectorStore, StoredChunk};
pub use llm::LanguageModel;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use prompt::{ContextAssembler, FALLBACK_ANSWER, GROUNDED_TEMPLATE, PromptTemplate, Slot};
pub use reranker::{NoOpReranker, Reranker, ScoreReranker};
pub use retriever::Retriever;
pub use vectorstore::VectorStore;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiChatModel, GeminiEmbeddingProvider};
#[cfg(feature = "pinecone")]
pub use pinecone::{IndexDescription, PineconeVectorStore};
