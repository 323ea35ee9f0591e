//! Data types for retrieved documents, ranked context, and query results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arbitrary source-attribution metadata (file, page, ...) attached by the vector store.
pub type Metadata = Map<String, Value>;

/// A text chunk returned by the vector store together with its similarity score.
///
/// Constructed by the retriever and owned by the query that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedDocument {
    /// The raw text of the chunk.
    pub content: String,
    /// Metadata stored alongside the chunk, passed through unchanged.
    pub metadata: Metadata,
    /// The store's score for this chunk. Polarity depends on the index metric.
    pub score: f32,
}

impl RetrievedDocument {
    /// Create a document with the given content, metadata and score.
    pub fn new(content: impl Into<String>, metadata: Metadata, score: f32) -> Self {
        Self { content: content.into(), metadata, score }
    }

    /// The display form used in [`QueryResult::retrieved_documents`].
    pub fn to_source(&self) -> SourceDocument {
        SourceDocument { content: self.content.clone(), metadata: self.metadata.clone() }
    }

    /// The scored form used in [`QueryResult::reranked_documents`].
    pub fn to_ranked(&self) -> RankedDocument {
        RankedDocument {
            content: self.content.clone(),
            metadata: self.metadata.clone(),
            similarity: self.score,
        }
    }
}

/// Retrieved documents in final rank order.
///
/// Normally produced by a [`Reranker`](crate::reranker::Reranker); the
/// context assembler consumes it in iteration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedContext {
    documents: Vec<RetrievedDocument>,
}

impl RankedContext {
    /// Wrap documents that are already in rank order.
    pub fn from_ranked(documents: Vec<RetrievedDocument>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &[RetrievedDocument] {
        &self.documents
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RetrievedDocument> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn into_documents(self) -> Vec<RetrievedDocument> {
        self.documents
    }
}

impl<'a> IntoIterator for &'a RankedContext {
    type Item = &'a RetrievedDocument;
    type IntoIter = std::slice::Iter<'a, RetrievedDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

/// One question/answer exchange in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { question: question.into(), answer: answer.into() }
    }
}

/// A retrieved document as shown to the caller, without its score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDocument {
    pub content: String,
    pub metadata: Metadata,
}

/// A reranked document as shown to the caller, with its score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedDocument {
    pub content: String,
    pub metadata: Metadata,
    pub similarity: f32,
}

/// The structured response to a single query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    /// The question exactly as the caller asked it.
    pub query: String,
    /// Documents in the order the vector store returned them.
    pub retrieved_documents: Vec<SourceDocument>,
    /// Documents in rank order, with scores.
    pub reranked_documents: Vec<RankedDocument>,
    /// The model's answer.
    pub llm_response: String,
}
