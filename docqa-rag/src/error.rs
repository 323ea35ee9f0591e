//! Error types for the `docqa-rag` crate.

use std::fmt;

use thiserror::Error;

/// The external collaborator an [`RagError::Upstream`] failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamService {
    /// The embedding model.
    Embedding,
    /// The vector index.
    VectorStore,
    /// The chat/completion model.
    Llm,
}

impl fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedding => f.write_str("embedding"),
            Self::VectorStore => f.write_str("vector store"),
            Self::Llm => f.write_str("llm"),
        }
    }
}

/// Errors that can occur while answering a query.
#[derive(Debug, Error)]
pub enum RagError {
    /// The referenced index, or a namespace inside it, does not exist.
    #[error("Not found: index '{index}'{}", namespace_suffix(.namespace))]
    NotFound {
        /// The tenant index that was looked up.
        index: String,
        /// The namespace, when the index exists but the namespace does not.
        namespace: Option<String>,
    },

    /// An embedding, vector store, or LLM provider call failed.
    #[error("Upstream {service} error ({provider}): {message}")]
    Upstream {
        /// Which collaborator failed.
        service: UpstreamService,
        /// The provider that produced the error.
        provider: String,
        /// The provider's error detail.
        message: String,
        /// Whether a retry might succeed (timeouts, rate limits, 5xx).
        retryable: bool,
    },

    /// Missing credential or invalid configuration. Raised at initialization.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    /// Build a [`RagError::NotFound`] for a missing index.
    pub fn index_not_found(index: impl Into<String>) -> Self {
        Self::NotFound { index: index.into(), namespace: None }
    }

    /// Build a [`RagError::NotFound`] for a missing namespace in an existing index.
    pub fn namespace_not_found(index: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::NotFound { index: index.into(), namespace: Some(namespace.into()) }
    }

    /// Build a [`RagError::Upstream`] failure.
    pub fn upstream(
        service: UpstreamService,
        provider: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self::Upstream { service, provider: provider.into(), message: message.into(), retryable }
    }

    /// Whether the error is transient and the failed call may be retried.
    ///
    /// Only upstream failures flagged as retryable qualify; authentication,
    /// validation, not-found and configuration errors never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream { retryable: true, .. })
    }
}

fn namespace_suffix(namespace: &Option<String>) -> String {
    namespace.as_deref().map(|ns| format!(", namespace '{ns}'")).unwrap_or_default()
}

/// Classify an HTTP status code from a provider as retryable or not.
///
/// Request timeouts, rate limiting and server errors are transient;
/// everything else (bad request, auth, not found) is permanent.
pub fn classify_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (500..600).contains(&status)
}

/// A convenience result type for query operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(classify_status(429));
        assert!(classify_status(408));
        assert!(classify_status(503));
        assert!(!classify_status(400));
        assert!(!classify_status(401));
        assert!(!classify_status(403));
        assert!(!classify_status(404));
    }

    #[test]
    fn only_flagged_upstream_errors_are_retryable() {
        assert!(RagError::upstream(UpstreamService::Llm, "Gemini", "503", true).is_retryable());
        assert!(!RagError::upstream(UpstreamService::Llm, "Gemini", "401", false).is_retryable());
        assert!(!RagError::index_not_found("acme").is_retryable());
        assert!(!RagError::ConfigError("missing key".into()).is_retryable());
    }

    #[test]
    fn not_found_display_names_namespace() {
        let err = RagError::namespace_not_found("acme", "policies");
        assert_eq!(err.to_string(), "Not found: index 'acme', namespace 'policies'");
        assert_eq!(RagError::index_not_found("acme").to_string(), "Not found: index 'acme'");
    }
}
