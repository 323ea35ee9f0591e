//! Pinecone vector store backend.
//!
//! Provides [`PineconeVectorStore`] which implements [`VectorStore`] over the
//! Pinecone REST API. Each tenant maps to a Pinecone index and each
//! collection to a namespace in that index.
//!
//! This module is only available when the `pinecone` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::PineconeVectorStore;
//!
//! let store = PineconeVectorStore::new("pc-api-key")?;
//! let results = store.search("acme", "policies", &query_embedding, 5).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::config::ScorePolarity;
use crate::document::{Metadata, RetrievedDocument};
use crate::error::{RagError, Result, UpstreamService, classify_status};
use crate::vectorstore::VectorStore;

/// The Pinecone control plane endpoint.
const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

const API_VERSION: &str = "2024-07";

const BACKEND: &str = "Pinecone";

/// Metadata key holding the chunk text, as written by the ingestion side.
const DEFAULT_TEXT_KEY: &str = "text";

/// What the control plane reports about an index.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    pub dimension: usize,
    /// `cosine`, `dotproduct` or `euclidean`.
    pub metric: String,
    /// Data plane host, without scheme.
    pub host: String,
}

impl IndexDescription {
    /// The score convention implied by the index metric.
    pub fn score_polarity(&self) -> ScorePolarity {
        if self.metric.eq_ignore_ascii_case("euclidean") {
            ScorePolarity::LowerIsBetter
        } else {
            ScorePolarity::HigherIsBetter
        }
    }

    fn data_plane_url(&self, path: &str) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}/{path}")
        } else {
            format!("https://{host}/{path}")
        }
    }
}

// ── Pinecone API request/response types ────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    #[serde(default)]
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Deserialize)]
struct IndexStats {
    #[serde(default)]
    namespaces: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// A [`VectorStore`] backed by [Pinecone](https://www.pinecone.io/).
///
/// Index descriptions are cached after the first lookup, so the control
/// plane is contacted once per tenant index per store.
pub struct PineconeVectorStore {
    http: reqwest::Client,
    api_key: String,
    control_plane_url: String,
    text_key: String,
    indexes: RwLock<HashMap<String, IndexDescription>>,
}

impl PineconeVectorStore {
    /// Create a store authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `api_key` is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::ConfigError("Pinecone API key must not be empty".into()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            control_plane_url: CONTROL_PLANE_URL.into(),
            text_key: DEFAULT_TEXT_KEY.into(),
            indexes: RwLock::default(),
        })
    }

    /// Set the metadata key that holds chunk text (default `text`).
    pub fn with_text_key(mut self, key: impl Into<String>) -> Self {
        self.text_key = key.into();
        self
    }

    /// Override the control plane URL (proxies, local emulators).
    pub fn with_control_plane_url(mut self, url: impl Into<String>) -> Self {
        self.control_plane_url = url.into();
        self
    }

    /// Look up an index, using the cached description when available.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`] if the index does not exist.
    pub async fn describe_index(&self, index: &str) -> Result<IndexDescription> {
        if let Some(description) = self.indexes.read().await.get(index) {
            return Ok(description.clone());
        }

        let url = format!("{}/indexes/{index}", self.control_plane_url.trim_end_matches('/'));
        let request = self.http.get(&url);
        let description: IndexDescription = self.send(request, Some(index)).await?;
        debug!(index, host = %description.host, metric = %description.metric, "resolved index");

        self.indexes.write().await.insert(index.to_string(), description.clone());
        Ok(description)
    }

    async fn ensure_namespace(
        &self,
        description: &IndexDescription,
        namespace: &str,
    ) -> Result<()> {
        // The default namespace always exists.
        if namespace.is_empty() {
            return Ok(());
        }
        let url = description.data_plane_url("describe_index_stats");
        let request = self.http.post(url).json(&serde_json::json!({}));
        let stats: IndexStats = self.send(request, None).await?;
        check_namespace(&description.name, &stats, namespace)
    }

    /// Send an authenticated request and decode the JSON body.
    ///
    /// A 404 maps to [`RagError::NotFound`] when `index` is given.
    async fn send<R: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        index: Option<&str>,
    ) -> Result<R> {
        let response = request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| {
                error!(backend = BACKEND, error = %e, "request failed");
                RagError::upstream(
                    UpstreamService::VectorStore,
                    BACKEND,
                    format!("request failed: {e}"),
                    true,
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(backend = BACKEND, %status, "API error");
            return Err(status_error(status, body, index));
        }

        response.json().await.map_err(|e| {
            RagError::upstream(
                UpstreamService::VectorStore,
                BACKEND,
                format!("failed to parse response: {e}"),
                false,
            )
        })
    }

    /// Turn a query match into a document, lifting the text out of the metadata.
    fn to_document(&self, matched: QueryMatch) -> RetrievedDocument {
        let mut metadata = matched.metadata.unwrap_or_default();
        let content = match metadata.remove(&self.text_key) {
            Some(serde_json::Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => {
                debug!(id = %matched.id, key = %self.text_key, "match has no text metadata");
                String::new()
            }
        };
        RetrievedDocument::new(content, metadata, matched.score)
    }
}

/// Map a non-success response to an error.
///
/// A 404 is [`RagError::NotFound`] when the request addressed an index on
/// the control plane; everything else is an upstream failure.
fn status_error(status: reqwest::StatusCode, body: String, index: Option<&str>) -> RagError {
    if let (404, Some(index)) = (status.as_u16(), index) {
        return RagError::index_not_found(index);
    }
    let detail = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .and_then(|e| e.error.map(|d| d.message).or(e.message))
        .unwrap_or(body);
    RagError::upstream(
        UpstreamService::VectorStore,
        BACKEND,
        format!("API returned {status}: {detail}"),
        classify_status(status.as_u16()),
    )
}

fn check_namespace(index: &str, stats: &IndexStats, namespace: &str) -> Result<()> {
    if stats.namespaces.contains_key(namespace) {
        Ok(())
    } else {
        Err(RagError::namespace_not_found(index, namespace))
    }
}

#[async_trait]
impl VectorStore for PineconeVectorStore {
    async fn search(
        &self,
        index: &str,
        namespace: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        let description = self.describe_index(index).await?;
        self.ensure_namespace(&description, namespace).await?;

        let body = QueryRequest {
            namespace,
            vector: embedding,
            top_k,
            include_metadata: true,
            include_values: false,
        };
        let request = self.http.post(description.data_plane_url("query")).json(&body);
        let response: QueryResponse = self.send(request, None).await?;

        debug!(index, namespace, match_count = response.matches.len(), "pinecone query completed");
        Ok(response.matches.into_iter().map(|m| self.to_document(m)).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn description(metric: &str, host: &str) -> IndexDescription {
        IndexDescription {
            name: "acme".into(),
            dimension: 768,
            metric: metric.into(),
            host: host.into(),
        }
    }

    #[test]
    fn empty_api_key_is_config_error() {
        assert!(matches!(PineconeVectorStore::new(""), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn metric_determines_polarity() {
        assert_eq!(description("cosine", "h").score_polarity(), ScorePolarity::HigherIsBetter);
        assert_eq!(description("dotproduct", "h").score_polarity(), ScorePolarity::HigherIsBetter);
        assert_eq!(description("euclidean", "h").score_polarity(), ScorePolarity::LowerIsBetter);
    }

    #[test]
    fn euclidean_index_config_ranks_nearest_first() {
        use crate::config::RagConfig;
        use crate::reranker::{Reranker, ScoreReranker};

        let polarity = description("euclidean", "h").score_polarity();
        let config = RagConfig::builder().score_polarity(polarity).build().unwrap();
        let docs = vec![
            RetrievedDocument::new("far", Metadata::new(), 1.4),
            RetrievedDocument::new("near", Metadata::new(), 0.2),
        ];

        let ranked = ScoreReranker::new(config.score_polarity).rerank(docs);
        assert_eq!(ranked.documents()[0].content, "near");
    }

    #[test]
    fn data_plane_url_adds_scheme() {
        assert_eq!(
            description("cosine", "acme-abc.svc.pinecone.io").data_plane_url("query"),
            "https://acme-abc.svc.pinecone.io/query"
        );
        assert_eq!(
            description("cosine", "http://localhost:5081/").data_plane_url("query"),
            "http://localhost:5081/query"
        );
    }

    #[test]
    fn query_request_shape() {
        let body = QueryRequest {
            namespace: "policies",
            vector: &[0.5, 0.25],
            top_k: 5,
            include_metadata: true,
            include_values: false,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "namespace": "policies",
                "vector": [0.5, 0.25],
                "topK": 5,
                "includeMetadata": true,
                "includeValues": false
            })
        );
    }

    #[test]
    fn matches_lift_text_and_keep_other_metadata() {
        let store = PineconeVectorStore::new("key").unwrap();
        let response: QueryResponse = serde_json::from_value(json!({
            "matches": [
                {
                    "id": "a",
                    "score": 0.91,
                    "metadata": {
                        "text": "Refunds within 30 days.",
                        "source": "refunds.pdf",
                        "page": 2
                    }
                },
                {"id": "b", "score": 0.77}
            ],
            "namespace": "policies"
        }))
        .unwrap();

        let docs: Vec<RetrievedDocument> =
            response.matches.into_iter().map(|m| store.to_document(m)).collect();

        assert_eq!(docs[0].content, "Refunds within 30 days.");
        assert_eq!(docs[0].score, 0.91);
        assert_eq!(docs[0].metadata.get("source"), Some(&json!("refunds.pdf")));
        assert_eq!(docs[0].metadata.get("page"), Some(&json!(2)));
        assert!(!docs[0].metadata.contains_key("text"));
        assert_eq!(docs[1].content, "");
        assert!(docs[1].metadata.is_empty());
    }

    #[test]
    fn custom_text_key() {
        let store = PineconeVectorStore::new("key").unwrap().with_text_key("page_content");
        let matched: QueryMatch = serde_json::from_value(json!({
            "id": "a", "score": 0.5, "metadata": {"page_content": "hello", "text": "kept"}
        }))
        .unwrap();

        let doc = store.to_document(matched);
        assert_eq!(doc.content, "hello");
        assert_eq!(doc.metadata.get("text"), Some(&json!("kept")));
    }

    #[test]
    fn missing_namespace_is_not_found() {
        let stats: IndexStats = serde_json::from_value(json!({
            "namespaces": {"policies": {"vectorCount": 12}},
            "dimension": 768,
            "totalVectorCount": 12
        }))
        .unwrap();
        assert!(check_namespace("acme", &stats, "policies").is_ok());

        let err = check_namespace("acme", &stats, "handbook").unwrap_err();
        match err {
            RagError::NotFound { index, namespace } => {
                assert_eq!(index, "acme");
                assert_eq!(namespace.as_deref(), Some("handbook"));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn control_plane_404_is_index_not_found() {
        let err = status_error(reqwest::StatusCode::NOT_FOUND, String::new(), Some("globex"));
        match err {
            RagError::NotFound { index, namespace } => {
                assert_eq!(index, "globex");
                assert_eq!(namespace, None);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }

        // A data plane 404 is not about the tenant index.
        let err = status_error(reqwest::StatusCode::NOT_FOUND, "no route".into(), None);
        assert!(matches!(
            err,
            RagError::Upstream { service: UpstreamService::VectorStore, retryable: false, .. }
        ));
    }

    #[test]
    fn failed_status_uses_api_message_and_classification() {
        let body = json!({"error": {"code": "RESOURCE_EXHAUSTED", "message": "Too many requests"}});
        let err = status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, body.to_string(), None);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("Too many requests"));

        let body = json!({"message": "Invalid API key"}).to_string();
        let err = status_error(reqwest::StatusCode::UNAUTHORIZED, body, Some("acme"));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("Invalid API key"));

        let err = status_error(reqwest::StatusCode::BAD_GATEWAY, "<html>".into(), None);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("<html>"));
    }
}
