//! Gemini embedding and chat providers over the Generative Language REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::ModelConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, UpstreamService, classify_status};
use crate::llm::LanguageModel;

/// The default Generative Language API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "Gemini";

/// Dimensionality of `text-embedding-004`.
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

/// Shared HTTP plumbing for both Gemini providers.
#[derive(Clone)]
struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    fn new(api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(RagError::ConfigError("Gemini API key must not be empty".into()));
        }
        Ok(Self { http: reqwest::Client::new(), api_key, base_url: DEFAULT_BASE_URL.into() })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{method}", self.base_url.trim_end_matches('/'), model_path(model))
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        service: UpstreamService,
        model: &str,
        method: &str,
        body: &B,
    ) -> Result<R> {
        let url = self.endpoint(model, method);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, %service, error = %e, "request failed");
                RagError::upstream(service, PROVIDER, format!("request failed: {e}"), true)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %service, %status, "API error");
            return Err(status_error(service, status, body));
        }

        response.json().await.map_err(|e| {
            error!(provider = PROVIDER, %service, error = %e, "failed to parse response");
            RagError::upstream(service, PROVIDER, format!("failed to parse response: {e}"), false)
        })
    }
}

/// Map a non-success response to an upstream error, preferring the API's own message.
fn status_error(service: UpstreamService, status: reqwest::StatusCode, body: String) -> RagError {
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    RagError::upstream(
        service,
        PROVIDER,
        format!("API returned {status}: {detail}"),
        classify_status(status.as_u16()),
    )
}

/// Normalize a model name to the `models/{name}` resource path.
fn model_path(model: &str) -> String {
    if model.starts_with("models/") { model.to_string() } else { format!("models/{model}") }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, if there is one.
    fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        Some(parts.into_iter().filter_map(|p| p.text).collect())
    }
}

// ── Embedding provider ─────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the Gemini `embedContent` endpoint.
///
/// Queries are embedded with the `RETRIEVAL_QUERY` task type.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::new("your-api-key")?;
/// let embedding = provider.embed("What is the refund policy?").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: GeminiClient,
    model: String,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a provider for `text-embedding-004`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `api_key` is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(api_key.into())?,
            model: ModelConfig::default().embedding_model,
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        })
    }

    /// Set the embedding model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the dimensionality reported by [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Override the API base URL (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, model = %self.model, text_len = text.len(), "embedding query");

        let request = EmbedContentRequest {
            model: model_path(&self.model),
            content: Content { role: None, parts: vec![Part { text }] },
            task_type: "RETRIEVAL_QUERY",
        };
        let response: EmbedContentResponse = self
            .client
            .post(UpstreamService::Embedding, &self.model, "embedContent", &request)
            .await?;

        Ok(response.embedding.values)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Chat model ─────────────────────────────────────────────────────

/// A [`LanguageModel`] backed by the Gemini `generateContent` endpoint.
///
/// Defaults to `gemini-2.5-flash` at temperature 0.
pub struct GeminiChatModel {
    client: GeminiClient,
    model: String,
    temperature: f32,
}

impl GeminiChatModel {
    /// Create a chat model with the default model and temperature.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `api_key` is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let defaults = ModelConfig::default();
        Ok(Self {
            client: GeminiClient::new(api_key.into())?,
            model: defaults.chat_model,
            temperature: defaults.temperature,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the API base URL (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl LanguageModel for GeminiChatModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let request = GenerateContentRequest {
            contents: vec![Content { role: Some("user"), parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig { temperature: self.temperature },
        };
        let response: GenerateContentResponse = self
            .client
            .post(UpstreamService::Llm, &self.model, "generateContent", &request)
            .await?;

        answer_text(response)
    }
}

/// The answer text of a completion; a response without candidates is an error.
fn answer_text(response: GenerateContentResponse) -> Result<String> {
    response.into_text().ok_or_else(|| {
        let message = "response contained no candidates";
        RagError::upstream(UpstreamService::Llm, PROVIDER, message, false)
    })
}

/// Build both Gemini providers from one [`ModelConfig`].
pub fn providers_from_config(
    api_key: &str,
    models: &ModelConfig,
) -> Result<(GeminiEmbeddingProvider, GeminiChatModel)> {
    let embedder = GeminiEmbeddingProvider::new(api_key)?.with_model(&models.embedding_model);
    let chat = GeminiChatModel::new(api_key)?
        .with_model(&models.chat_model)
        .with_temperature(models.temperature);
    Ok((embedder, chat))
}
