//! Configuration for the question-answering pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// How the vector store's score relates to relevance.
///
/// Cosine and dot-product indexes return similarities (higher is better);
/// euclidean indexes return distances (lower is better). The reranker uses
/// this to decide which end of the score range ranks first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolarity {
    #[default]
    HigherIsBetter,
    LowerIsBetter,
}

/// How the conversation history feeds into retrieval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainMode {
    /// Retrieve with the caller's question as-is.
    #[default]
    Direct,
    /// Rewrite a follow-up question into a standalone one before retrieval.
    /// Costs one extra LLM call whenever history is non-empty.
    CondenseQuestion,
}

/// Exponential backoff settings for transient upstream failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 200,
            backoff_multiplier: 2.0,
            max_backoff_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(base.min(self.max_backoff_ms as f64) as u64)
    }
}

/// Configuration parameters for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Number of documents requested from the vector store per query.
    pub top_k: usize,
    /// Score convention of the configured vector store.
    pub score_polarity: ScorePolarity,
    /// Keep only the most recent N turns per conversation. `None` keeps all.
    pub max_history_turns: Option<usize>,
    pub chain_mode: ChainMode,
    pub retry: RetryConfig,
    /// Upper bound on each external call, in milliseconds.
    pub call_timeout_ms: Option<u64>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            score_polarity: ScorePolarity::HigherIsBetter,
            max_history_turns: None,
            chain_mode: ChainMode::Direct,
            retry: RetryConfig::default(),
            call_timeout_ms: None,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Check the invariants the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `top_k == 0`
    /// - `max_history_turns == Some(0)`
    /// - the retry backoff multiplier is below 1.0
    /// - `call_timeout_ms == Some(0)`
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.max_history_turns == Some(0) {
            return Err(RagError::ConfigError(
                "max_history_turns must be greater than zero when set".to_string(),
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(RagError::ConfigError(format!(
                "backoff_multiplier ({}) must be at least 1.0",
                self.retry.backoff_multiplier
            )));
        }
        if self.call_timeout_ms == Some(0) {
            return Err(RagError::ConfigError("call_timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the number of documents to retrieve per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the score convention of the vector store.
    pub fn score_polarity(mut self, polarity: ScorePolarity) -> Self {
        self.config.score_polarity = polarity;
        self
    }

    /// Bound each conversation to its most recent `turns` turns.
    pub fn max_history_turns(mut self, turns: usize) -> Self {
        self.config.max_history_turns = Some(turns);
        self
    }

    pub fn chain_mode(mut self, mode: ChainMode) -> Self {
        self.config.chain_mode = mode;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Bound every embedding, vector store and LLM call by `timeout`.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the configuration is invalid;
    /// see [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Model selection for the hosted embedding and chat services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_model: "text-embedding-004".to_string(),
            chat_model: "gemini-2.5-flash".to_string(),
            temperature: 0.0,
        }
    }
}

/// API credentials for the hosted providers.
#[derive(Clone)]
pub struct Credentials {
    pub google_api_key: String,
    pub pinecone_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("google_api_key", &"<redacted>")
            .field("pinecone_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Load credentials from the environment, reading `.env` first if present.
    ///
    /// `GOOGLE_API_KEY` falls back to `GEMINI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a key is missing or empty.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load credentials through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let google_api_key =
            non_empty("GOOGLE_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")).ok_or_else(|| {
                RagError::ConfigError(
                    "GOOGLE_API_KEY or GEMINI_API_KEY environment variable not set".to_string(),
                )
            })?;
        let pinecone_api_key = non_empty("PINECONE_API_KEY").ok_or_else(|| {
            RagError::ConfigError("PINECONE_API_KEY environment variable not set".to_string())
        })?;

        Ok(Self { google_api_key, pinecone_api_key })
    }
}
