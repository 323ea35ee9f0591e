//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use docqa_rag::{
    EmbeddingProvider, LanguageModel, Metadata, RagError, Result, RetrievedDocument,
    UpstreamService, VectorStore,
};

/// Embeds every text to the same vector and records what it was asked.
#[derive(Default)]
pub struct RecordingEmbedder {
    pub texts: Mutex<Vec<String>>,
}

#[async_trait]
impl EmbeddingProvider for RecordingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        3
    }
}

/// Returns a fixed document list for every search, in the given order.
pub struct ScriptedStore {
    documents: Vec<RetrievedDocument>,
    pub searches: Mutex<Vec<(String, String, usize)>>,
}

impl ScriptedStore {
    pub fn new(documents: Vec<RetrievedDocument>) -> Self {
        Self { documents, searches: Mutex::default() }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl VectorStore for ScriptedStore {
    async fn search(
        &self,
        index: &str,
        namespace: &str,
        _embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        self.searches.lock().unwrap().push((index.to_string(), namespace.to_string(), top_k));
        Ok(self.documents.iter().take(top_k).cloned().collect())
    }
}

/// Replies from a script of outcomes, then with a default answer.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<String>>>,
    delay: Option<Duration>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn answering() -> Self {
        Self::with_script(Vec::new())
    }

    pub fn with_script(script: Vec<Result<String>>) -> Self {
        Self { script: Mutex::new(script.into()), delay: None, prompts: Mutex::default() }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::answering() }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script.lock().unwrap().pop_front().unwrap_or_else(|| Ok(format!("answer {call}")))
    }
}

pub fn doc(content: &str, score: f32) -> RetrievedDocument {
    RetrievedDocument::new(content, Metadata::new(), score)
}

pub fn transient_llm_error() -> RagError {
    RagError::upstream(UpstreamService::Llm, "scripted", "503 Service Unavailable", true)
}

pub fn auth_llm_error() -> RagError {
    RagError::upstream(UpstreamService::Llm, "scripted", "401 Unauthorized", false)
}
