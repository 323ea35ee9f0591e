//! # Policy Q&A
//!
//! Asks a short conversation of questions against one tenant collection and
//! prints the grounded answers with their sources.
//!
//! By default everything runs offline: an `InMemoryVectorStore` seeded with a
//! few policy snippets, a deterministic hash embedder and an extractive model
//! that answers with the top-ranked snippet.
//!
//! With `--live` it uses Gemini for embeddings and answers and Pinecone for
//! retrieval, and condenses follow-ups ("And for exchanges?") into standalone
//! questions before retrieving. The score polarity follows the tenant index
//! metric. Credentials come from `GOOGLE_API_KEY` (or
//! `GEMINI_API_KEY`) and `PINECONE_API_KEY`, optionally via a `.env` file.
//!
//! Run: `cargo run --example policy_qa [-- --live <tenant> <collection>]`

use std::sync::Arc;

use async_trait::async_trait;
use docqa_rag::gemini::providers_from_config;
use docqa_rag::{
    ChainMode, Credentials, EmbeddingProvider, FALLBACK_ANSWER, InMemoryVectorStore,
    LanguageModel, Metadata, ModelConfig, PineconeVectorStore, RagConfig, RagPipeline,
    StoredChunk,
};
use serde_json::json;

const DIMENSIONS: usize = 64;

// ---------------------------------------------------------------------------
// Offline collaborators
// ---------------------------------------------------------------------------

/// Deterministic bag-of-words embeddings: each word hashes to one dimension.
struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        let mut emb = vec![0.0f32; DIMENSIONS];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| w.len() > 2) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            emb[(hash % DIMENSIONS as u64) as usize] += 1.0;
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }
}

/// Answers with the first context paragraph, or the fallback when there is none.
struct ExtractiveModel;

#[async_trait]
impl LanguageModel for ExtractiveModel {
    async fn complete(&self, prompt: &str) -> docqa_rag::Result<String> {
        let context = prompt
            .split_once("Context:\n")
            .and_then(|(_, rest)| rest.split_once("\n\nChat History:"))
            .map(|(context, _)| context.trim())
            .unwrap_or_default();
        let answer = context.split("\n\n").next().filter(|p| !p.is_empty());
        Ok(answer.unwrap_or(FALLBACK_ANSWER).to_string())
    }
}

async fn seeded_store() -> anyhow::Result<InMemoryVectorStore> {
    let store = InMemoryVectorStore::new();
    let snippets = [
        ("Refunds are accepted within 30 days of purchase.", "refunds.pdf", 1),
        ("Contact support for refund exceptions outside the window.", "refunds.pdf", 2),
        ("Exchanges are accepted within 14 days for unused items.", "exchanges.pdf", 1),
        ("Shipping is free for orders above 50 euros.", "shipping.pdf", 1),
    ];
    let mut chunks = Vec::with_capacity(snippets.len());
    for (text, source, page) in snippets {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), json!(source));
        metadata.insert("page".into(), json!(page));
        chunks.push(StoredChunk::new(text, metadata, HashEmbedder.embed(text).await?));
    }
    store.upsert("acme", "policies", chunks).await;
    store.create_index("globex").await;
    Ok(store)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    docqa_telemetry::init_telemetry("policy_qa");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let live = args.first().is_some_and(|a| a == "--live");

    let (pipeline, tenant, collection) = if live {
        let tenant = args.get(1).cloned().unwrap_or_else(|| "acme".to_string());
        let collection = args.get(2).cloned().unwrap_or_else(|| "policies".to_string());
        let credentials = Credentials::from_env()?;
        let store = PineconeVectorStore::new(&credentials.pinecone_api_key)?;
        // Euclidean indexes report distances, so lower scores rank first.
        let polarity = store.describe_index(&tenant).await?.score_polarity();
        let config = RagConfig::builder()
            .top_k(3)
            .score_polarity(polarity)
            .chain_mode(ChainMode::CondenseQuestion)
            .build()?;
        let (embedder, chat) =
            providers_from_config(&credentials.google_api_key, &ModelConfig::default())?;
        let pipeline = RagPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(embedder))
            .vector_store(Arc::new(store))
            .language_model(Arc::new(chat))
            .build()?;
        (pipeline, tenant, collection)
    } else {
        let pipeline = RagPipeline::builder()
            .config(RagConfig::builder().top_k(3).build()?)
            .embedding_provider(Arc::new(HashEmbedder))
            .vector_store(Arc::new(seeded_store().await?))
            .language_model(Arc::new(ExtractiveModel))
            .build()?;
        (pipeline, "acme".to_string(), "policies".to_string())
    };

    let questions = ["What is the refund policy?", "And for exchanges?", "Is shipping free?"];
    for question in questions {
        println!("\nQ: {question}");
        let result = pipeline.answer(&tenant, &collection, question).await?;
        println!("A: {}", result.llm_response);
        for (i, doc) in result.reranked_documents.iter().enumerate() {
            let source = doc.metadata.get("source").and_then(|s| s.as_str()).unwrap_or("?");
            println!("   {}. [{:.3}] {source}", i + 1, doc.similarity);
        }
    }

    let history = pipeline.history(&tenant, &collection).await?;
    println!("\n{} turn(s) recorded for {tenant}/{collection}", history.len());

    if !live {
        // The globex index exists but has no policies namespace.
        match pipeline.answer("globex", "policies", "What is the refund policy?").await {
            Err(e) => println!("globex/policies: {e}"),
            Ok(result) => println!("globex/policies answered: {}", result.llm_response),
        }
    }

    Ok(())
}
