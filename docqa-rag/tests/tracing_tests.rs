//! Checks on the spans emitted while answering.

mod common;

use std::sync::Arc;

use common::{RecordingEmbedder, ScriptedLlm, ScriptedStore, doc};
use docqa_rag::RagPipeline;
use docqa_telemetry::{QueryTraceLayer, QueryTraceStorage};
use tracing_subscriber::layer::SubscriberExt;

#[tokio::test]
async fn answer_span_is_scoped_to_tenant_collection() {
    let storage = QueryTraceStorage::new();
    let subscriber = tracing_subscriber::registry().with(QueryTraceLayer::new(storage.clone()));
    let _default = tracing::subscriber::set_default(subscriber);

    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(RecordingEmbedder::default()))
        .vector_store(Arc::new(ScriptedStore::new(vec![doc("Refunds within 30 days.", 0.9)])))
        .language_model(Arc::new(ScriptedLlm::answering()))
        .build()
        .unwrap();
    pipeline.answer("acme", "policies", "What is the refund policy?").await.unwrap();

    let spans = storage.spans("acme", "policies");
    let answer = spans.iter().find(|s| s.name == "answer").unwrap();
    assert_eq!(answer.field("tenant"), Some("acme"));
    assert_eq!(answer.field("collection"), Some("policies"));
    // Only the scope is recorded on the span; the question stays out of it.
    assert_eq!(answer.fields.len(), 2);
    assert!(storage.spans("acme", "handbook").is_empty());
}
