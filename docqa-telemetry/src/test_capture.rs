use tracing::info_span;
use tracing_subscriber::layer::SubscriberExt;

use crate::memory::{QueryTraceLayer, QueryTraceStorage};

fn with_capture(storage: &QueryTraceStorage, f: impl FnOnce()) {
    let subscriber = tracing_subscriber::registry().with(QueryTraceLayer::new(storage.clone()));
    tracing::subscriber::with_default(subscriber, f);
}

#[test]
fn captures_spans_under_tenant_collection() {
    let storage = QueryTraceStorage::new();
    with_capture(&storage, || {
        let span = info_span!("answer", tenant = "acme", collection = "policies");
        let _guard = span.enter();
        tracing::info!("query answered");
    });

    let spans = storage.spans("acme", "policies");
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "answer");
    assert_eq!(spans[0].field("tenant"), Some("acme"));
    assert!(spans[0].start_time > 0);
    assert!(spans[0].end_time >= spans[0].start_time);
    assert!(storage.spans("acme", "handbook").is_empty());
}

#[test]
fn child_spans_inherit_scope() {
    let storage = QueryTraceStorage::new();
    with_capture(&storage, || {
        let parent = info_span!("answer", tenant = "globex", collection = "handbook");
        let _outer = parent.enter();
        let child = info_span!("retrieve", top_k = 5u64);
        let _inner = child.enter();
    });

    let spans = storage.spans("globex", "handbook");
    let names: Vec<&str> = spans.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["retrieve", "answer"]);
    assert_eq!(spans[0].parent.as_deref(), Some("answer"));
    assert_eq!(spans[0].fields.get("top_k"), Some(&serde_json::json!(5)));
}

#[test]
fn unscoped_spans_are_ignored() {
    let storage = QueryTraceStorage::new();
    with_capture(&storage, || {
        let _guard = info_span!("startup", service = "docqa").entered();
    });
    assert!(storage.is_empty());
}

#[test]
fn late_recorded_fields_are_kept() {
    let storage = QueryTraceStorage::new();
    with_capture(&storage, || {
        let span = info_span!(
            "answer",
            tenant = "acme",
            collection = "policies",
            result_count = tracing::field::Empty
        );
        span.record("result_count", 2u64);
    });

    let spans = storage.spans("acme", "policies");
    assert_eq!(spans[0].fields.get("result_count"), Some(&serde_json::json!(2)));
}

#[test]
fn second_init_is_a_no_op() {
    // Whichever call runs first installs the global subscriber.
    let _ = crate::init_telemetry("docqa-telemetry");
    assert!(!crate::init_telemetry("docqa-telemetry"));
    assert!(!crate::init_json_telemetry("docqa-telemetry"));
}
