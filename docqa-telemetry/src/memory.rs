//! In-memory capture of query spans.
//!
//! [`QueryTraceLayer`] records every closed span that carries (or inherits)
//! `tenant` and `collection` fields, keyed by `"{tenant}/{collection}"`.
//! Tests use it to check what the pipeline reports without scraping log
//! output.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::{Id, Subscriber};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// Fields inherited from a parent span when the child does not set them.
const SCOPE_FIELDS: [&str; 2] = ["tenant", "collection"];

/// A captured span.
#[derive(Debug, Clone, Serialize)]
pub struct QuerySpan {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Nanoseconds since the Unix epoch.
    pub start_time: u128,
    pub end_time: u128,
    pub fields: HashMap<String, serde_json::Value>,
}

impl QuerySpan {
    /// Return a string field, if recorded.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }
}

/// Shared storage for captured spans, keyed by tenant collection.
#[derive(Debug, Clone, Default)]
pub struct QueryTraceStorage {
    spans: Arc<RwLock<HashMap<String, Vec<QuerySpan>>>>,
}

impl QueryTraceStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spans recorded for a tenant collection, in close order.
    pub fn spans(&self, tenant: &str, collection: &str) -> Vec<QuerySpan> {
        self.spans
            .read()
            .ok()
            .and_then(|spans| spans.get(&scope_key(tenant, collection)).cloned())
            .unwrap_or_default()
    }

    /// Total number of captured spans across all scopes.
    pub fn len(&self) -> usize {
        self.spans.read().map(|spans| spans.values().map(Vec::len).sum()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add_span(&self, key: String, span: QuerySpan) {
        if let Ok(mut spans) = self.spans.write() {
            spans.entry(key).or_default().push(span);
        }
    }
}

fn scope_key(tenant: &str, collection: &str) -> String {
    format!("{tenant}/{collection}")
}

/// A tracing layer that captures tenant-scoped spans in memory.
pub struct QueryTraceLayer {
    storage: QueryTraceStorage,
}

impl QueryTraceLayer {
    pub fn new(storage: QueryTraceStorage) -> Self {
        Self { storage }
    }
}

#[derive(Clone)]
struct SpanFields(HashMap<String, serde_json::Value>);

#[derive(Clone, Copy)]
struct StartTime(u128);

fn now_nanos() -> u128 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_nanos()
}

impl<S> Layer<S> for QueryTraceLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        let mut fields = visitor.0;

        if let Some(parent) = span.parent() {
            if let Some(parent_fields) = parent.extensions().get::<SpanFields>() {
                for key in SCOPE_FIELDS {
                    if !fields.contains_key(key) {
                        if let Some(value) = parent_fields.0.get(key) {
                            fields.insert(key.to_string(), value.clone());
                        }
                    }
                }
            }
        }

        let mut extensions = span.extensions_mut();
        extensions.insert(StartTime(now_nanos()));
        extensions.insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            fields.0.extend(visitor.0);
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else {
            return;
        };
        let extensions = span.extensions();
        let fields = extensions.get::<SpanFields>().map(|f| f.0.clone()).unwrap_or_default();

        let (Some(tenant), Some(collection)) = (
            fields.get("tenant").and_then(|v| v.as_str()),
            fields.get("collection").and_then(|v| v.as_str()),
        ) else {
            return;
        };
        let key = scope_key(tenant, collection);

        let captured = QuerySpan {
            name: span.metadata().name().to_string(),
            parent: span.parent().map(|p| p.metadata().name().to_string()),
            start_time: extensions.get::<StartTime>().map(|s| s.0).unwrap_or(0),
            end_time: now_nanos(),
            fields,
        };
        self.storage.add_span(key, captured);
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}
