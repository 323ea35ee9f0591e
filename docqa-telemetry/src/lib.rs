//! Tracing setup for docqa services.
//!
//! Installs the process-wide `tracing` subscriber. Filtering follows
//! `RUST_LOG` when set and falls back to `info` for everything plus `debug`
//! for the calling service's own crate.
//!
//! Every initializer is idempotent: once a global subscriber exists, later
//! calls return `false` and leave it in place, so tests and demos can call
//! them freely.

pub mod memory;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use memory::{QuerySpan, QueryTraceLayer, QueryTraceStorage};

/// `RUST_LOG` if set, otherwise `info` with `debug` for the service and `docqa_rag`.
fn env_filter(service: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let crate_target = service.replace('-', "_");
        EnvFilter::new(format!("info,{crate_target}=debug,docqa_rag=debug"))
    })
}

/// Install a human-readable subscriber writing to stderr.
///
/// Returns `true` if this call installed the subscriber.
pub fn init_telemetry(service: &str) -> bool {
    let installed = tracing_subscriber::registry()
        .with(env_filter(service))
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(service, "telemetry initialized");
    }
    installed
}

/// Install a subscriber emitting one JSON object per event on stdout.
///
/// Each event carries the fields of its current span (tenant, collection).
pub fn init_json_telemetry(service: &str) -> bool {
    let installed = tracing_subscriber::registry()
        .with(env_filter(service))
        .with(fmt::layer().json().with_current_span(true).with_span_list(false))
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(service, format = "json", "telemetry initialized");
    }
    installed
}

/// Install the human-readable subscriber plus an in-memory span capture layer.
///
/// Spans scoped to a tenant collection land in `storage` as they close.
pub fn init_with_storage(service: &str, storage: QueryTraceStorage) -> bool {
    let installed = tracing_subscriber::registry()
        .with(env_filter(service))
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(QueryTraceLayer::new(storage))
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(service, capture = true, "telemetry initialized");
    }
    installed
}

#[cfg(test)]
mod test_capture;
