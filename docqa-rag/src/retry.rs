//! Bounded retry and timeouts around external calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::RetryConfig;
use crate::error::{RagError, Result, UpstreamService};

/// Run `operation`, retrying transient failures with exponential backoff.
///
/// Only errors for which [`RagError::is_retryable`] holds are retried;
/// everything else (auth, validation, not found) is returned immediately.
/// After `config.max_retries` retries the last error is returned.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, call: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let backoff = config.backoff(attempt);
                warn!(
                    call,
                    attempt = attempt + 1,
                    max = config.max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "retrying after transient error"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Bound `future` by `timeout`, if one is set.
///
/// Expiry becomes a retryable [`RagError::Upstream`] for `service`.
pub async fn with_timeout<T>(
    timeout: Option<Duration>,
    service: UpstreamService,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    let Some(limit) = timeout else {
        return future.await;
    };
    tokio::time::timeout(limit, future).await.unwrap_or_else(|_| {
        Err(RagError::upstream(
            service,
            "timeout",
            format!("call did not complete within {}ms", limit.as_millis()),
            true,
        ))
    })
}
