//! Retry with exponential backoff for page fetches.
//!
//! Only transient failures are retried: rate limiting, network errors,
//! timeouts and 5xx statuses. Everything else is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } | ScraperError::Http(_) | ScraperError::Timeout { .. } => {
            true
        }
        ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Wait before retry `attempt + 1`: `base_secs * 2^attempt`, saturating.
fn backoff_delay(base_secs: u64, attempt: u32) -> Duration {
    Duration::from_secs(base_secs.saturating_mul(1u64 << attempt.min(62)))
}

/// Runs `operation`, retrying retriable errors up to `max_retries` more times.
/// The last error is returned once retries are exhausted.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries && is_retriable(&err) => err,
            Err(err) => return Err(err),
        };

        let delay = backoff_delay(backoff_base_secs, attempt);
        attempt += 1;
        tracing::warn!(
            retry = attempt,
            max_retries,
            delay_secs = delay.as_secs(),
            error = %err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
    }
}
