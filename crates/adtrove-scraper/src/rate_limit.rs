//! Retry with exponential back-off and jitter for browser endpoint calls.
//!
//! Transient failures (HTTP 429, 5xx, network errors) are retried. Anything
//! else is propagated on the first failure.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

const MAX_DELAY_MS: u64 = 60_000;

/// Retriable errors:
/// - [`ScraperError::RateLimited`]: HTTP 429.
/// - [`ScraperError::Http`]: network-level failure (connection reset, timeout).
/// - [`ScraperError::UnexpectedStatus`] with a 5xx status.
fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } | ScraperError::Http(_) => true,
        ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Computes the sleep before retry number `attempt` (1-based).
///
/// `base * 2^(attempt-1)` capped at 60 s, then scaled by a random factor in
/// `[0.75, 1.25)`. A rate-limit `Retry-After` hint acts as a floor.
fn backoff_delay(backoff_base_secs: u64, attempt: u32, err: &ScraperError) -> Duration {
    let base_ms = backoff_base_secs.saturating_mul(1000);
    let computed = base_ms.saturating_mul(1u64 << (attempt.saturating_sub(1)).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;

    let floor_ms = match err {
        ScraperError::RateLimited {
            retry_after_secs, ..
        } => retry_after_secs.saturating_mul(1000).min(MAX_DELAY_MS),
        _ => 0,
    };
    Duration::from_millis(jittered.max(floor_ms))
}

/// Executes `operation`, retrying transient errors up to `max_retries`
/// additional times.
///
/// With `max_retries = 2` the operation is attempted at most 3 times. The
/// last error is returned once retries are exhausted; non-retriable errors
/// are returned immediately.
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
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = backoff_delay(backoff_base_secs, attempt, &err);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient browser error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
