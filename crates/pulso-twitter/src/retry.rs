//! Retry with exponential back-off and jitter for the search client.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! rate limiting and request timeouts. Everything else is returned
//! immediately so that a bad query or an auth failure aborts the run.

use std::future::Future;
use std::time::Duration;

use crate::error::TwitterError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** [`TwitterError::RateLimited`] (HTTP 429) and
/// [`TwitterError::Http`] timeouts.
///
/// **Not retriable:** every other variant, including connection failures
/// and non-429 error statuses.
pub(crate) fn is_retriable(err: &TwitterError) -> bool {
    match err {
        TwitterError::RateLimited { .. } => true,
        TwitterError::Http(e) => e.is_timeout(),
        TwitterError::Api { .. }
        | TwitterError::Deserialize { .. }
        | TwitterError::InvalidWindow(_)
        | TwitterError::InvalidBaseUrl { .. }
        | TwitterError::Reshape { .. }
        | TwitterError::Table(_) => false,
    }
}

/// Milliseconds left until the rate-limit window named by a 429 reopens.
///
/// Zero for other errors, for a missing header, or for a reset already in the
/// past. Capped at one 15-minute rate-limit window.
pub(crate) fn rate_limit_wait_ms(err: &TwitterError, now_secs: i64) -> u64 {
    const MAX_WAIT_SECS: i64 = 15 * 60;
    match err {
        TwitterError::RateLimited {
            reset_at: Some(reset_at),
        } => {
            let secs = reset_at.saturating_sub(now_secs).clamp(0, MAX_WAIT_SECS);
            u64::try_from(secs).unwrap_or(0) * 1000
        }
        _ => 0,
    }
}

/// Runs `operation` up to `max_attempts` times in total while it fails with a
/// retriable error.
///
/// The sleep before retry `n` is `backoff_base_ms × 2ⁿ⁻¹ ± 25 %`, capped at 60 s,
/// or the time left until `x-rate-limit-reset` when that is longer.
/// With `max_attempts = 5` that is four sleeps at most.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, TwitterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TwitterError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_attempts {
                    return Err(err);
                }
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let backoff_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                let delay_ms =
                    backoff_ms.max(rate_limit_wait_ms(&err, chrono::Utc::now().timestamp()));
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms,
                    error = %err,
                    "search API transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
        }
    }
}
