//! Retry with exponential back-off and jitter for classifier requests.

use std::future::Future;
use std::time::Duration;

use crate::error::ClassifierError;

/// Rate limiting and request timeouts are retried; nothing else is.
pub(crate) fn is_retriable(err: &ClassifierError) -> bool {
    match err {
        ClassifierError::RateLimited => true,
        ClassifierError::Http(e) => e.is_timeout(),
        ClassifierError::Api { .. }
        | ClassifierError::Malformed(_)
        | ClassifierError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation` up to `max_attempts` times in total while it fails with a
/// retriable error.
///
/// The sleep before retry `n` is `backoff_base_ms × 2ⁿ⁻¹ ± 25 %`, capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ClassifierError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClassifierError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !is_retriable(&err) || attempt >= max_attempts => return Err(err),
            Err(err) => {
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms,
                    error = %err,
                    "classifier request failed, backing off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
        }
    }
}
