//! Caller-side retry with exponential back-off and jitter.
//!
//! The completion client never retries on its own. Pipeline and chat code
//! wrap provider calls in [`with_retry`], which retries only errors for
//! which [`ProviderError::is_retryable`] holds.

use std::future::Future;
use std::time::Duration;

use crate::error::ProviderError;

const MAX_DELAY_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
        }
    }

    /// Single attempt, no back-off.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    #[must_use]
    pub fn from_config(config: &genome_core::AppConfig) -> Self {
        Self::new(
            config.provider_max_retries,
            config.provider_retry_backoff_base_ms,
        )
    }

    /// Delay before retry number `attempt` (1-based), before jitter.
    ///
    /// A rate-limit error's `Retry-After` acts as a floor.
    fn base_delay_ms(&self, attempt: u32, err: &ProviderError) -> u64 {
        let computed = self
            .backoff_base_ms
            .saturating_mul(1u64 << (attempt - 1).min(10));
        let floor = match err {
            ProviderError::RateLimited { retry_after_secs } => {
                retry_after_secs.saturating_mul(1000)
            }
            _ => 0,
        };
        computed.max(floor).min(MAX_DELAY_MS)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, 1_000)
    }
}

/// Runs `operation` with up to `policy.max_retries` additional attempts on
/// retryable errors.
///
/// Back-off schedule with `backoff_base_ms = 1_000`:
///
/// | Attempt | Sleep before next attempt        |
/// |---------|----------------------------------|
/// | 1       | 1 000 ms × 2⁰ ± 25 % jitter     |
/// | 2       | 1 000 ms × 2¹ ± 25 % jitter     |
///
/// Delay is capped at 60 s. Non-retryable errors are returned immediately.
///
/// # Errors
///
/// Returns the last [`ProviderError`] once retries are exhausted, or the
/// first non-retryable one.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let capped = policy.base_delay_ms(attempt, &err);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    call = label,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %err,
                    "provider call failed, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// Bounds `fut` by `timeout`, mapping expiry to [`ProviderError::Timeout`].
///
/// # Errors
///
/// Returns [`ProviderError::Timeout`] when the deadline passes first, or
/// whatever error `fut` itself produced.
pub async fn with_deadline<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, ProviderError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout {
            after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = with_retry(RetryPolicy::new(3, 0), "test", || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ProviderError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_timeouts_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = with_retry(RetryPolicy::new(3, 0), "test", || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err(ProviderError::Timeout { after_ms: 5 })
                } else {
                    Ok(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = with_retry(RetryPolicy::new(2, 0), "test", || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(ProviderError::RateLimited {
                    retry_after_secs: 0,
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3, "1 attempt + 2 retries");
        assert!(matches!(result, Err(ProviderError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_auth_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = with_retry(RetryPolicy::new(3, 0), "test", || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(ProviderError::Auth("invalid key".to_string()))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "auth must not be retried");
        assert!(matches!(result, Err(ProviderError::Auth(_))));
    }

    #[test]
    fn retry_after_is_a_floor_for_rate_limits() {
        let policy = RetryPolicy::new(3, 100);
        let err = ProviderError::RateLimited {
            retry_after_secs: 2,
        };
        assert_eq!(policy.base_delay_ms(1, &err), 2_000);
        let timeout = ProviderError::Timeout { after_ms: 1 };
        assert_eq!(policy.base_delay_ms(2, &timeout), 200);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_maps_to_timeout() {
        let result = with_deadline(Duration::from_millis(250), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), ProviderError>(())
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Timeout { after_ms: 250 })));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy::new(30, 10_000);
        let err = ProviderError::Timeout { after_ms: 1 };
        assert_eq!(policy.base_delay_ms(20, &err), MAX_DELAY_MS);
    }
}
