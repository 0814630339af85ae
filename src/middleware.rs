//! # Call-boundary Wrappers
//!
//! Composable async helpers for protecting any dependency call the way the
//! orchestrator protects the primary engine:
//!
//! ```rust,no_run
//! # use resilient_search::middleware::*;
//! # use resilient_search::resilience::{CircuitBreaker, CircuitBreakerConfig, RetryPolicy};
//! # async fn fetch() -> Result<u32, std::io::Error> { Ok(1) }
//! # async fn example() {
//! let breaker = CircuitBreaker::new("geocoder", CircuitBreakerConfig::default());
//! let retry = RetryPolicy::default();
//! let value = with_timing("geocode", || {
//!     with_breaker(&breaker, || with_retry(&retry, |_| true, fetch))
//! })
//! .await;
//! # }
//! ```

use crate::cache::{CacheCategory, CacheStore, KeyArgs};
use crate::resilience::{CircuitBreaker, CircuitBreakerError, RetryPolicy};
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::error::Elapsed;
use tracing::{debug, warn};

/// Run `operation` through `breaker`
pub async fn with_breaker<F, Fut, T, E>(
    breaker: &CircuitBreaker,
    operation: F,
) -> Result<T, CircuitBreakerError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    breaker.call(operation).await
}

/// Serve from cache, or run `operation` and cache its `Ok` value with the category TTL
pub async fn with_cache<F, Fut, T, E>(
    cache: &CacheStore,
    category: CacheCategory,
    args: &KeyArgs,
    operation: F,
) -> Result<T, E>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    cache.get_or_compute(category, args, None, operation).await
}

/// Log how long `operation` took, at debug level
pub async fn with_timing<F, Fut, T>(label: &str, operation: F) -> T
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let started = Instant::now();
    let output = operation().await;
    debug!(
        operation = %label,
        duration_ms = started.elapsed().as_millis() as u64,
        "Operation timing"
    );
    output
}

/// Bound `operation` by `deadline`
pub async fn with_timeout<F, Fut>(deadline: Duration, operation: F) -> Result<Fut::Output, Elapsed>
where
    F: FnOnce() -> Fut,
    Fut: Future,
{
    tokio::time::timeout(deadline, operation()).await
}

/// Retry `operation` with exponential backoff while `is_retryable` accepts the error.
///
/// Non-retryable errors and the error from the last attempt are returned as-is.
pub async fn with_retry<F, Fut, T, E, R>(
    policy: &RetryPolicy,
    is_retryable: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    R: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries && is_retryable(&err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Run `operation`, returning `fallback_value` on any error
pub async fn safe_call<F, Fut, T, E>(label: &str, operation: F, fallback_value: T) -> T
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    match operation().await {
        Ok(value) => value,
        Err(err) => {
            warn!(operation = %label, error = %err, "Safe call failed, returning fallback value");
            fallback_value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitBreakerConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use thiserror::Error;

    #[derive(Debug, Error, PartialEq)]
    enum FlakyError {
        #[error("connection reset")]
        Reset,
        #[error("bad request")]
        BadRequest,
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_transient_failures() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(100)).without_jitter();

        let result = with_retry(&policy, |e| *e == FlakyError::Reset, || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(FlakyError::Reset)
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(10)).without_jitter();

        let result: Result<(), _> = with_retry(&policy, |_| true, || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(FlakyError::Reset)
        })
        .await;

        assert_eq!(result, Err(FlakyError::Reset));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_skips_non_retryable_errors() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(
            &RetryPolicy::default(),
            |e| *e == FlakyError::Reset,
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(FlakyError::BadRequest)
            },
        )
        .await;

        assert_eq!(result, Err(FlakyError::BadRequest));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_safe_call_returns_fallback_value() {
        let value = safe_call("lookup", || async { Err::<u32, _>(FlakyError::Reset) }, 0).await;
        assert_eq!(value, 0);

        let value = safe_call("lookup", || async { Ok::<_, FlakyError>(9) }, 0).await;
        assert_eq!(value, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_elapses() {
        let result = with_timeout(Duration::from_millis(50), || async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            1
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_breaker_and_timing_compose() {
        let breaker = CircuitBreaker::new("composed", CircuitBreakerConfig::default());
        let result = with_timing("composed-call", || {
            with_breaker(&breaker, || async { Ok::<_, FlakyError>("ok") })
        })
        .await;
        assert_eq!(result.ok(), Some("ok"));
        assert_eq!(breaker.stats().success_count, 1);
    }

    #[cfg(feature = "cache-moka")]
    #[tokio::test]
    async fn test_with_cache_computes_once() {
        use crate::cache::CacheProvider;
        use crate::config::CacheSettings;

        let store = CacheStore::new(CacheProvider::moka(100), &CacheSettings::default());
        let calls = AtomicU32::new(0);
        let args = KeyArgs::for_item(1);

        for _ in 0..2 {
            let value: Result<String, FlakyError> =
                with_cache(&store, CacheCategory::Item, &args, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("Château".to_string())
                })
                .await;
            assert_eq!(value.unwrap(), "Château");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
