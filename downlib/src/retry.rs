use std::future::Future;

use crate::config::RetryPolicy;
use crate::error::Result;

/// Runs `operation` until it succeeds, returns a non-retriable error, or
/// the policy's attempts are used up. The last error is returned.
pub async fn with_backoff<T, F, Fut>(policy: RetryPolicy, what: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts && err.is_retriable() => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt,
                    attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "{} failed: {}; retrying",
                    what,
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::debug!(attempt, "{} gave up: {}", what, err);
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base_delay: Duration::from_millis(1)
        }
    }

    fn flaky() -> Error {
        Error::HttpStatus {
            url: "https://example.com".to_string(),
            status: 503
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let value = with_backoff(fast(5), "fetch", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(flaky())
            } else {
                Ok(42)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let err = with_backoff(fast(3), "fetch", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(flaky())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let err = with_backoff(fast(5), "fetch", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Error::NoMedia("x".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NoMedia(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
