//! Retry Helper
//!
//! Caller-side retry with linear backoff. The request cache never retries on
//! its own; callers that want retries wrap their request function with
//! [`execute_with_retry`] before handing it to the cache.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// How many times to attempt an operation and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Base delay; attempt `n` failing waits `delay * n` before the next try
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Runs `operation` until it succeeds, the error is not retryable, or the
/// policy's attempts are used up.
///
/// The last error is returned unchanged. A policy with `max_attempts == 0`
/// still runs the operation once.
pub async fn execute_with_retry<T, E, Op, Fut, R>(
    policy: &RetryPolicy,
    is_retryable: R,
    mut operation: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && is_retryable(&err) => {
                let wait = policy.backoff(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use anyhow::anyhow;
    use tokio::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    fn internal_error(err: &anyhow::Error) -> bool {
        err.to_string().contains("internal server error")
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_linear_backoff() {
        let attempts = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result = execute_with_retry(&RetryPolicy::default(), internal_error, || {
            let attempts = Arc::clone(&attempts);
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(anyhow!("SAP API Error 500: internal server error"))
                } else {
                    Ok("invoices")
                }
            }
        })
        .await;

        assert_eq!(assert_ok!(result), "invoices");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_returns_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result: anyhow::Result<()> =
            execute_with_retry(&RetryPolicy::default(), internal_error, || {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow!("SAP API Error 404: not found"))
                }
            })
            .await;

        let err = assert_err!(result);
        assert!(err.to_string().contains("404"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(2, Duration::from_millis(10));

        let result: anyhow::Result<()> = execute_with_retry(&policy, |_| true, || {
            let attempts = Arc::clone(&attempts);
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                Err(anyhow!("internal server error #{n}"))
            }
        })
        .await;

        assert_eq!(assert_err!(result).to_string(), "internal server error #2");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        let result = execute_with_retry(&policy, |_: &anyhow::Error| true, || async {
            Ok::<_, anyhow::Error>(7)
        })
        .await;
        assert_eq!(assert_ok!(result), 7);
    }
}
