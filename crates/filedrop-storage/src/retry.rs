//! Bounded retry with exponential backoff for transient store failures.
//!
//! The bound is a liveness/latency trade-off, not a correctness guarantee:
//! callers must still treat failure as possible after retries exhaust.

use crate::traits::StoreResult;
use std::future::Future;
use std::time::Duration;

/// Retry policy: a fixed attempt bound with 2^attempt-seconds backoff
/// between attempts (2s, then 4s, ...).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    // Capped so an oversized retry bound cannot produce absurd sleeps.
    fn backoff(attempt: u32) -> Duration {
        Duration::from_secs(1u64 << attempt.min(6))
    }
}

/// Run `op`, retrying transient failures up to the policy bound.
///
/// Absent keys never reach this path (backends report them as `Ok(None)` /
/// `Ok(false)`), and non-transient failures are returned immediately.
pub async fn with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    op_name: &str,
    mut op: F,
) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Err(err) if err.is_transient() && attempt + 1 < policy.max_attempts => {
                attempt += 1;
                let wait = RetryPolicy::backoff(attempt);
                tracing::warn!(
                    operation = op_name,
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    wait_secs = wait.as_secs(),
                    error = %err,
                    "Transient store error, retrying"
                );
                tokio::time::sleep(wait).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StoreError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transient() -> StoreError {
        StoreError::Transient {
            code: "SlowDown".to_string(),
            message: "please slow down".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = with_backoff(RetryPolicy::new(3), "test_op", || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_stop_at_the_attempt_bound() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: StoreResult<u32> = with_backoff(RetryPolicy::new(3), "test_op", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            }
        })
        .await;

        assert!(matches!(result, Err(StoreError::Transient { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_errors_fail_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: StoreResult<u32> = with_backoff(RetryPolicy::new(3), "test_op", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Backend("access denied".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt_does_not_sleep() {
        let started = tokio::time::Instant::now();
        let result = with_backoff(RetryPolicy::new(3), "test_op", || async { Ok(1u32) }).await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(RetryPolicy::backoff(1), Duration::from_secs(2));
        assert_eq!(RetryPolicy::backoff(2), Duration::from_secs(4));
        assert_eq!(RetryPolicy::backoff(3), Duration::from_secs(8));
        // Capped
        assert_eq!(RetryPolicy::backoff(40), Duration::from_secs(64));
    }
}
