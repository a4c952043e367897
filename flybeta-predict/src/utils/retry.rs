//! Retry logic for transient scoring failures
//!
//! A call is attempted up to `1 + max_retries` times. Only errors classified as
//! transient are retried; anything else returns immediately. The delay between
//! attempts is fixed by default and can be switched to capped exponential
//! backoff.

use std::future::Future;
use std::time::{Duration, Instant};

/// Delay progression between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffSchedule {
    /// Same delay before every retry
    Fixed,
    /// `delay * multiplier^(n-1)` before retry n, capped at `max_delay`
    Exponential { multiplier: f64, max_delay: Duration },
}

/// Retry budget for one scoring stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
    pub schedule: BackoffSchedule,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_millis(1500),
            schedule: BackoffSchedule::Fixed,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            schedule: BackoffSchedule::Fixed,
        }
    }

    /// Total calls permitted, first attempt included
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry `retry` (1-based)
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        match self.schedule {
            BackoffSchedule::Fixed => self.delay,
            BackoffSchedule::Exponential {
                multiplier,
                max_delay,
            } => {
                let exponent = retry.saturating_sub(1) as i32;
                let secs = self.delay.as_secs_f64() * multiplier.powi(exponent);
                if !secs.is_finite() || secs >= max_delay.as_secs_f64() {
                    max_delay
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }
}

/// Final result of a retried operation plus the number of calls made
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

impl<T, E> RetryOutcome<T, E> {
    /// Whether the failure came from running out of attempts on transient errors
    pub fn exhausted(&self, max_attempts: u32, is_transient: impl Fn(&E) -> bool) -> bool {
        match &self.result {
            Err(err) => self.attempts >= max_attempts && is_transient(err),
            Ok(_) => false,
        }
    }
}

/// Run `operation` until it succeeds, fails terminally, or the budget is spent
///
/// # Arguments
/// * `operation_name` - Label for logging (e.g. "stage 1 AA_2024-01-01_LOS_ABV")
/// * `policy` - Retry budget and delay schedule
/// * `is_transient` - Classifies an error as retryable
/// * `operation` - Async closure performing one attempt
pub async fn retry_transient<F, Fut, T, E, P>(
    operation_name: &str,
    policy: &RetryPolicy,
    is_transient: P,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let start_time = Instant::now();
    let max_attempts = policy.max_attempts();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        if attempt > 1 {
            tracing::debug!(operation = operation_name, attempt, "Retrying scoring call");
        }

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Scoring call succeeded after retry"
                    );
                }
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) => {
                if !is_transient(&err) {
                    return RetryOutcome {
                        result: Err(err),
                        attempts: attempt,
                    };
                }

                if attempt >= max_attempts {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        error = %err,
                        "Scoring call failed: retries exhausted"
                    );
                    return RetryOutcome {
                        result: Err(err),
                        attempts: attempt,
                    };
                }

                let backoff = policy.delay_before_retry(attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient scoring failure, will retry after backoff"
                );

                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Flaky,
        Broken,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn transient(err: &TestError) -> bool {
        *err == TestError::Flaky
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy::fixed(2, Duration::from_millis(5))
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_before_retry(1), Duration::from_millis(1500));
        assert_eq!(policy.delay_before_retry(2), Duration::from_millis(1500));
    }

    #[test]
    fn test_exponential_schedule_is_capped() {
        let policy = RetryPolicy {
            max_retries: 5,
            delay: Duration::from_millis(100),
            schedule: BackoffSchedule::Exponential {
                multiplier: 2.0,
                max_delay: Duration::from_millis(350),
            },
        };
        assert_eq!(policy.delay_before_retry(1), Duration::from_millis(100));
        assert_eq!(policy.delay_before_retry(2), Duration::from_millis(200));
        assert_eq!(policy.delay_before_retry(3), Duration::from_millis(350));
        assert_eq!(policy.delay_before_retry(10), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let outcome = retry_transient("test_op", &quick_policy(), transient, || async {
            Ok::<i32, TestError>(42)
        })
        .await;

        assert_eq!(outcome.result, Ok(42));
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);

        let outcome = retry_transient("test_op", &quick_policy(), transient, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(TestError::Flaky)
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(outcome.result, Ok(7));
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_exhausts_budget_on_persistent_transient_failure() {
        let calls = AtomicU32::new(0);
        let policy = quick_policy();

        let outcome = retry_transient("test_op", &policy, transient, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, TestError>(TestError::Flaky) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.exhausted(policy.max_attempts(), transient));
    }

    #[tokio::test]
    async fn test_terminal_error_fails_immediately() {
        let calls = AtomicU32::new(0);
        let policy = quick_policy();

        let outcome = retry_transient("test_op", &policy, transient, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, TestError>(TestError::Broken) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.result, Err(TestError::Broken));
        assert!(!outcome.exhausted(policy.max_attempts(), transient));
    }

    #[tokio::test]
    async fn test_zero_retries_makes_single_call() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(0, Duration::from_millis(5));

        let outcome = retry_transient("test_op", &policy, transient, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, TestError>(TestError::Flaky) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.attempts, 1);
    }
}
