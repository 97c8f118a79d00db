//! Retry with exponential backoff.
//!
//! **Algorithm:**
//! 1. Run the operation
//! 2. On success, return the result
//! 3. On an error the policy does not retry, return it immediately
//! 4. On a retryable error with attempts left, sleep and go to 1
//! 5. Otherwise return `RetriesExhausted` carrying the last error
//!
//! With the defaults (5 attempts, 1 s initial delay, multiplier 2) the
//! delays between attempts are 1, 2, 4 and 8 seconds.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ProviderError;

/// Suspends the calling task between attempts.
///
/// Production code uses [`TokioSleeper`]; tests inject a recorder so no
/// real time passes.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer, which only parks the current task.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How many times to try, how long to wait, and which errors to retry.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    multiplier: u32,
    retry_if: fn(&ProviderError) -> bool,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, multiplier: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            multiplier: multiplier.max(1),
            retry_if: ProviderError::is_transient,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, 1)
    }

    /// Replace the retryable-error predicate.
    pub fn with_retry_if(mut self, retry_if: fn(&ProviderError) -> bool) -> Self {
        self.retry_if = retry_if;
        self
    }

    /// Replace the sleeper (used by tests to avoid real delays).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let factor = self
            .multiplier
            .checked_pow(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }

    /// Run `operation` under this policy.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, name: &str, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = name, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !(self.retry_if)(&err) {
                debug!(operation = name, attempt, error = %err, "Not retrying terminal error");
                return Err(err);
            }

            if attempt >= self.max_attempts {
                warn!(operation = name, attempt, error = %err, "Retries exhausted");
                return Err(ProviderError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.delay_before_retry(attempt);
            warn!(
                operation = name,
                attempt,
                error = %err,
                "Request failed, retrying in {:?}",
                delay
            );
            self.sleeper.sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1), 2)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("multiplier", &self.multiplier)
            .finish_non_exhaustive()
    }
}
