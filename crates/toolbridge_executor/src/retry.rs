//! Retry with exponential backoff, per-attempt timeouts, and cancellation.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use toolbridge_core::HostConfig;
use toolbridge_error::{BridgeError, BridgeErrorKind, BridgeResult};
use tracing::{debug, warn};

/// Retry configuration for tool execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Deadline for a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_host_config(&HostConfig::default())
    }
}

impl RetryPolicy {
    /// Builds a policy from host settings.
    pub fn from_host_config(config: &HostConfig) -> Self {
        Self {
            max_retries: config.retries,
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            attempt_timeout: config.timeout(),
        }
    }

    /// Delay after failed attempt `attempt` (0-based): `min(base * 2^attempt, max)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use toolbridge_executor::RetryPolicy;
    ///
    /// let policy = RetryPolicy {
    ///     max_retries: 3,
    ///     base_delay: Duration::from_millis(100),
    ///     max_delay: Duration::from_millis(500),
    ///     attempt_timeout: Duration::from_secs(1),
    /// };
    /// assert_eq!(policy.delay_for(0), Duration::from_millis(100));
    /// assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    /// assert_eq!(policy.delay_for(3), Duration::from_millis(500));
    /// ```
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Final result of a retried operation and how many retries it took.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// Value from the last attempt
    pub result: BridgeResult<T>,
    /// Retries performed (attempts minus one)
    pub retries: u32,
}

/// Runs `operation` until it succeeds, fails permanently, or retries run out.
///
/// Each attempt is bounded by the policy's attempt timeout; an elapsed deadline
/// is reported as a retryable [`BridgeErrorKind::Timeout`]. Cancelling `cancel`
/// aborts the in-flight attempt or pending backoff with
/// [`BridgeErrorKind::Cancelled`]. The operation receives the 0-based attempt
/// number.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = BridgeResult<T>>,
{
    let timeout_ms = u64::try_from(policy.attempt_timeout.as_millis()).unwrap_or(u64::MAX);
    let mut attempt = 0;

    loop {
        debug!(attempt, "Executing operation");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BridgeError::new(BridgeErrorKind::Cancelled)),
            outcome = timeout(policy.attempt_timeout, operation(attempt)) => match outcome {
                Ok(result) => result,
                Err(_) => Err(BridgeError::new(BridgeErrorKind::Timeout(timeout_ms))),
            },
        };

        let err = match result {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return RetryOutcome {
                    result: Ok(value),
                    retries: attempt,
                };
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            debug!(attempt, error = %err.kind(), "Error is not retryable, failing immediately");
            return RetryOutcome {
                result: Err(err),
                retries: attempt,
            };
        }
        if attempt >= policy.max_retries {
            warn!(attempt, error = %err.kind(), "All retry attempts exhausted");
            return RetryOutcome {
                result: Err(err),
                retries: attempt,
            };
        }

        let backoff = policy.delay_for(attempt);
        debug!(attempt, backoff_ms = backoff.as_millis() as u64, error = %err.kind(), "Retrying after failure");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return RetryOutcome {
                    result: Err(BridgeError::new(BridgeErrorKind::Cancelled)),
                    retries: attempt,
                };
            }
            _ = sleep(backoff) => {}
        }
        attempt += 1;
    }
}
