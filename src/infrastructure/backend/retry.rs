use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::models::AggregationConfig;
use crate::domain::ports::GatewayError;

/// Retry policy configuration for handling transient errors
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    max_attempts: u32,
    /// Delay before the first retry in milliseconds
    initial_backoff_ms: u64,
    /// Factor applied to the delay after each retry
    multiplier: u32,
    /// Maximum backoff duration in milliseconds
    max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `max_attempts` - Total attempts including the first (recommended: 3)
    /// * `initial_backoff_ms` - Delay before the first retry (recommended: 1000ms)
    /// * `multiplier` - Growth factor between retries (recommended: 2)
    /// * `max_backoff_ms` - Cap on a single delay
    ///
    /// # Example
    /// ```
    /// use kindred::infrastructure::backend::retry::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(3, 1_000, 2, 8_000);
    /// assert_eq!(policy.max_attempts(), 3);
    /// ```
    pub fn new(max_attempts: u32, initial_backoff_ms: u64, multiplier: u32, max_backoff_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff_ms,
            multiplier: multiplier.max(1),
            max_backoff_ms: max_backoff_ms.max(initial_backoff_ms),
        }
    }

    pub fn from_config(config: &AggregationConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.initial_backoff_ms,
            config.backoff_multiplier,
            config.max_backoff_ms,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Execute an operation with exponential backoff retry logic
    ///
    /// Transient errors are retried until `max_attempts` calls have been
    /// made; permanent errors are returned immediately.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "operation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if self.should_retry(&err, attempt) {
                        let backoff = self.calculate_backoff(attempt);
                        warn!(
                            attempt = attempt + 1,
                            max_attempts = self.max_attempts,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %err,
                            "transient failure, retrying"
                        );

                        sleep(backoff).await;
                        attempt += 1;
                    } else {
                        if err.is_transient() {
                            warn!(attempts = attempt + 1, error = %err, "giving up after retries");
                        } else {
                            debug!(error = %err, "permanent error, not retrying");
                        }
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Calculate exponential backoff duration for a given retry
    ///
    /// Formula: min(initial_backoff * multiplier^attempt, max_backoff)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(u64::from(self.multiplier).saturating_pow(attempt))
            .min(self.max_backoff_ms);

        Duration::from_millis(backoff_ms)
    }

    fn should_retry(&self, error: &GatewayError, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts && error.is_transient()
    }
}

impl Default for RetryPolicy {
    /// 3 attempts, 1s then 2s between them.
    fn default() -> Self {
        Self::new(3, 1_000, 2, 8_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::new(5, 1000, 2, 10_000);

        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(4000));
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(8000));
        assert_eq!(policy.calculate_backoff(4), Duration::from_millis(10_000));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0, 10, 2, 10).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_succeeds_immediately() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, GatewayError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_retries_transient_then_succeeds() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(GatewayError::from_status(503, ""))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_makes_exactly_three_attempts() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result: Result<(), _> = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(GatewayError::Network("connection refused".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(GatewayError::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1000ms + 2000ms between the three attempts
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(GatewayError::from_status(404, "missing"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
