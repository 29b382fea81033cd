use crate::error::MotomiError;
use rand::Rng;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Decides whether a failed call is attempted again, and after how long
pub trait RetryPolicy: Send + Sync + Debug {
    /// `attempt` is the number of calls made so far, starting at 1
    fn should_retry(&self, attempt: u32, error: &MotomiError) -> bool;
    fn delay(&self, attempt: u32) -> Duration;
}

/// Capped exponential backoff over transient errors, with random jitter
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoffRetry {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl ExponentialBackoffRetry {
    /// `max_attempts` counts every call, the first one included
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
        }
    }

    /// Policy allowing `max_retries` calls after the first failure
    pub fn with_retries(max_retries: u32) -> Self {
        Self::new(
            max_retries.saturating_add(1),
            DEFAULT_INITIAL_DELAY,
            DEFAULT_MAX_DELAY,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the retry following `attempt`, without jitter
    fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let secs = self.initial_delay.as_secs_f64() * 2_f64.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for ExponentialBackoffRetry {
    fn default() -> Self {
        Self::with_retries(2)
    }
}

impl RetryPolicy for ExponentialBackoffRetry {
    fn should_retry(&self, attempt: u32, error: &MotomiError) -> bool {
        attempt < self.max_attempts && error.is_transient()
    }

    fn delay(&self, attempt: u32) -> Duration {
        // Between half and all of the base delay, so concurrent callers spread out
        let factor = rand::thread_rng().gen_range(0.5..=1.0);
        self.base_delay(attempt).mul_f64(factor)
    }
}

/// Run `call` until it succeeds or `policy` gives up, returning the last error
pub async fn retry_with_policy<F, Fut, T>(policy: &dyn RetryPolicy, mut call: F) -> Result<T, MotomiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MotomiError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match call().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !policy.should_retry(attempt, &error) {
            return Err(error);
        }

        let delay = policy.delay(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "retrying request");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_retries_counts_first_call() {
        assert_eq!(ExponentialBackoffRetry::with_retries(0).max_attempts(), 1);
        assert_eq!(ExponentialBackoffRetry::with_retries(3).max_attempts(), 4);
        assert_eq!(ExponentialBackoffRetry::with_retries(u32::MAX).max_attempts(), u32::MAX);
    }

    #[test]
    fn test_delay_is_capped_and_jittered() {
        let policy = ExponentialBackoffRetry::new(10, Duration::from_millis(100), Duration::from_millis(1000));

        for attempt in 1..=8 {
            let base = policy.base_delay(attempt).as_secs_f64();
            let delay = policy.delay(attempt).as_secs_f64();
            assert!(delay <= base + 1e-9);
            assert!(delay >= base * 0.5 - 1e-9);
        }
        assert_eq!(policy.base_delay(1), Duration::from_millis(100));
        assert_eq!(policy.base_delay(3), Duration::from_millis(400));
        assert_eq!(policy.base_delay(8), Duration::from_millis(1000));
    }

    #[test]
    fn test_only_transient_errors_retry() {
        let policy = ExponentialBackoffRetry::with_retries(2);
        let transient = MotomiError::RateLimitExceeded("busy".to_string());
        let permanent = MotomiError::Api {
            status: 401,
            message: "denied".to_string(),
        };

        assert!(policy.should_retry(1, &transient));
        assert!(policy.should_retry(2, &transient));
        assert!(!policy.should_retry(3, &transient));
        assert!(!policy.should_retry(1, &permanent));
    }
}
