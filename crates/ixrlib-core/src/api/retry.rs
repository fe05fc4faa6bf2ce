use std::time::Duration;

use futures::future::BoxFuture;

use crate::config::RetryConfig;

/// Longest shift applied to the base delay; keeps the multiplier in range.
const MAX_BACKOFF_SHIFT: u32 = 31;

/// Decides whether a failed call is worth another attempt and how long to
/// wait before it.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Retry only below the attempt budget and only for a retryable status.
    /// Failures without a status (network errors) are never retried.
    pub fn should_retry(&self, attempt: u32, status: Option<u16>) -> bool {
        attempt < self.config.max_retries
            && status.is_some_and(|code| self.config.retryable_status_codes.contains(&code))
    }

    /// `base_delay * 2^attempt`, saturating instead of overflowing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = 1u64 << attempt.min(MAX_BACKOFF_SHIFT);
        Duration::from_millis(self.config.base_delay_ms.saturating_mul(multiplier))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// Waits out a backoff delay.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()>;
}

/// Sleeps on the tokio timer; other in-flight calls keep running.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(delay))
    }
}
