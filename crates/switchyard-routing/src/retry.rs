//! Exponential backoff between routing attempts
//!
//! Delay for attempt `n` (zero based) is `min_delay * base_multiplier^n`,
//! clamped to `[min_delay, max_delay]`.

use crate::config::RetryConfig;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpRetry {
    max_retries: u32,
    base_multiplier: u32,
    min_delay: Duration,
    max_delay: Option<Duration>,
}

impl ExpRetry {
    pub fn new(
        max_retries: u32,
        base_multiplier: u32,
        min_delay: Duration,
        max_delay: Option<Duration>,
    ) -> Self {
        Self {
            max_retries,
            base_multiplier,
            min_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.base_multiplier,
            config.min_delay(),
            config.max_delay(),
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Backoff before retry number `attempt` (zero based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.base_multiplier.saturating_pow(attempt);
        let delay = self
            .min_delay
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
            .max(self.min_delay);

        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    /// Start a fresh retry sequence for one request
    pub fn iterator(&self) -> ExpRetryIterator {
        ExpRetryIterator {
            policy: self.clone(),
            attempt: 0,
        }
    }
}

impl Default for ExpRetry {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Retry state of a single request
#[derive(Debug, Clone)]
pub struct ExpRetryIterator {
    policy: ExpRetry,
    attempt: u32,
}

impl ExpRetryIterator {
    pub fn has_next(&self) -> bool {
        self.attempt < self.policy.max_retries
    }

    /// Number of waits performed so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Sleep for the current backoff and move to the next attempt
    ///
    /// Dropping the returned future cancels the wait.
    pub async fn wait_next(&mut self) {
        let delay = self.policy.delay(self.attempt);
        debug!(
            attempt = self.attempt + 1,
            max_retries = self.policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            "Backing off before next routing attempt"
        );

        tokio::time::sleep(delay).await;
        self.attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_delays() {
        let retry = ExpRetry::new(
            4,
            2,
            Duration::from_millis(2),
            Some(Duration::from_millis(10)),
        );

        let delays: Vec<u128> = (0..5).map(|n| retry.delay(n).as_millis()).collect();
        assert_eq!(delays, vec![2, 4, 8, 10, 10]);
    }

    #[test]
    fn test_unbounded_delay_saturates() {
        let retry = ExpRetry::new(3, 10, Duration::from_secs(1), None);

        assert_eq!(retry.delay(3), Duration::from_secs(1000));
        // The multiplier saturates at u32::MAX
        assert_eq!(retry.delay(200), Duration::from_secs(u32::MAX as u64));
    }

    #[test]
    fn test_base_multiplier_one_is_constant() {
        let retry = ExpRetry::new(3, 1, Duration::from_millis(5), None);
        assert_eq!(retry.delay(0), retry.delay(7));
    }

    #[test]
    fn test_defaults() {
        let retry = ExpRetry::default();
        assert_eq!(retry.max_retries(), 3);
        assert_eq!(retry.delay(0), Duration::from_secs(2));
        assert_eq!(retry.delay(1), Duration::from_secs(4));
        assert_eq!(retry.delay(2), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_iterator_budget() {
        let retry = ExpRetry::new(2, 2, Duration::from_millis(1), None);
        let mut iter = retry.iterator();

        assert!(iter.has_next());
        iter.wait_next().await;
        assert!(iter.has_next());
        iter.wait_next().await;
        assert!(!iter.has_next());
        assert_eq!(iter.attempt(), 2);

        // A fresh iterator starts over
        assert!(retry.iterator().has_next());
    }

    #[tokio::test]
    async fn test_wait_next_sleeps_backoff() {
        let retry = ExpRetry::new(3, 2, Duration::from_millis(5), None);
        let mut iter = retry.iterator();

        let started = std::time::Instant::now();
        iter.wait_next().await;
        iter.wait_next().await;

        assert!(started.elapsed() >= Duration::from_millis(15));
    }

    #[tokio::test]
    async fn test_wait_next_cancelled_by_timeout() {
        let retry = ExpRetry::new(1, 2, Duration::from_secs(60), None);
        let mut iter = retry.iterator();

        let result = tokio::time::timeout(Duration::from_millis(10), iter.wait_next()).await;
        assert!(result.is_err());
        assert_eq!(iter.attempt(), 0);
    }
}
