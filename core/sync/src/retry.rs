//! Backoff for transient upload failures within a single sync.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use accuread_common::Result;

/// Each retry waits twice as long as the previous one, up to `max_delay`.
const BACKOFF_FACTOR: u32 = 2;

/// How a failed upload is retried before the sync gives up.
///
/// Only errors for which [`accuread_common::Error::is_transient`] holds are
/// retried. Everything else fails the sync on the first attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; zero disables retrying.
    pub max_retries: u32,
    /// Wait before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single wait.
    pub max_delay: Duration,
    /// Spread each wait over 75%..125% of its nominal value.
    pub jitter: bool,
}

impl RetryPolicy {
    /// A policy that reports the first failure immediately.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Nominal wait before retry number `retry` (zero-based), capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let nominal = BACKOFF_FACTOR
            .checked_pow(retry)
            .and_then(|factor| self.initial_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay));

        if self.jitter {
            nominal.mul_f64(0.75 + rand::random::<f64>() * 0.5)
        } else {
            nominal
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of retries.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() || retries >= self.max_retries {
                if retries > 0 {
                    warn!("Giving up after {} retries: {}", retries, err);
                }
                return Err(err);
            }

            let delay = self.backoff(retries);
            retries += 1;
            warn!(
                "Transient failure ({}), retry {}/{} in {:?}",
                err, retries, self.max_retries, delay
            );
            sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accuread_common::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(50),
            jitter: false,
        }
    }

    #[test]
    fn test_backoff_doubles_until_capped() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            ..policy(5)
        };

        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
        assert_eq!(policy.backoff(4), Duration::from_secs(10));
        assert_eq!(policy.backoff(40), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(60),
            jitter: true,
            ..policy(1)
        };

        for _ in 0..50 {
            let delay = policy.backoff(0);
            assert!(delay >= Duration::from_secs(3) && delay <= Duration::from_secs(5));
        }
    }

    #[tokio::test]
    async fn test_default_does_not_retry() {
        let attempts = &AtomicU32::new(0);

        let result: Result<()> = RetryPolicy::default()
            .execute(move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::Network("connection reset".to_string()))
            })
            .await;

        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_network_error_retried_until_success() {
        let attempts = &AtomicU32::new(0);

        let result = policy(3)
            .execute(move || async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Network("connection failed".to_string()))
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejected_upload_not_retried() {
        let attempts = &AtomicU32::new(0);

        let result: Result<()> = policy(3)
            .execute(move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::Upload("batch rejected".to_string()))
            })
            .await;

        assert!(matches!(result, Err(Error::Upload(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let attempts = &AtomicU32::new(0);

        let result: Result<()> = policy(2)
            .execute(move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::Network("always fails".to_string()))
            })
            .await;

        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
