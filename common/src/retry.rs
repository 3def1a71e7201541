// Retry strategies for trigger paths with nobody waiting to retry by hand

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry strategy trait for calculating retry delays
pub trait RetryStrategy: Send + Sync {
    /// Delay before the next attempt, or `None` once attempts are exhausted.
    /// `attempts_made` counts the attempts already executed.
    fn next_delay(&self, attempts_made: u32) -> Option<Duration>;

    /// Total number of attempts this strategy allows.
    fn max_attempts(&self) -> u32;
}

/// Linearly increasing backoff: the delay before attempt N+1 is N times the
/// base delay. With the defaults (3 attempts, 250 ms base) the sequence is
/// 250 ms then 500 ms.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base_delay: Duration,
    max_attempts: u32,
}

impl LinearBackoff {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(250),
            max_attempts: 3,
        }
    }
}

impl RetryStrategy for LinearBackoff {
    fn next_delay(&self, attempts_made: u32) -> Option<Duration> {
        if attempts_made >= self.max_attempts {
            return None;
        }
        Some(self.base_delay * attempts_made)
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Drive a fallible async operation under a retry strategy. Returns the
/// first success, or the last error once the strategy is exhausted.
pub async fn run_with_retry<T, E, Fut, Op>(strategy: &dyn RetryStrategy, mut op: Op) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempts_made = 0u32;
    loop {
        attempts_made += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => match strategy.next_delay(attempts_made) {
                Some(delay) => {
                    warn!(
                        attempt = attempts_made,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_linear_backoff_sequence() {
        let strategy = LinearBackoff::default();

        // After the 1st failed attempt: 1 × 250 ms.
        assert_eq!(strategy.next_delay(1), Some(Duration::from_millis(250)));
        // After the 2nd failed attempt: 2 × 250 ms.
        assert_eq!(strategy.next_delay(2), Some(Duration::from_millis(500)));
        // Three attempts total, then give up.
        assert_eq!(strategy.next_delay(3), None);
    }

    #[test]
    fn test_custom_configuration() {
        let strategy = LinearBackoff::new(Duration::from_millis(100), 5);
        assert_eq!(strategy.max_attempts(), 5);
        assert_eq!(strategy.next_delay(4), Some(Duration::from_millis(400)));
        assert_eq!(strategy.next_delay(5), None);
    }

    #[test]
    fn test_at_least_one_attempt() {
        let strategy = LinearBackoff::new(Duration::from_millis(100), 0);
        assert_eq!(strategy.max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let strategy = LinearBackoff::default();
        let calls = AtomicU32::new(0);

        let result: Result<u32, String> = run_with_retry(&strategy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(format!("transient failure {}", n))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_last_error() {
        let strategy = LinearBackoff::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = run_with_retry(&strategy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(format!("failure {}", n)) }
        })
        .await;

        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_first_success_returns_immediately() {
        let strategy = LinearBackoff::default();
        let result: Result<&str, String> = run_with_retry(&strategy, || async { Ok("done") }).await;
        assert_eq!(result, Ok("done"));
    }
}
