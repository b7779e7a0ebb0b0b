//! Bounded retry with exponential backoff and jitter.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Backoff policy for retried operations.
///
/// `delay = base_delay * backoff_factor^attempt + uniform(0, jitter)`,
/// attempt 0-based.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
            jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy with no sleeps, for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            backoff_factor: 1.0,
            jitter: Duration::ZERO,
        }
    }

    /// Delay before re-attempting after failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let jitter = if self.jitter.is_zero() {
            0.0
        } else {
            rand::thread_rng().gen_range(0.0..self.jitter.as_secs_f64())
        };
        Duration::from_secs_f64(scaled + jitter)
    }
}

/// Run `op`, retrying failures for which `retryable` returns true.
///
/// `op` receives the 0-based attempt number and runs at most
/// `max_retries + 1` times. Exhausting the budget, or a non-retryable
/// error, propagates the last error unchanged.
pub async fn run_with_retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    retryable: P,
    mut op: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt: u32 = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries && retryable(&err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    max = policy.max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "operation failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
