//! Retry with exponential backoff and random jitter for outbound calls.
//!
//! Every network operation of a run goes through [`with_retry`], so the
//! policy is configured once and applies to host and completion calls alike.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::warn;

/// Bounded retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Lower bound of every wait, and the seed of the exponential ceiling
    pub base_delay: Duration,
    /// Upper bound of every wait
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy that retries immediately; used in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Exponential ceiling for the wait after the given (zero-based) failed attempt.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Random wait in `[base_delay, ceiling(attempt)]`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let low = self.base_delay.min(self.max_delay).as_secs_f64();
        let high = self.ceiling(attempt).as_secs_f64().max(low);
        Duration::from_secs_f64(rand::thread_rng().gen_range(low..=high))
    }
}

/// All attempts of an operation failed; carries the last error.
#[derive(Debug, Error)]
#[error("{operation} failed after {attempts} attempts: {source}")]
pub struct RetryExhausted<E: std::error::Error + 'static> {
    pub operation: String,
    pub attempts: u32,
    #[source]
    pub source: E,
}

/// Run `call` until it succeeds or the policy's attempts are used up.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(source) if attempt + 1 >= max_attempts => {
                return Err(RetryExhausted {
                    operation: operation.to_string(),
                    attempts: attempt + 1,
                    source,
                });
            }
            Err(err) => {
                let delay = policy.backoff(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
