//! Whole-call retry for remote generation requests.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How the delay grows between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// `base * 2^(attempt-1)`, capped, with ±`jitter_factor` randomization.
    Exponential { max_delay_ms: u64, jitter_factor: f64 },
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = try once).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1500,
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    /// Try once, never sleep.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
            backoff: Backoff::Fixed,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.base_delay_ms = delay_ms;
        self
    }

    pub fn with_exponential_backoff(mut self, max_delay_ms: u64, jitter_factor: f64) -> Self {
        self.backoff = Backoff::Exponential {
            max_delay_ms,
            jitter_factor: jitter_factor.clamp(0.0, 1.0),
        };
        self
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = match self.backoff {
            Backoff::Fixed => self.base_delay_ms,
            Backoff::Exponential {
                max_delay_ms,
                jitter_factor,
            } => {
                let exponential = self
                    .base_delay_ms
                    .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
                let capped = exponential.min(max_delay_ms);

                let jitter_range = (capped as f64 * jitter_factor) as i64;
                if jitter_range > 0 {
                    let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
                    (capped as i64 + jitter).max(0) as u64
                } else {
                    capped
                }
            }
        };
        Duration::from_millis(ms)
    }

    /// Run `operation` until it succeeds or retries run out.
    ///
    /// Every error is retried. The last error is returned when all attempts fail.
    pub async fn run<T, E, F, Fut>(&self, operation_name: &str, operation: F) -> Result<T, E>
    where
        E: Display,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(
                            attempt = attempt + 1,
                            operation = operation_name,
                            "Request succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        operation = operation_name,
                        "Request failed, retrying..."
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        attempts = attempt + 1,
                        error = %e,
                        operation = operation_name,
                        "Request failed after all retry attempts"
                    );
                    return Err(e);
                }
            }
        }
    }
}
