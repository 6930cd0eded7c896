//! # Retry with backoff
//!
//! All retried lifecycle stages share one combinator, parameterized by a [RetryPolicy].
//!
//! ````
//! use esp_at_telemetry::retry::{Backoff, RetryPolicy};
//!
//! let policy = RetryPolicy::linear(3, 1_000);
//! assert_eq!(1_000, policy.delay_ms(1));
//! assert_eq!(2_000, policy.delay_ms(2));
//!
//! let policy = RetryPolicy::new(4, 500, Backoff::Exponential);
//! assert_eq!(2_000, policy.delay_ms(3));
//! ````
use core::fmt::Debug;
use log::{error, info, warn};

/// Growth of the delay between two failed attempts
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Backoff {
    /// Same delay after every attempt
    Constant,
    /// base * attempt
    Linear,
    /// base * 2^(attempt - 1)
    Exponential,
}

/// Bounded retry policy of a single stage
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    /// Max. number of attempts. Zero is treated as a single attempt.
    pub max_attempts: u8,

    /// Base delay in milliseconds
    pub base_delay_ms: u32,

    pub backoff: Backoff,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u8, base_delay_ms: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            backoff,
        }
    }

    /// Policy with a delay of `base_delay_ms * attempt`
    pub const fn linear(max_attempts: u8, base_delay_ms: u32) -> Self {
        Self::new(max_attempts, base_delay_ms, Backoff::Linear)
    }

    /// Policy without any retries
    pub const fn once() -> Self {
        Self::new(1, 0, Backoff::Constant)
    }

    /// Returns the delay after the given (1-based) failed attempt
    pub fn delay_ms(&self, attempt: u8) -> u32 {
        let attempt = attempt.max(1);

        match self.backoff {
            Backoff::Constant => self.base_delay_ms,
            Backoff::Linear => self.base_delay_ms.saturating_mul(attempt as u32),
            Backoff::Exponential => {
                let factor = 1u32.checked_shl(attempt as u32 - 1).unwrap_or(u32::MAX);
                self.base_delay_ms.saturating_mul(factor)
            }
        }
    }

    /// Effective number of attempts
    pub fn attempts(&self) -> u8 {
        self.max_attempts.max(1)
    }
}

/// Anything able to sleep between two attempts
pub(crate) trait BackoffDelay {
    fn backoff_ms(&mut self, duration_ms: u32);
}

/// Calls `operation` until it succeeds or the policy is exhausted. The last error is returned.
///
/// The delay is only applied between failed attempts, never after the last one.
pub(crate) fn with_retry<C, R, E, F>(context: &mut C, policy: &RetryPolicy, stage: &str, operation: F) -> Result<R, E>
where
    C: BackoffDelay,
    E: Debug,
    F: FnMut(&mut C) -> Result<R, E>,
{
    retry_while(context, policy, stage, |_| true, operation)
}

/// Same as [with_retry], but stops as soon as `retryable` rejects an error
pub(crate) fn retry_while<C, R, E, P, F>(
    context: &mut C,
    policy: &RetryPolicy,
    stage: &str,
    mut retryable: P,
    mut operation: F,
) -> Result<R, E>
where
    C: BackoffDelay,
    E: Debug,
    P: FnMut(&E) -> bool,
    F: FnMut(&mut C) -> Result<R, E>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation(context) {
            Ok(result) => {
                if attempt > 1 {
                    info!("{} succeeded on attempt {}/{}", stage, attempt, attempts);
                }
                return Ok(result);
            }
            Err(error) if !retryable(&error) => {
                error!("{} failed on attempt {} with permanent error: {:?}", stage, attempt, error);
                return Err(error);
            }
            Err(error) if attempt >= attempts => {
                error!("{} failed after {} attempts: {:?}", stage, attempt, error);
                return Err(error);
            }
            Err(error) => {
                let delay = policy.delay_ms(attempt);
                warn!(
                    "{} attempt {}/{} failed: {:?}, retrying in {} ms",
                    stage, attempt, attempts, error, delay
                );
                context.backoff_ms(delay);
                attempt += 1;
            }
        }
    }
}
