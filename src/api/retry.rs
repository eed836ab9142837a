//! Bounded retry with an acceptance predicate.
//!
//! Every retry loop in the pipeline goes through [`retry_until_with`]: transport backoff
//! (retries retryable errors, accepts any body), hyperlink preservation (stops on errors,
//! accepts drafts that keep the anchor text) and shortening.

use std::thread;
use std::time::Duration;

use log::debug;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// base * attempt
    Linear,
    /// base * 2^(attempt - 1)
    Exponential,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (0 is treated as 1)
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
    /// Retry after an `Err`; otherwise an error ends the loop immediately
    pub retry_on_error: bool,
}

impl RetryPolicy {
    /// Delay slept after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(attempt),
            Backoff::Exponential => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        }
    }
}

/// Outcome of a bounded retry loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T, E> {
    /// An attempt produced a value the predicate accepted
    Accepted { value: T, attempts: u32 },
    /// Attempts ran out; `last` is the final rejected value
    Exhausted { last: T, attempts: u32 },
    /// An error ended the loop (or the last attempt failed)
    Failed { error: E, attempts: u32 },
}

/// Run `op` until `accept` returns true or the policy's attempts run out.
///
/// `op` receives the 1-based attempt number.
pub fn retry_until<T, E, F, P>(policy: &RetryPolicy, op: F, accept: P) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    P: Fn(&T) -> bool,
{
    retry_until_with(policy, op, accept, |_| true)
}

/// [`retry_until`] where only errors passing `retryable` are retried, and only when
/// the policy retries errors at all.
pub fn retry_until_with<T, E, F, P, R>(policy: &RetryPolicy, mut op: F, accept: P, retryable: R) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    P: Fn(&T) -> bool,
    R: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt) {
            Ok(value) if accept(&value) => {
                return RetryOutcome::Accepted { value, attempts: attempt };
            }
            Ok(value) => {
                if attempt >= max_attempts {
                    return RetryOutcome::Exhausted { last: value, attempts: attempt };
                }
            }
            Err(error) => {
                if !policy.retry_on_error || !retryable(&error) || attempt >= max_attempts {
                    return RetryOutcome::Failed { error, attempts: attempt };
                }
            }
        }

        let delay = policy.delay_after(attempt);
        debug!("[retry] Attempt {} rejected, retrying in {:?}", attempt, delay);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        attempt += 1;
    }
}
