//! Bounded retry for the initial connect.
//!
//! The room client retries a fixed number of times with a fixed pause in
//! between. [`Backoff::Exponential`] exists so the schedule can be changed
//! without touching the connect loop.

use std::time::Duration;

use log::warn;

/// Delay schedule between attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// Delay doubles after each failure, capped at `max`.
    Exponential { initial: Duration, max: Duration },
}

/// Policy controlling connect attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts including the first attempt.
    pub max_attempts: usize,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Same `interval` between each of `max_attempts` tries.
    pub fn fixed(max_attempts: usize, interval: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(interval),
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        match &self.backoff {
            Backoff::Fixed(d) => *d,
            Backoff::Exponential { initial, max } => {
                let mut delay = *initial;
                for _ in 1..attempt {
                    delay = std::cmp::min(delay.saturating_mul(2), *max);
                }
                delay
            }
        }
    }
}

/// Five attempts, one second apart.
impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(5, Duration::from_secs(1))
    }
}

/// Runs `op` until it succeeds or the policy is exhausted, sleeping the
/// thread between attempts. Returns the last error together with the number
/// of attempts made.
///
/// `op` receives the 1-based attempt number.
pub fn retry_blocking<T, E, Op>(policy: &RetryPolicy, mut op: Op) -> Result<T, (usize, E)>
where
    Op: FnMut(usize) -> Result<T, E>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= max_attempts {
                    return Err((attempt, error));
                }

                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "attempt {}/{} failed: {} (retrying in {:?})",
                    attempt, max_attempts, error, delay
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                attempt += 1;
            }
        }
    }
}
