//! Fixed-delay retry for broker requests.

use std::fmt::Display;
use std::time::Duration;
use tracing::warn;

/// How many times to try, and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// An operation that failed on every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last: E,
}

/// Run `op` until it succeeds or the policy runs out of attempts.
///
/// `op` receives the 1-based attempt number. The delay is slept between
/// attempts only, never after the last one. On exhaustion the last error is
/// returned with the attempt count.
pub fn with_retries<T, E, F>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, Exhausted<E>>
where
    E: Display,
    F: FnMut(u32) -> Result<T, E>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(%label, attempt, max_attempts = attempts, error = %e, "request failed; retrying");
                if !policy.delay.is_zero() {
                    std::thread::sleep(policy.delay);
                }
                attempt += 1;
            }
            Err(e) => {
                warn!(%label, attempts, error = %e, "request failed; giving up");
                return Err(Exhausted { attempts, last: e });
            }
        }
    }
}
