//! Bounded retry for transient collaborator failures.
//!
//! Collaborators tag recoverable failures (network hiccups, 5xx, throttling)
//! with [`TransientError`]. Anything else is permanent and returned as-is.

use anyhow::Result;
use rand::Rng;
use std::fmt;
use std::time::Duration;

/// Marker error for failures worth retrying.
#[derive(Debug)]
pub struct TransientError {
    message: String,
}

impl TransientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TransientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transient service error: {}", self.message)
    }
}

impl std::error::Error for TransientError {}

/// Returns true if any error in the chain is a [`TransientError`].
pub fn is_transient(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<TransientError>())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. 1 disables retries.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based), with up to 50% jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        let capped = exp.min(self.max_delay);
        let jitter_ms = (capped.as_millis() as u64) / 2;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        capped.saturating_sub(Duration::from_millis(jitter))
    }

    /// Runs `op`, retrying transient failures up to `max_attempts` total.
    pub fn run<T>(&self, what: &str, op: impl FnMut() -> Result<T>) -> Result<T> {
        self.run_with_sleep(what, op, std::thread::sleep)
    }

    pub(crate) fn run_with_sleep<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts && is_transient(&err) => {
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "{} failed (attempt {}/{}), retrying in {}ms: {:#}",
                        what,
                        attempt,
                        max_attempts,
                        delay.as_millis(),
                        err
                    );
                    sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
