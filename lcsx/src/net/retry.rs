//! Fixed-delay retry combinator shared by every resilient call site.

use crate::runtime::constants::network;
use std::fmt::Display;
use std::time::Duration;

/// How many times to try an operation and how long to wait in between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

/// All attempts failed; carries the error of the final attempt.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last: E,
}

impl RetryPolicy {
    /// At least one attempt is always made.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Retry without sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds or the budget is spent.
    ///
    /// `op` receives the 1-based attempt number. Any cleanup needed
    /// between attempts belongs inside `op`.
    pub fn run<T, E, F>(&self, what: &str, mut op: F) -> Result<T, Exhausted<E>>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            if attempt > 1 {
                tracing::info!(
                    "Retrying {} (attempt {}/{})",
                    what,
                    attempt,
                    self.max_attempts
                );
            }

            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => {
                    tracing::error!(
                        "{} failed after {} attempt(s): {}",
                        what,
                        attempt,
                        e
                    );
                    return Err(Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}",
                        what,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
            }

            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(network::MAX_DOWNLOAD_RETRIES, network::RETRY_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_succeeds_on_last_attempt() {
        let policy = RetryPolicy::immediate(3);
        let mut seen = Vec::new();

        let result: Result<u32, Exhausted<String>> = policy.run("op", |attempt| {
            seen.push(attempt);
            if attempt < 3 {
                Err(format!("boom {attempt}"))
            } else {
                Ok(attempt)
            }
        });

        assert_eq!(result.unwrap(), 3);
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_exhausted_keeps_last_error() {
        let policy = RetryPolicy::immediate(2);
        let err = policy
            .run("op", |attempt| Err::<(), _>(format!("boom {attempt}")))
            .unwrap_err();

        assert_eq!(err.attempts, 2);
        assert_eq!(err.last, "boom 2");
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = RetryPolicy::immediate(0);
        let mut calls = 0;
        let _ = policy.run("op", |_| {
            calls += 1;
            Err::<(), _>("no")
        });
        assert_eq!(calls, 1);
    }
}
