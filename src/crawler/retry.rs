//! Fixed-delay retry for flaky portal navigation
//!
//! # Retry Logic
//!
//! | Operation | Attempts | Delay |
//! |-----------|----------|-------|
//! | Entry page load | 3 | 1s |
//! | Record page load | 3 | 1s |
//!
//! The delay is slept before each retry only, never after the final failure.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// How often and how patiently an operation is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one
    pub delay: Duration,
}

/// The last failure of an operation that never succeeded
#[derive(Debug)]
pub struct RetryError<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last_error)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Policy used for every page navigation: 3 attempts, 1 second apart
    pub fn navigation() -> Self {
        Self::new(3, Duration::from_secs(1))
    }

    /// Runs `op` until it succeeds or the attempts run out
    ///
    /// # Arguments
    ///
    /// * `what` - Short description used in log lines
    /// * `op` - Called with the 1-based attempt number
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - Value of the first successful attempt
    /// * `Err(RetryError)` - Every attempt failed; carries the last error
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        E: fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!("{} succeeded on attempt {}", what, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if attempt < self.max_attempts => {
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}",
                        what,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        "{} failed (attempt {}/{}), giving up: {}",
                        what,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    return Err(RetryError {
                        attempts: attempt,
                        last_error: e,
                    });
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::navigation()
    }
}
