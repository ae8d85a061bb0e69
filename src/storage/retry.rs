//! Retry policy for storage calls that fail transiently
use crate::storage::StorageError;
use std::thread;
use std::time::Duration;

/// Backoff used between attempts of the default policy
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// Statuses that indicate rate limiting or a transient server error
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 403 | 429 | 500 | 503)
}

/// Fixed-delay retry policy keyed on the HTTP status of a failure
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay between two attempts
    pub backoff: Duration,
    /// Whether a failure with this status may be retried
    pub retryable: fn(u16) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 2,
            backoff: DEFAULT_BACKOFF,
            retryable: is_retryable_status,
        }
    }
}

impl RetryPolicy {
    /// Runs an operation, retrying retryable failures until the attempts are exhausted.
    /// Failures without a status or with a non-retryable status are returned immediately.
    pub fn run<T, F>(&self, operation: &str, mut call: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Result<T, StorageError>,
    {
        let mut attempt = 1;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(error) if attempt < self.max_attempts && error.status().is_some_and(self.retryable) => {
                    tracing::warn!(operation, attempt, %error, backoff = ?self.backoff, "retrying storage call");
                    thread::sleep(self.backoff);
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
