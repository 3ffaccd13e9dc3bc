//! Backoff strategy abstraction.

use std::time::Duration;

/// A strategy for spacing out retries of a failed operation.
///
/// Implementations decide how long to wait before each retry and when to
/// give up. Whether a given failure is worth retrying at all is a separate
/// concern, see [`RetryClassifier`](super::RetryClassifier).
///
/// # Examples
///
/// ```rust
/// use shopgate_core::retry::BackoffStrategy;
/// use std::time::Duration;
///
/// /// Retries twice, always waiting the same amount.
/// struct Fixed(Duration);
///
/// impl BackoffStrategy for Fixed {
///     fn next_delay(&self, attempt: u32) -> Option<Duration> {
///         (attempt < self.max_retries()).then_some(self.0)
///     }
///
///     fn max_retries(&self) -> u32 {
///         2
///     }
/// }
///
/// let fixed = Fixed(Duration::from_millis(250));
/// assert_eq!(fixed.next_delay(0), Some(Duration::from_millis(250)));
/// assert_eq!(fixed.next_delay(2), None);
/// ```
pub trait BackoffStrategy: Send + Sync {
    /// Wait before retry number `attempt + 1`, where `attempt` counts the
    /// retries already made. It is consulted after a failure has been judged
    /// retryable and before sleeping.
    ///
    /// `None` ends the sequence early, and the last failure is returned to
    /// the caller.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// Retry budget, not counting the first attempt. A budget of 3 means at
    /// most 4 calls.
    fn max_retries(&self) -> u32;
}
