//! Exponential backoff with optional jitter.

use super::strategy::BackoffStrategy;
use std::time::Duration;

/// Waits that grow geometrically between attempts.
///
/// The wait before retry `n` (0-based) is
///
/// ```text
/// wait(n) = min(initial_delay * multiplier^n ± jitter, max_delay)
/// ```
///
/// With the defaults (3 retries, 1s initial, 30s cap, ×2, no jitter) a
/// call that keeps failing is attempted four times, with waits of 1s, 2s
/// and 4s between attempts.
///
/// # Examples
///
/// ```rust
/// use shopgate_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
///
/// let schedule = ExponentialBackoff::default();
/// let waits: Vec<_> = (0..schedule.max_retries())
///     .filter_map(|n| schedule.next_delay(n))
///     .collect();
/// assert_eq!(waits, [1, 2, 4].map(Duration::from_secs));
///
/// // A tighter schedule for an interactive request path.
/// let interactive = ExponentialBackoff::builder()
///     .max_retries(2)
///     .initial_delay(Duration::from_millis(50))
///     .multiplier(3.0)
///     .build();
/// assert_eq!(interactive.next_delay(1), Some(Duration::from_millis(150)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Start from the defaults and override what you need.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder {
            backoff: Self::default(),
        }
    }

    /// Wait before the first retry.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Upper bound for any single wait.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Growth factor between consecutive waits.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Relative spread applied to each wait, in `[0, 1]`.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    fn spread(&self, base_nanos: f64) -> f64 {
        if self.jitter == 0.0 {
            return base_nanos;
        }
        let offset = rand::random::<f64>().mul_add(2.0, -1.0);
        base_nanos * offset.mul_add(self.jitter, 1.0)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if self.initial_delay.is_zero() {
            return Some(Duration::ZERO);
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_nanos = self.initial_delay.as_nanos() as f64 * self.multiplier.powi(exponent);
        if base_nanos.is_nan() {
            return Some(Duration::ZERO);
        }

        // An overflowing power is +inf and ends at the cap.
        let cap_nanos = self.max_delay.as_nanos() as f64;
        let wait_nanos = self.spread(base_nanos).min(cap_nanos).max(0.0);
        Some(Duration::from_nanos(wait_nanos.round() as u64))
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Builder for [`ExponentialBackoff`]. Unset fields keep their defaults.
///
/// ```rust
/// use shopgate_core::retry::ExponentialBackoff;
/// use std::time::Duration;
///
/// let reconcile = ExponentialBackoff::builder()
///     .max_retries(6)
///     .initial_delay(Duration::from_millis(250))
///     .max_delay(Duration::from_secs(10))
///     .jitter(0.25)
///     .build();
/// assert_eq!(reconcile.jitter(), 0.25);
/// ```
#[derive(Debug, Clone)]
pub struct ExponentialBackoffBuilder {
    backoff: ExponentialBackoff,
}

impl Default for ExponentialBackoffBuilder {
    fn default() -> Self {
        ExponentialBackoff::builder()
    }
}

impl ExponentialBackoffBuilder {
    /// Retries after the first attempt. Default 3.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.backoff.max_retries = max_retries;
        self
    }

    /// Wait before the first retry. Default 1s.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.backoff.initial_delay = delay;
        self
    }

    /// Cap on any single wait. Default 30s.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.backoff.max_delay = delay;
        self
    }

    /// Growth factor. Default 2.0.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.backoff.multiplier = multiplier;
        self
    }

    /// Relative spread, clamped to `[0, 1]`. 0.2 means each wait lands
    /// anywhere within ±20% of its base value. Default 0.0.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.backoff.jitter = if jitter.is_nan() { 0.0 } else { jitter.clamp(0.0, 1.0) };
        self
    }

    /// Finish the schedule.
    pub fn build(self) -> ExponentialBackoff {
        self.backoff
    }
}
