//! Snapshot of an admission check.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Outcome of [`RateLimiter::check`](crate::RateLimiter::check).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    /// Whether a permit was consumed
    pub allowed: bool,
    /// Bucket capacity
    pub limit: u32,
    /// Permits left after this check
    pub remaining: u32,
    /// Epoch milliseconds at which more permits may become available
    pub reset_at_ms: u64,
}

impl RateLimitDecision {
    /// How long a denied caller should wait before trying again.
    ///
    /// Rounded up to whole seconds, and never less than one second for a
    /// denial. Zero when the request was allowed.
    pub fn retry_after(&self, now_ms: u64) -> Duration {
        if self.allowed {
            return Duration::ZERO;
        }
        let wait_ms = self.reset_at_ms.saturating_sub(now_ms);
        Duration::from_secs(wait_ms.div_ceil(1_000).max(1))
    }

    /// The reset instant as a UTC timestamp.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.reset_at_ms)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}
