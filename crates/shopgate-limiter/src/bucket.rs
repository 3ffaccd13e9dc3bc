//! Token bucket state for a single key.

use crate::policy::RateLimitPolicy;

/// Permits available to one key, plus the last time they were topped up.
///
/// Invariant: `tokens <= capacity` of the policy the bucket was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TokenBucket {
    pub(crate) tokens: u32,
    pub(crate) last_refill: u64,
}

impl TokenBucket {
    /// A full bucket, as seen by a key's first request.
    pub(crate) fn full(policy: &RateLimitPolicy, now: u64) -> Self {
        Self {
            tokens: policy.capacity,
            last_refill: now,
        }
    }

    /// Lazy refill: add `refill_rate` per whole elapsed interval, then snap
    /// `last_refill` to `now`.
    ///
    /// The fractional remainder of the elapsed time is discarded on every
    /// call, so a key checked more often than once per interval refills
    /// more slowly than one checked on interval boundaries. A clock that
    /// moves backwards counts as zero elapsed time and never rewinds
    /// `last_refill`.
    pub(crate) fn refill(&mut self, policy: &RateLimitPolicy, now: u64) {
        let elapsed = now.saturating_sub(self.last_refill);
        let whole_intervals = elapsed / policy.refill_interval_ms.max(1);
        let added = whole_intervals.saturating_mul(u64::from(policy.refill_rate));
        let tokens = u64::from(self.tokens).saturating_add(added);

        self.tokens = tokens.min(u64::from(policy.capacity)) as u32;
        self.last_refill = self.last_refill.max(now);
    }

    /// Take one permit if there is one.
    pub(crate) fn try_consume(&mut self) -> bool {
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// When additional tokens may next become available.
    pub(crate) fn reset_at(&self, policy: &RateLimitPolicy) -> u64 {
        self.last_refill.saturating_add(policy.refill_interval_ms)
    }
}
