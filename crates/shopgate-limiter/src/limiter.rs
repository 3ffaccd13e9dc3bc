//! Per-key token-bucket rate limiter.

use crate::bucket::TokenBucket;
use crate::clock::{Clock, SystemClock};
use crate::decision::RateLimitDecision;
use crate::policy::RateLimitPolicy;
use dashmap::DashMap;
use std::time::Duration;
use tracing::{debug, trace};

/// Buckets untouched for longer than this are evicted by [`RateLimiter::cleanup`].
pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(60 * 60);

/// Admission controller for one policy.
///
/// Holds one token bucket per key, created lazily at full capacity on first
/// use. All access to a key's bucket happens under that key's map entry
/// lock, so the refill-check-decrement sequence of
/// [`is_allowed`](Self::is_allowed) is atomic with respect to other callers.
/// Distinct keys proceed in parallel.
///
/// The limiter never schedules anything itself. Call
/// [`cleanup`](Self::cleanup) periodically from the application's own
/// background task to bound memory under high key cardinality.
///
/// # Examples
///
/// ```rust
/// use shopgate_limiter::{ManualClock, RateLimitPolicy, RateLimiter};
///
/// let clock = ManualClock::new(0);
/// let limiter = RateLimiter::with_clock(RateLimitPolicy::new(3, 1, 5_000), clock.clone());
///
/// assert!(limiter.is_allowed("k"));
/// assert!(limiter.is_allowed("k"));
/// assert!(limiter.is_allowed("k"));
/// assert!(!limiter.is_allowed("k"));
///
/// clock.set(5_000);
/// assert!(limiter.is_allowed("k"));
/// ```
#[derive(Debug)]
pub struct RateLimiter<C = SystemClock> {
    policy: RateLimitPolicy,
    buckets: DashMap<String, TokenBucket>,
    clock: C,
    max_idle: Duration,
}

impl RateLimiter {
    /// A limiter on the wall clock.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_clock(policy, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    /// A limiter reading time from `clock`.
    pub fn with_clock(policy: RateLimitPolicy, clock: C) -> Self {
        Self {
            policy,
            buckets: DashMap::new(),
            clock,
            max_idle: DEFAULT_MAX_IDLE,
        }
    }

    /// Set how long a bucket may sit untouched before [`cleanup`](Self::cleanup) evicts it.
    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// The policy this limiter enforces.
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// The eviction threshold.
    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    /// Now, according to this limiter's clock.
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Consume one permit for `key` if one is available.
    ///
    /// Returns `false` without touching the token count when the bucket is
    /// empty.
    pub fn is_allowed(&self, key: &str) -> bool {
        let allowed = self.with_bucket(key, TokenBucket::try_consume);
        if !allowed {
            trace!(key, "Bucket empty");
        }
        allowed
    }

    /// Tokens currently available to `key`, after refilling. Consumes nothing.
    pub fn remaining_tokens(&self, key: &str) -> u32 {
        self.with_bucket(key, |bucket| bucket.tokens)
    }

    /// Epoch milliseconds at which `key` may next gain tokens.
    ///
    /// This is `last_refill + refill_interval`; the bucket is not refilled by
    /// this call. Full capacity is not guaranteed at that instant.
    pub fn reset_time(&self, key: &str) -> u64 {
        let now = self.clock.now_millis();
        let policy = &self.policy;
        if let Some(bucket) = self.buckets.get(key) {
            return bucket.reset_at(policy);
        }
        self.buckets
            .entry(key.to_owned())
            .or_insert_with(|| TokenBucket::full(policy, now))
            .reset_at(policy)
    }

    /// [`is_allowed`](Self::is_allowed) plus a snapshot of the bucket, taken
    /// under the same lock.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        let limit = self.policy.capacity;
        let policy = self.policy;
        self.with_bucket(key, |bucket| RateLimitDecision {
            allowed: bucket.try_consume(),
            limit,
            remaining: bucket.tokens,
            reset_at_ms: bucket.reset_at(&policy),
        })
    }

    /// Evict every bucket whose last refill is older than the max-idle
    /// threshold. Returns how many were evicted.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_millis();
        let max_idle = self.max_idle.as_millis() as u64;
        let mut evicted = 0;

        self.buckets.retain(|_, bucket| {
            let keep = now.saturating_sub(bucket.last_refill) <= max_idle;
            if !keep {
                evicted += 1;
            }
            keep
        });

        if evicted > 0 {
            debug!(evicted, remaining = self.buckets.len(), "Evicted idle rate limit buckets");
        }
        evicted
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn with_bucket<R>(&self, key: &str, f: impl FnOnce(&mut TokenBucket) -> R) -> R {
        let now = self.clock.now_millis();
        let policy = &self.policy;

        // Existing keys avoid allocating an owned key.
        if let Some(mut bucket) = self.buckets.get_mut(key) {
            bucket.refill(policy, now);
            return f(&mut *bucket);
        }

        let mut bucket = self
            .buckets
            .entry(key.to_owned())
            .or_insert_with(|| TokenBucket::full(policy, now));
        bucket.refill(policy, now);
        f(&mut *bucket)
    }
}
