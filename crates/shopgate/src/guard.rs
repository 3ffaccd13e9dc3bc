//! Request admission and throttling responses.

use crate::config::GuardConfig;
use crate::error::Result;
use http::header::{HeaderValue, RETRY_AFTER};
use http::{HeaderMap, StatusCode};
use serde_json::{Value, json};
use shopgate_limiter::{
    Clock, PolicyClass, RateLimitDecision, RateLimiters, SystemClock, client_key,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Status to answer a throttled request with.
pub const THROTTLED_STATUS: StatusCode = StatusCode::TOO_MANY_REQUESTS;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Admission check for incoming requests.
///
/// Cheap to clone; clones share the same limiters.
///
/// # Examples
///
/// ```rust
/// use http::HeaderMap;
/// use shopgate::{Guard, GuardConfig, PolicyClass, rate_limit_headers};
///
/// # fn main() -> shopgate::Result<()> {
/// let guard = Guard::from_config(&GuardConfig::default())?;
/// let mut headers = HeaderMap::new();
/// headers.insert("x-real-ip", "203.0.113.7".parse().unwrap());
///
/// let decision = guard.check(PolicyClass::Auth, &headers);
/// assert!(decision.allowed);
/// assert_eq!(decision.remaining, 4);
///
/// let response_headers = rate_limit_headers(&decision, guard.now_millis());
/// assert_eq!(response_headers["x-ratelimit-limit"], "5");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Guard<C = SystemClock> {
    limiters: Arc<RateLimiters<C>>,
}

impl<C> Clone for Guard<C> {
    fn clone(&self) -> Self {
        Self {
            limiters: Arc::clone(&self.limiters),
        }
    }
}

impl Guard {
    /// Build limiters from `config` on the wall clock.
    pub fn from_config(config: &GuardConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(config.build_limiters()?)))
    }
}

impl<C: Clock> Guard<C> {
    /// Wrap existing limiters.
    pub fn new(limiters: Arc<RateLimiters<C>>) -> Self {
        Self { limiters }
    }

    /// The shared limiters, e.g. for a [`CleanupTask`](crate::CleanupTask).
    pub fn limiters(&self) -> &Arc<RateLimiters<C>> {
        &self.limiters
    }

    /// Check a request under `class`, keyed by client IP and user agent.
    pub fn check(&self, class: PolicyClass, headers: &HeaderMap) -> RateLimitDecision {
        self.check_key(class, &client_key(headers))
    }

    /// Check an explicit key under `class`.
    pub fn check_key(&self, class: PolicyClass, key: &str) -> RateLimitDecision {
        let decision = self.limiters.get(class).check(key);
        if !decision.allowed {
            warn!(class = %class, reset_at_ms = decision.reset_at_ms, "Rate limit exceeded");
            debug!(class = %class, key, "Rate limited key");
        }
        decision
    }

    /// Now, on the limiters' clock. Pass this to [`rate_limit_headers`] and
    /// [`throttled_body`].
    pub fn now_millis(&self) -> u64 {
        self.limiters.get(PolicyClass::Api).now_millis()
    }
}

/// Rate limit metadata for a response.
///
/// Always sets `x-ratelimit-limit`, `x-ratelimit-remaining` and
/// `x-ratelimit-reset` (epoch seconds, rounded up). `retry-after` is added
/// only for a denial.
pub fn rate_limit_headers(decision: &RateLimitDecision, now_ms: u64) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(4);
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    headers.insert(
        RESET_HEADER,
        HeaderValue::from(decision.reset_at_ms.div_ceil(1_000)),
    );

    if !decision.allowed {
        let wait = decision.retry_after(now_ms);
        headers.insert(RETRY_AFTER, HeaderValue::from(wait.as_secs()));
    }
    headers
}

/// JSON body for a throttled request: `{"error": "Too many requests", "retryAfter": <secs>}`.
pub fn throttled_body(decision: &RateLimitDecision, now_ms: u64) -> Value {
    json!({
        "error": "Too many requests",
        "retryAfter": decision.retry_after(now_ms).as_secs(),
    })
}
