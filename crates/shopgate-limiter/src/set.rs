//! One limiter per policy class.

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::limiter::RateLimiter;
use crate::policy::{PolicyClass, RateLimitPolicy};
use std::time::Duration;

/// The limiters for every [`PolicyClass`], built once at startup and shared
/// with request handlers.
///
/// Each class has its own bucket registry, so the same client key is
/// counted independently per class.
///
/// # Examples
///
/// ```rust
/// use shopgate_limiter::{PolicyClass, RateLimiters};
///
/// let limiters = RateLimiters::default();
/// let key = "203.0.113.7:Mozilla/5.0";
///
/// assert!(limiters.get(PolicyClass::Sensitive).is_allowed(key));
/// assert_eq!(limiters.get(PolicyClass::Sensitive).remaining_tokens(key), 2);
/// assert_eq!(limiters.get(PolicyClass::Read).remaining_tokens(key), 200);
/// ```
#[derive(Debug)]
pub struct RateLimiters<C = SystemClock> {
    auth: RateLimiter<C>,
    api: RateLimiter<C>,
    read: RateLimiter<C>,
    sensitive: RateLimiter<C>,
}

impl Default for RateLimiters {
    /// The built-in policies on the wall clock.
    fn default() -> Self {
        let build = |class: PolicyClass| RateLimiter::new(class.default_policy());
        Self {
            auth: build(PolicyClass::Auth),
            api: build(PolicyClass::Api),
            read: build(PolicyClass::Read),
            sensitive: build(PolicyClass::Sensitive),
        }
    }
}

impl<C: Clock + Clone> RateLimiters<C> {
    /// Build limiters from a policy lookup, validating every policy.
    ///
    /// All limiters share `clock`.
    pub fn from_policies(
        clock: C,
        max_idle: Duration,
        policy_for: impl Fn(PolicyClass) -> RateLimitPolicy,
    ) -> Result<Self> {
        let build = |class: PolicyClass| -> Result<RateLimiter<C>> {
            let policy = policy_for(class);
            policy.validate()?;
            Ok(RateLimiter::with_clock(policy, clock.clone()).with_max_idle(max_idle))
        };

        Ok(Self {
            auth: build(PolicyClass::Auth)?,
            api: build(PolicyClass::Api)?,
            read: build(PolicyClass::Read)?,
            sensitive: build(PolicyClass::Sensitive)?,
        })
    }
}

impl<C: Clock> RateLimiters<C> {
    /// The limiter for `class`.
    pub fn get(&self, class: PolicyClass) -> &RateLimiter<C> {
        match class {
            PolicyClass::Auth => &self.auth,
            PolicyClass::Api => &self.api,
            PolicyClass::Read => &self.read,
            PolicyClass::Sensitive => &self.sensitive,
        }
    }

    /// Every class with its limiter.
    pub fn iter(&self) -> impl Iterator<Item = (PolicyClass, &RateLimiter<C>)> {
        PolicyClass::ALL
            .into_iter()
            .map(move |class| (class, self.get(class)))
    }

    /// Run [`RateLimiter::cleanup`] on every class. Returns the total evicted.
    pub fn cleanup(&self) -> usize {
        self.iter().map(|(_, limiter)| limiter.cleanup()).sum()
    }

    /// Total tracked keys across classes.
    pub fn len(&self) -> usize {
        self.iter().map(|(_, limiter)| limiter.len()).sum()
    }

    /// Whether no class tracks any key.
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, limiter)| limiter.is_empty())
    }
}
