//! Replenishment policies and the named policy classes.

use crate::error::{LimiterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How many permits a bucket holds and how fast it refills.
///
/// Every `refill_interval_ms` milliseconds, `refill_rate` tokens are added,
/// up to `capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Maximum tokens a bucket can hold
    pub capacity: u32,
    /// Tokens added per interval
    pub refill_rate: u32,
    /// Milliseconds between refill ticks
    pub refill_interval_ms: u64,
}

impl RateLimitPolicy {
    /// A policy with the given parameters. Call [`validate`](Self::validate)
    /// on anything that comes from configuration.
    pub const fn new(capacity: u32, refill_rate: u32, refill_interval_ms: u64) -> Self {
        Self {
            capacity,
            refill_rate,
            refill_interval_ms,
        }
    }

    /// Sign-in, sign-up and password reset: 5 per bucket, one back per minute.
    pub const fn auth() -> Self {
        Self::new(5, 1, 60_000)
    }

    /// General API writes: 100 per bucket, ten back per minute.
    pub const fn api() -> Self {
        Self::new(100, 10, 60_000)
    }

    /// Read-heavy dashboard endpoints: 200 per bucket, twenty back per minute.
    pub const fn read() -> Self {
        Self::new(200, 20, 60_000)
    }

    /// Exports and user administration: 3 per bucket, one back every five minutes.
    pub const fn sensitive() -> Self {
        Self::new(3, 1, 300_000)
    }

    /// The refill interval as a `Duration`.
    pub fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_ms)
    }

    /// Reject policies that can never admit a request or never refill.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(LimiterError::InvalidPolicy(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if self.refill_interval_ms == 0 {
            return Err(LimiterError::InvalidPolicy(
                "refill interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// The named policy a caller selects for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyClass {
    /// Authentication endpoints
    Auth,
    /// General API endpoints
    Api,
    /// Read-only endpoints
    Read,
    /// Exports and other expensive or privileged endpoints
    Sensitive,
}

impl PolicyClass {
    /// All classes, in declaration order.
    pub const ALL: [PolicyClass; 4] = [
        PolicyClass::Auth,
        PolicyClass::Api,
        PolicyClass::Read,
        PolicyClass::Sensitive,
    ];

    /// Lowercase name, as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyClass::Auth => "auth",
            PolicyClass::Api => "api",
            PolicyClass::Read => "read",
            PolicyClass::Sensitive => "sensitive",
        }
    }

    /// The built-in policy for this class.
    pub fn default_policy(&self) -> RateLimitPolicy {
        match self {
            PolicyClass::Auth => RateLimitPolicy::auth(),
            PolicyClass::Api => RateLimitPolicy::api(),
            PolicyClass::Read => RateLimitPolicy::read(),
            PolicyClass::Sensitive => RateLimitPolicy::sensitive(),
        }
    }
}

impl fmt::Display for PolicyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyClass {
    type Err = LimiterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auth" => Ok(PolicyClass::Auth),
            "api" => Ok(PolicyClass::Api),
            "read" => Ok(PolicyClass::Read),
            "sensitive" => Ok(PolicyClass::Sensitive),
            other => Err(LimiterError::UnknownPolicyClass(other.to_string())),
        }
    }
}
