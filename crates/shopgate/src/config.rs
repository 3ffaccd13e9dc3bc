//! Configuration for the admission layer
//!
//! [`GuardConfig`] holds the per-class policies, the cleanup schedule and
//! the retry defaults. It can be built from defaults, a TOML document, a
//! file, or `SHOPGATE_*` environment variables layered on top of any of
//! those.
//!
//! ```toml
//! cleanup_interval_secs = 300
//! max_idle_secs = 3600
//!
//! [auth]
//! capacity = 10
//! refill_rate = 1
//! refill_interval_ms = 60000
//!
//! [retry]
//! max_retries = 5
//! initial_delay_ms = 200
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use shopgate_core::RetryOptions;
use shopgate_limiter::{Clock, PolicyClass, RateLimitPolicy, RateLimiters, SystemClock};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "SHOPGATE";

/// Retry defaults for calls wrapped by the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay_ms: u64,
    /// Cap on any single delay
    pub max_delay_ms: u64,
    /// Growth factor between delays
    pub multiplier: f64,
    /// Random variation of each delay, 0.0 to 1.0
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter: 0.0,
        }
    }
}

impl RetryConfig {
    /// Build [`RetryOptions`] with the default classifier.
    pub fn to_options(&self) -> RetryOptions {
        RetryOptions::builder()
            .max_retries(self.max_retries)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .multiplier(self.multiplier)
            .jitter(self.jitter)
            .build()
    }

    fn validate(&self) -> Result<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(Error::InvalidConfig {
                field: "retry.multiplier",
                reason: format!("must be a finite number >= 1.0, got {}", self.multiplier),
            });
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(Error::InvalidConfig {
                field: "retry.jitter",
                reason: format!("must be between 0.0 and 1.0, got {}", self.jitter),
            });
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(Error::InvalidConfig {
                field: "retry.initial_delay_ms",
                reason: format!(
                    "{} exceeds max_delay_ms {}",
                    self.initial_delay_ms, self.max_delay_ms
                ),
            });
        }
        Ok(())
    }
}

/// Configuration for the admission layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardConfig {
    /// Seconds between cleanup sweeps
    pub cleanup_interval_secs: u64,
    /// Seconds a bucket may sit untouched before it is evicted
    pub max_idle_secs: u64,
    /// Policy for authentication endpoints
    pub auth: RateLimitPolicy,
    /// Policy for general API endpoints
    pub api: RateLimitPolicy,
    /// Policy for read-heavy endpoints
    pub read: RateLimitPolicy,
    /// Policy for exports and administration
    pub sensitive: RateLimitPolicy,
    /// Retry defaults
    pub retry: RetryConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: 300,
            max_idle_secs: 3_600,
            auth: RateLimitPolicy::auth(),
            api: RateLimitPolicy::api(),
            read: RateLimitPolicy::read(),
            sensitive: RateLimitPolicy::sensitive(),
            retry: RetryConfig::default(),
        }
    }
}

impl GuardConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Defaults with `SHOPGATE_*` environment overrides applied.
    ///
    /// This will look for:
    /// - `SHOPGATE_CLEANUP_INTERVAL_SECS`, `SHOPGATE_MAX_IDLE_SECS`
    /// - `SHOPGATE_RETRY_MAX_RETRIES`, `SHOPGATE_RETRY_INITIAL_DELAY_MS`,
    ///   `SHOPGATE_RETRY_MAX_DELAY_MS`
    /// - `SHOPGATE_<CLASS>_CAPACITY`, `SHOPGATE_<CLASS>_REFILL_RATE`,
    ///   `SHOPGATE_<CLASS>_REFILL_INTERVAL_MS` for `AUTH`, `API`, `READ`
    ///   and `SENSITIVE`
    ///
    /// A variable that is set but does not parse is an error.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `SHOPGATE_*` overrides on top of this configuration, then validate.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(secs) = env_override::<u64>("CLEANUP_INTERVAL_SECS")? {
            self.cleanup_interval_secs = secs;
        }
        if let Some(secs) = env_override::<u64>("MAX_IDLE_SECS")? {
            self.max_idle_secs = secs;
        }

        if let Some(retries) = env_override::<u32>("RETRY_MAX_RETRIES")? {
            self.retry.max_retries = retries;
        }
        if let Some(ms) = env_override::<u64>("RETRY_INITIAL_DELAY_MS")? {
            self.retry.initial_delay_ms = ms;
        }
        if let Some(ms) = env_override::<u64>("RETRY_MAX_DELAY_MS")? {
            self.retry.max_delay_ms = ms;
        }

        for class in PolicyClass::ALL {
            let name = class.as_str().to_ascii_uppercase();
            let policy = self.policy_mut(class);

            if let Some(capacity) = env_override::<u32>(&format!("{name}_CAPACITY"))? {
                policy.capacity = capacity;
            }
            if let Some(rate) = env_override::<u32>(&format!("{name}_REFILL_RATE"))? {
                policy.refill_rate = rate;
            }
            if let Some(ms) = env_override::<u64>(&format!("{name}_REFILL_INTERVAL_MS"))? {
                policy.refill_interval_ms = ms;
            }
        }

        self.validate()?;
        Ok(self)
    }

    /// Check every policy and the schedule.
    pub fn validate(&self) -> Result<()> {
        for class in PolicyClass::ALL {
            self.policy(class).validate()?;
        }
        if self.cleanup_interval_secs == 0 {
            return Err(Error::InvalidConfig {
                field: "cleanup_interval_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.retry.validate()
    }

    /// The configured policy for `class`.
    pub fn policy(&self, class: PolicyClass) -> RateLimitPolicy {
        match class {
            PolicyClass::Auth => self.auth,
            PolicyClass::Api => self.api,
            PolicyClass::Read => self.read,
            PolicyClass::Sensitive => self.sensitive,
        }
    }

    fn policy_mut(&mut self, class: PolicyClass) -> &mut RateLimitPolicy {
        match class {
            PolicyClass::Auth => &mut self.auth,
            PolicyClass::Api => &mut self.api,
            PolicyClass::Read => &mut self.read,
            PolicyClass::Sensitive => &mut self.sensitive,
        }
    }

    /// Time between cleanup sweeps.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Idle threshold for bucket eviction.
    pub fn max_idle(&self) -> Duration {
        Duration::from_secs(self.max_idle_secs)
    }

    /// Limiters for every class on the wall clock.
    pub fn build_limiters(&self) -> Result<RateLimiters> {
        self.build_limiters_with_clock(SystemClock)
    }

    /// Limiters for every class sharing `clock`.
    pub fn build_limiters_with_clock<C: Clock + Clone>(&self, clock: C) -> Result<RateLimiters<C>> {
        Ok(RateLimiters::from_policies(clock, self.max_idle(), |class| {
            self.policy(class)
        })?)
    }

    /// Retry options from the `retry` section.
    pub fn retry_options(&self) -> RetryOptions {
        self.retry.to_options()
    }
}

fn env_override<T: FromStr>(suffix: &str) -> Result<Option<T>> {
    let var = format!("{ENV_PREFIX}_{suffix}");
    match env::var(&var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidEnv { var, value: raw }),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(raw)) => Err(Error::InvalidEnv {
            var,
            value: raw.to_string_lossy().into_owned(),
        }),
    }
}
