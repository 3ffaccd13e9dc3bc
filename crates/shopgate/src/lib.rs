#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # shopgate
//!
//! Admission control and transient-failure recovery for the shop's
//! order-management backend.
//!
//! - **Rate limiting**: [`Guard`] checks requests against per-class token
//!   buckets and produces the 429 metadata ([`rate_limit_headers`],
//!   [`throttled_body`])
//! - **Cleanup**: [`CleanupTask`] evicts idle buckets on a schedule
//! - **Retry**: [`RetryOptions`] wraps flaky calls to the database and
//!   auth service with exponential backoff
//! - **Configuration**: [`GuardConfig`] from defaults, TOML or `SHOPGATE_*`
//!   environment variables
//!
//! # Quick Start
//!
//! ```rust
//! use shopgate::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> shopgate::Result<()> {
//! let config = GuardConfig::from_toml_str("max_idle_secs = 600")?;
//! let guard = Guard::from_config(&config)?;
//! let cleanup = CleanupTask::spawn(
//!     guard.limiters().clone(),
//!     config.cleanup_interval(),
//!     CancellationToken::new(),
//! );
//!
//! let decision = guard.check_key(PolicyClass::Sensitive, "tenant-42");
//! assert!(decision.allowed);
//!
//! let retry = config.retry_options();
//! let order_count = retry
//!     .retry(|| async { Ok::<_, Failure>(42) })
//!     .await
//!     .unwrap();
//! assert_eq!(order_count, 42);
//!
//! cleanup.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod lifecycle;
#[cfg(feature = "trace")]
pub mod observability;

pub use config::{GuardConfig, RetryConfig};
pub use error::{Error, Result};
pub use guard::{Guard, THROTTLED_STATUS, rate_limit_headers, throttled_body};
pub use lifecycle::CleanupTask;

pub use shopgate_core::{
    Classify, DefaultClassifier, ExponentialBackoff, Failure, FailureKind, QueryResult,
    RetryClassifier, RetryError, RetryObserver, RetryOptions, TransientDatabaseClassifier, retry,
    retry_with_handler,
};
pub use shopgate_limiter::{
    Clock, ManualClock, PolicyClass, RateLimitDecision, RateLimitPolicy, RateLimiter,
    RateLimiters, SystemClock, client_key, email_key,
};

/// Convenient re-exports of commonly used items.
pub mod prelude {
    pub use crate::config::GuardConfig;
    pub use crate::error::{Error, Result};
    pub use crate::guard::{Guard, rate_limit_headers, throttled_body};
    pub use crate::lifecycle::CleanupTask;
    pub use shopgate_core::prelude::*;
    pub use shopgate_limiter::{PolicyClass, RateLimitDecision, RateLimitPolicy, client_key, email_key};
}
