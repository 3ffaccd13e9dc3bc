//! Retry engine with exponential backoff and pluggable failure classification.
//!
//! # Key Types
//!
//! - [`BackoffStrategy`] - How long to wait before each retry, and how many retries
//! - [`ExponentialBackoff`] - `min(initial * multiplier^attempt, max_delay)`
//! - [`RetryClassifier`] - Decides whether a failure is transient
//! - [`RetryOptions`] - Backoff plus classifier; runs the retry loop
//!
//! # Examples
//!
//! ```rust
//! use shopgate_core::retry::RetryOptions;
//! use shopgate_core::Failure;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Failure> {
//! let options = RetryOptions::builder()
//!     .max_retries(2)
//!     .initial_delay(Duration::from_millis(100))
//!     .build();
//!
//! let total = options
//!     .retry(|| async { Ok::<_, Failure>(42) })
//!     .await?;
//! # assert_eq!(total, 42);
//! # Ok(())
//! # }
//! ```

mod classifier;
mod executor;
mod exponential;
mod strategy;

pub use classifier::{DefaultClassifier, RetryClassifier, TransientDatabaseClassifier};
pub use executor::{
    QueryResult, RetryError, RetryObserver, RetryOptions, RetryOptionsBuilder, retry,
    retry_with_handler,
};
pub use exponential::{ExponentialBackoff, ExponentialBackoffBuilder};
pub use strategy::BackoffStrategy;
