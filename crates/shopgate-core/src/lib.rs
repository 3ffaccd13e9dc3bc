#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Retry engine for the shopgate admission layer.
//!
//! Calls out to the hosted database and auth service fail transiently:
//! network blips, gateway 5xx responses, upstream throttling. This crate
//! wraps such calls so they are retried with exponential backoff before the
//! failure reaches the request handler.
//!
//! - **Failure taxonomy** via [`Failure`] and the [`Classify`] trait
//!   - One adapter at the I/O boundary turns loose error fields into a closed enum
//!   - Classifiers pattern-match on [`FailureKind`] instead of sniffing strings
//! - **Backoff** via [`BackoffStrategy`] and [`ExponentialBackoff`]
//! - **Retry execution** via [`RetryOptions`]
//!   - `retry`, `retry_with_handler`, `retry_query`, `retry_cancellable`
//!
//! # Examples
//!
//! ```rust
//! use shopgate_core::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Failure> {
//! let options = RetryOptions::builder()
//!     .max_retries(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .build();
//!
//! let orders = options
//!     .retry(|| async { Ok::<_, Failure>(vec!["order-1"]) })
//!     .await?;
//! # assert_eq!(orders.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod failure;
pub mod retry;

pub use failure::{Classify, Failure, FailureKind};
pub use retry::{
    BackoffStrategy, DefaultClassifier, ExponentialBackoff, ExponentialBackoffBuilder,
    QueryResult, RetryClassifier, RetryError, RetryObserver, RetryOptions, RetryOptionsBuilder,
    TransientDatabaseClassifier, retry, retry_with_handler,
};

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use shopgate_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::failure::{Classify, Failure, FailureKind};
    pub use crate::retry::{
        BackoffStrategy, DefaultClassifier, ExponentialBackoff, QueryResult, RetryClassifier,
        RetryError, RetryOptions, TransientDatabaseClassifier,
    };
}
