#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Per-key token-bucket admission control.
//!
//! A request handler maps the request to a key (see [`client_key`]) and a
//! [`PolicyClass`], then asks the matching [`RateLimiter`] whether the
//! request may proceed. A denial is a plain `false`, never an error; the
//! HTTP layer turns it into a 429 using the reset time.
//!
//! # Architecture
//!
//! - **Clock**: [`Clock`] with [`SystemClock`] and the test-friendly [`ManualClock`]
//! - **Policy**: [`RateLimitPolicy`] plus the named [`PolicyClass`] table
//! - **Limiter**: [`RateLimiter`], a concurrent map of lazily refilled buckets
//! - **Set**: [`RateLimiters`], one limiter per class
//!
//! State is in-memory and per process. Separate instances enforce separate
//! limits, and restarting the process forgets every bucket.
//!
//! # Usage
//!
//! ```rust
//! use shopgate_limiter::{RateLimitPolicy, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitPolicy::auth());
//! if !limiter.is_allowed("email:owner@garage.example") {
//!     let retry_at = limiter.reset_time("email:owner@garage.example");
//!     println!("throttled until {retry_at}");
//! }
//! ```

mod bucket;
pub mod clock;
pub mod decision;
pub mod error;
pub mod key;
pub mod limiter;
pub mod policy;
pub mod set;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::RateLimitDecision;
pub use error::{LimiterError, Result};
pub use key::{client_ip, client_key, email_key};
pub use limiter::{DEFAULT_MAX_IDLE, RateLimiter};
pub use policy::{PolicyClass, RateLimitPolicy};
pub use set::RateLimiters;
