//! Limiter error types

use thiserror::Error;

/// Result type for limiter configuration operations
pub type Result<T> = std::result::Result<T, LimiterError>;

/// Errors raised while building limiters.
///
/// Admission decisions themselves never fail; a denial is a `false`, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimiterError {
    /// A policy that cannot admit anything or cannot refill.
    #[error("Invalid rate limit policy: {0}")]
    InvalidPolicy(String),

    /// A policy class name that is not one of auth, api, read, sensitive.
    #[error("Unknown policy class: {0}")]
    UnknownPolicyClass(String),
}
