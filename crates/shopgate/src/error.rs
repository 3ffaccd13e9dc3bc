//! Error types for the shopgate facade
//!
//! Throttling is not an error here: a denied request is an ordinary
//! [`RateLimitDecision`](shopgate_limiter::RateLimitDecision). These
//! variants cover startup problems (configuration, tracing setup).

use shopgate_limiter::LimiterError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for facade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the shopgate facade.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    ConfigIo {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has the wrong shape.
    #[error("Invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv {
        /// Variable name
        var: String,
        /// Raw value found in the environment
        value: String,
    },

    /// A configured value is out of range.
    #[error("Invalid config value for {field}: {reason}")]
    InvalidConfig {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// A rate limit policy was rejected.
    #[error(transparent)]
    Limiter(#[from] LimiterError),

    /// A global tracing subscriber was already installed.
    #[error("Failed to initialise tracing: {0}")]
    TracingInit(String),
}

impl Error {
    /// Whether this error came from configuration loading or validation.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::ConfigIo { .. }
                | Error::ConfigParse(_)
                | Error::InvalidEnv { .. }
                | Error::InvalidConfig { .. }
                | Error::Limiter(_)
        )
    }
}
