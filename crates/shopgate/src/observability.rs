//! Tracing setup for binaries embedding shopgate
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! application's call. [`init_tracing`] is the stock setup: a fmt
//! subscriber filtered by `RUST_LOG`, defaulting to `info`.

use crate::error::{Error, Result};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install the global fmt subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing() -> Result<()> {
    init_tracing_with_default(DEFAULT_FILTER)
}

/// Like [`init_tracing`], with `default_filter` used when `RUST_LOG` is
/// unset or invalid (e.g. `"shopgate=debug,info"`).
pub fn init_tracing_with_default(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| Error::TracingInit(err.to_string()))
}
