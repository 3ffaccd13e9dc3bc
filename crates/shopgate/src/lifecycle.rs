//! Supervised background sweep of idle rate limit buckets
//!
//! The limiters never schedule work on their own. The application spawns
//! one [`CleanupTask`] at startup and shuts it down with the server.
//!
//! # Example
//!
//! ```rust
//! use shopgate::{CleanupTask, GuardConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> shopgate::Result<()> {
//! let config = GuardConfig::default();
//! let limiters = Arc::new(config.build_limiters()?);
//!
//! let cleanup = CleanupTask::spawn(limiters, config.cleanup_interval(), CancellationToken::new());
//! // ... serve requests ...
//! cleanup.shutdown().await;
//! # Ok(())
//! # }
//! ```

use shopgate_limiter::{Clock, RateLimiters};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Handle to a running cleanup loop.
///
/// Dropping the handle does not stop the loop; call
/// [`shutdown`](Self::shutdown) or cancel the token passed to
/// [`spawn`](Self::spawn).
#[derive(Debug)]
pub struct CleanupTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl CleanupTask {
    /// Sweep `limiters` every `interval` until `token` is cancelled.
    ///
    /// The first sweep runs one full interval after spawning. Ticks missed
    /// while the runtime was busy are skipped rather than replayed.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero, or if called outside a tokio runtime.
    pub fn spawn<C>(
        limiters: Arc<RateLimiters<C>>,
        interval: Duration,
        token: CancellationToken,
    ) -> Self
    where
        C: Clock + 'static,
    {
        let handle = tokio::spawn(Self::run(limiters, interval, token.clone()));
        info!(interval_secs = interval.as_secs(), "Started rate limit cleanup task");
        Self { token, handle }
    }

    async fn run<C: Clock>(
        limiters: Arc<RateLimiters<C>>,
        interval: Duration,
        token: CancellationToken,
    ) {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = limiters.cleanup();
                    debug!(evicted, tracked = limiters.len(), "Rate limit cleanup sweep");
                }
            }
        }

        info!("Rate limit cleanup task stopped");
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(err) = self.handle.await
            && err.is_panic()
        {
            tracing::error!(error = %err, "Rate limit cleanup task panicked");
        }
    }
}
