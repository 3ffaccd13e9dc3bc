//! The retry loop.

use super::classifier::{DefaultClassifier, RetryClassifier};
use super::exponential::{ExponentialBackoff, ExponentialBackoffBuilder};
use super::strategy::BackoffStrategy;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Observer notified before each backoff wait.
///
/// Purely a side channel for logging and metrics; it has no effect on
/// control flow. For the common `(error, attempt)` shape pass a closure to
/// [`RetryOptions::retry_with_handler`] instead.
pub trait RetryObserver<E> {
    /// Called with the failure, the 1-based number of the retry about to be
    /// attempted, and the delay that precedes it.
    fn on_retry(&mut self, error: &E, attempt: u32, delay: Duration);
}

struct Handler<H>(H);

impl<E, H> RetryObserver<E> for Handler<H>
where
    H: FnMut(&E, u32),
{
    fn on_retry(&mut self, error: &E, attempt: u32, _delay: Duration) {
        (self.0)(error, attempt)
    }
}

struct Silent;

impl<E> RetryObserver<E> for Silent {
    fn on_retry(&mut self, _error: &E, _attempt: u32, _delay: Duration) {}
}

/// Outcome of a cancellable retry sequence.
#[derive(Debug, Error, PartialEq)]
pub enum RetryError<E> {
    /// The last attempt failed with a fatal error, or the retry budget ran out.
    #[error("{0}")]
    Failed(E),

    /// The sequence was cancelled while waiting to retry.
    #[error("Retry cancelled after {attempts} attempt(s): {last_error}")]
    Cancelled {
        /// Attempts made before cancellation
        attempts: u32,
        /// Failure of the most recent attempt
        last_error: E,
    },
}

impl<E> RetryError<E> {
    /// The underlying failure, whichever way the sequence ended.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Failed(err) => err,
            RetryError::Cancelled { last_error, .. } => last_error,
        }
    }

    /// Whether the sequence was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }
}

/// A `{data, error}` result pair, as returned by the hosted database client.
///
/// A present `error` means the call failed, whatever `data` holds.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T, E> {
    /// Payload of a successful call
    pub data: Option<T>,
    /// Failure of an unsuccessful call
    pub error: Option<E>,
}

impl<T, E> QueryResult<T, E> {
    /// A successful result carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    /// A failed result carrying `error`.
    pub fn err(error: E) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }

    /// Convert to a `Result`, treating a present `error` as failure.
    pub fn into_result(self) -> Result<Option<T>, E> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

impl<T, E> From<Result<Option<T>, E>> for QueryResult<T, E> {
    fn from(result: Result<Option<T>, E>) -> Self {
        match result {
            Ok(data) => Self { data, error: None },
            Err(error) => Self::err(error),
        }
    }
}

/// Retry configuration: a backoff strategy plus a failure classifier.
///
/// Each call to one of the `retry*` methods runs its own sequential state
/// machine; concurrent calls never share a retry budget.
///
/// # Examples
///
/// ```rust
/// use shopgate_core::prelude::*;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Failure> {
/// let options = RetryOptions::builder()
///     .max_retries(3)
///     .initial_delay(Duration::from_millis(10))
///     .build();
///
/// let calls = Arc::new(AtomicU32::new(0));
/// let value = options
///     .retry(|| {
///         let calls = Arc::clone(&calls);
///         async move {
///             if calls.fetch_add(1, Ordering::SeqCst) < 2 {
///                 Err(Failure::HttpStatus { status: 503, message: "unavailable".into() })
///             } else {
///                 Ok("invoice")
///             }
///         }
///     })
///     .await?;
///
/// assert_eq!(value, "invoice");
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryOptions<C = DefaultClassifier, B = ExponentialBackoff> {
    backoff: B,
    classifier: C,
}

impl Default for RetryOptions {
    /// `max_retries=3`, `initial_delay=1s`, `max_delay=30s`, `multiplier=2`,
    /// classified by [`DefaultClassifier`].
    fn default() -> Self {
        Self {
            backoff: ExponentialBackoff::default(),
            classifier: DefaultClassifier,
        }
    }
}

impl RetryOptions {
    /// Create a builder for exponential-backoff options with the default classifier.
    pub fn builder() -> RetryOptionsBuilder {
        RetryOptionsBuilder::default()
    }
}

impl<C, B> RetryOptions<C, B> {
    /// Combine a backoff strategy and a classifier.
    pub fn new(backoff: B, classifier: C) -> Self {
        Self {
            backoff,
            classifier,
        }
    }

    /// Replace the classifier.
    pub fn with_classifier<C2>(self, classifier: C2) -> RetryOptions<C2, B> {
        RetryOptions {
            backoff: self.backoff,
            classifier,
        }
    }

    /// Replace the backoff strategy.
    pub fn with_backoff<B2>(self, backoff: B2) -> RetryOptions<C, B2> {
        RetryOptions {
            backoff,
            classifier: self.classifier,
        }
    }

    /// The backoff strategy.
    pub fn backoff(&self) -> &B {
        &self.backoff
    }

    /// The classifier.
    pub fn classifier(&self) -> &C {
        &self.classifier
    }
}

impl<C, B: BackoffStrategy> RetryOptions<C, B> {
    /// Run `operation` until it succeeds, fails fatally, or the budget is spent.
    ///
    /// On exhaustion the last failure is returned unchanged.
    pub async fn retry<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        C: RetryClassifier<E>,
    {
        self.run(operation, &mut Silent, None)
            .await
            .map_err(RetryError::into_inner)
    }

    /// Like [`retry`](Self::retry), calling `on_retry(&error, attempt)` before
    /// each wait. `attempt` is the 1-based number of the upcoming retry.
    pub async fn retry_with_handler<F, Fut, T, E, H>(
        &self,
        operation: F,
        on_retry: H,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        C: RetryClassifier<E>,
        H: FnMut(&E, u32),
    {
        self.run(operation, &mut Handler(on_retry), None)
            .await
            .map_err(RetryError::into_inner)
    }

    /// Like [`retry`](Self::retry), reporting to a [`RetryObserver`].
    pub async fn retry_observed<F, Fut, T, E, O>(
        &self,
        operation: F,
        observer: &mut O,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        C: RetryClassifier<E>,
        O: RetryObserver<E>,
    {
        self.run(operation, observer, None)
            .await
            .map_err(RetryError::into_inner)
    }

    /// Retry an operation that reports failure through a [`QueryResult`].
    ///
    /// A present `error` counts as a failed attempt. After exhaustion (or a
    /// fatal failure) the result is `{data: None, error: Some(last_error)}`;
    /// this never panics or propagates.
    pub async fn retry_query<F, Fut, T, E>(&self, mut operation: F) -> QueryResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = QueryResult<T, E>>,
        E: Display,
        C: RetryClassifier<E>,
    {
        let outcome = self
            .run(
                || {
                    let attempt = operation();
                    async move { attempt.await.into_result() }
                },
                &mut Silent,
                None,
            )
            .await;

        match outcome {
            Ok(data) => QueryResult { data, error: None },
            Err(err) => QueryResult::err(err.into_inner()),
        }
    }

    /// Like [`retry`](Self::retry), aborting a pending backoff wait as soon
    /// as `token` is cancelled.
    ///
    /// Cancellation is observed only between attempts; an attempt already in
    /// flight runs to completion first.
    pub async fn retry_cancellable<F, Fut, T, E>(
        &self,
        operation: F,
        token: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        C: RetryClassifier<E>,
    {
        self.run(operation, &mut Silent, Some(token)).await
    }

    async fn run<F, Fut, T, E, O>(
        &self,
        mut operation: F,
        observer: &mut O,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        C: RetryClassifier<E>,
        O: RetryObserver<E> + ?Sized,
    {
        let mut attempt = 0;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !self.classifier.is_retryable(&err, attempt) {
                debug!(attempt, error = %err, "Non-retryable failure");
                return Err(RetryError::Failed(err));
            }

            if attempt >= self.backoff.max_retries() {
                warn!(attempts = attempt + 1, error = %err, "Retry budget exhausted");
                return Err(RetryError::Failed(err));
            }

            let Some(delay) = self.backoff.next_delay(attempt) else {
                warn!(attempts = attempt + 1, error = %err, "Backoff strategy gave up");
                return Err(RetryError::Failed(err));
            };

            observer.on_retry(&err, attempt + 1, delay);
            debug!(
                retry = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying after transient failure"
            );

            match cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            debug!(attempts = attempt + 1, "Retry cancelled during backoff");
                            return Err(RetryError::Cancelled {
                                attempts: attempt + 1,
                                last_error: err,
                            });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }

            attempt += 1;
        }
    }
}

/// Builder for [`RetryOptions`] with exponential backoff.
///
/// # Examples
///
/// ```rust
/// use shopgate_core::retry::{BackoffStrategy, RetryOptions};
/// use std::time::Duration;
///
/// let options = RetryOptions::builder()
///     .max_retries(2)
///     .initial_delay(Duration::from_millis(100))
///     .multiplier(2.0)
///     .build();
///
/// assert_eq!(options.backoff().max_retries(), 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct RetryOptionsBuilder {
    backoff: ExponentialBackoffBuilder,
}

impl RetryOptionsBuilder {
    /// Set the maximum number of retries (not counting the initial attempt).
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.backoff = self.backoff.max_retries(max_retries);
        self
    }

    /// Set the delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.backoff = self.backoff.initial_delay(delay);
        self
    }

    /// Set the cap on any single delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.backoff = self.backoff.max_delay(delay);
        self
    }

    /// Set the backoff multiplier.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.backoff = self.backoff.multiplier(multiplier);
        self
    }

    /// Set the jitter factor (0.0 to 1.0).
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.backoff = self.backoff.jitter(jitter);
        self
    }

    /// Build options using the [`DefaultClassifier`].
    pub fn build(self) -> RetryOptions {
        RetryOptions::new(self.backoff.build(), DefaultClassifier)
    }
}

/// Run `operation` under `options`. See [`RetryOptions::retry`].
pub async fn retry<F, Fut, T, E, C, B>(operation: F, options: &RetryOptions<C, B>) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    C: RetryClassifier<E>,
    B: BackoffStrategy,
{
    options.retry(operation).await
}

/// Run `operation` under `options`, notifying `on_retry` before each wait.
/// See [`RetryOptions::retry_with_handler`].
pub async fn retry_with_handler<F, Fut, T, E, C, B, H>(
    operation: F,
    on_retry: H,
    options: &RetryOptions<C, B>,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    C: RetryClassifier<E>,
    B: BackoffStrategy,
    H: FnMut(&E, u32),
{
    options.retry_with_handler(operation, on_retry).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Failure;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> Failure {
        Failure::HttpStatus {
            status: 503,
            message: "Service unavailable".to_string(),
        }
    }

    fn fast(max_retries: u32) -> RetryOptions {
        RetryOptions::builder()
            .max_retries(max_retries)
            .initial_delay(Duration::from_millis(1))
            .build()
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let result = RetryOptions::default()
            .retry(|| async { Ok::<_, Failure>(42) })
            .await;

        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_retry_success_on_third_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result = fast(5)
            .retry(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(Failure::Network("connection reset".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_max_retries_exceeded_returns_last_error() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result = fast(3)
            .retry(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Failure::HttpStatus {
                        status: 500,
                        message: format!("failure {n}"),
                    })
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(
            result,
            Err(Failure::HttpStatus {
                status: 500,
                message: "failure 3".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_non_retryable_short_circuits() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result = fast(10)
            .retry(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Failure::HttpStatus {
                        status: 400,
                        message: "Bad request".to_string(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_attempts_once() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result = fast(0)
            .retry(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(unavailable())
                }
            })
            .await;

        assert_eq!(result, Err(unavailable()));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_closure_classifier() {
        let attempts = Arc::new(AtomicU32::new(0));
        let options = fast(5).with_classifier(|err: &Failure| err.status() == Some(409));

        // 503 is transient by default but not for this classifier
        let result = options
            .retry(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(unavailable())
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_receives_each_retry() {
        let mut seen = Vec::new();

        let result = fast(2)
            .retry_with_handler(
                || async { Err::<(), _>(unavailable()) },
                |err: &Failure, attempt| seen.push((err.status(), attempt)),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(seen, vec![(Some(503), 1), (Some(503), 2)]);
    }

    #[tokio::test]
    async fn test_observer_sees_delays() {
        struct Delays(Vec<Duration>);

        impl RetryObserver<Failure> for Delays {
            fn on_retry(&mut self, _error: &Failure, _attempt: u32, delay: Duration) {
                self.0.push(delay);
            }
        }

        let options = RetryOptions::builder()
            .max_retries(3)
            .initial_delay(Duration::from_millis(2))
            .build();
        let mut delays = Delays(Vec::new());

        let _ = options
            .retry_observed(|| async { Err::<(), _>(unavailable()) }, &mut delays)
            .await;

        assert_eq!(
            delays.0,
            vec![
                Duration::from_millis(2),
                Duration::from_millis(4),
                Duration::from_millis(8)
            ]
        );
    }

    #[tokio::test]
    async fn test_query_result_success_after_errors() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result = fast(3)
            .retry_query(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        QueryResult::err(Failure::Timeout("statement timeout".to_string()))
                    } else {
                        QueryResult::ok(vec!["order-7"])
                    }
                }
            })
            .await;

        assert_eq!(result, QueryResult::ok(vec!["order-7"]));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_query_result_exhaustion_is_normalized() {
        let result: QueryResult<u32, Failure> = fast(1)
            .retry_query(|| async { QueryResult::err(unavailable()) })
            .await;

        assert_eq!(result.data, None);
        assert_eq!(result.error, Some(unavailable()));
    }

    #[tokio::test]
    async fn test_query_result_without_data_is_success() {
        let result: QueryResult<u32, Failure> = fast(1)
            .retry_query(|| async {
                QueryResult {
                    data: None,
                    error: None,
                }
            })
            .await;

        assert_eq!(result.into_result(), Ok(None));
    }

    #[tokio::test]
    async fn test_free_functions() {
        let options = fast(1);
        let value = retry(|| async { Ok::<_, Failure>("ok") }, &options).await;
        assert_eq!(value, Ok("ok"));

        let mut calls = 0;
        let value = retry_with_handler(
            || async { Err::<(), _>(Failure::Network("down".into())) },
            |_err: &Failure, _attempt| calls += 1,
            &options,
        )
        .await;
        assert!(value.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_retry_error_into_inner() {
        let failed: RetryError<&str> = RetryError::Failed("boom");
        assert!(!failed.is_cancelled());
        assert_eq!(failed.into_inner(), "boom");

        let cancelled = RetryError::Cancelled {
            attempts: 2,
            last_error: "boom",
        };
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.to_string(), "Retry cancelled after 2 attempt(s): boom");
        assert_eq!(cancelled.into_inner(), "boom");
    }
}
