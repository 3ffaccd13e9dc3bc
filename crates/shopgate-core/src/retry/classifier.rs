//! Retryability classification.

use crate::failure::{Classify, FailureKind};
use std::collections::HashSet;

/// Decides whether a failed attempt should be retried.
///
/// Returning `false` is a *fatal* classification: the error is returned to
/// the caller immediately without consuming the retry budget.
///
/// Any `Fn(&E) -> bool` closure is a classifier:
///
/// ```rust
/// use shopgate_core::retry::RetryClassifier;
/// use shopgate_core::Failure;
///
/// let only_timeouts = |err: &Failure| matches!(err, Failure::Timeout(_));
/// assert!(only_timeouts.is_retryable(&Failure::Timeout("slow".into()), 0));
/// assert!(!only_timeouts.is_retryable(&Failure::Network("down".into()), 0));
/// ```
pub trait RetryClassifier<E>: Send + Sync {
    /// Whether `error`, raised by attempt number `attempt` (0-indexed), is transient.
    fn is_retryable(&self, error: &E, attempt: u32) -> bool;
}

impl<E, F> RetryClassifier<E> for F
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn is_retryable(&self, error: &E, _attempt: u32) -> bool {
        self(error)
    }
}

/// The default classifier.
///
/// Retryable: network failures, timeouts, HTTP 5xx and HTTP 429.
/// Everything else propagates on first occurrence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultClassifier;

impl DefaultClassifier {
    /// Classify a [`FailureKind`] by the default rules.
    pub fn is_transient(kind: FailureKind<'_>) -> bool {
        matches!(kind, FailureKind::Network | FailureKind::Timeout) || kind.is_transient_status()
    }
}

impl<E: Classify> RetryClassifier<E> for DefaultClassifier {
    fn is_retryable(&self, error: &E, _attempt: u32) -> bool {
        Self::is_transient(error.failure_kind())
    }
}

/// SQLSTATE codes that indicate the database is temporarily unavailable or
/// the transaction lost a race and can be replayed.
const TRANSIENT_SQLSTATES: &[&str] = &[
    "08000", // connection_exception
    "08001", // sqlclient_unable_to_establish_sqlconnection
    "08003", // connection_does_not_exist
    "08006", // connection_failure
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "53300", // too_many_connections
    "57P01", // admin_shutdown
    "57P03", // cannot_connect_now
];

/// Default rules plus database error codes that signal transient unavailability.
///
/// # Examples
///
/// ```rust
/// use shopgate_core::retry::{RetryClassifier, TransientDatabaseClassifier};
/// use shopgate_core::Failure;
///
/// let classifier = TransientDatabaseClassifier::default().with_code("PGRST301");
///
/// let deadlock = Failure::Database { code: "40P01".into(), message: "deadlock".into() };
/// assert!(classifier.is_retryable(&deadlock, 0));
///
/// let unique = Failure::Database { code: "23505".into(), message: "duplicate".into() };
/// assert!(!classifier.is_retryable(&unique, 0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientDatabaseClassifier {
    codes: HashSet<String>,
}

impl Default for TransientDatabaseClassifier {
    fn default() -> Self {
        Self {
            codes: TRANSIENT_SQLSTATES.iter().map(|code| code.to_string()).collect(),
        }
    }
}

impl TransientDatabaseClassifier {
    /// A classifier that retries only the given database codes (plus the default rules).
    pub fn with_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Also treat `code` as transient.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.codes.insert(code.into());
        self
    }

    /// Whether `code` is in the transient set.
    pub fn is_transient_code(&self, code: &str) -> bool {
        self.codes.contains(code)
    }
}

impl<E: Classify> RetryClassifier<E> for TransientDatabaseClassifier {
    fn is_retryable(&self, error: &E, _attempt: u32) -> bool {
        match error.failure_kind() {
            FailureKind::Database(code) => self.is_transient_code(code),
            kind => DefaultClassifier::is_transient(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Failure;
    use rstest::rstest;

    fn http(status: u16) -> Failure {
        Failure::HttpStatus {
            status,
            message: String::new(),
        }
    }

    #[rstest]
    #[case(Failure::Network("connection reset".into()), true)]
    #[case(Failure::Timeout("deadline".into()), true)]
    #[case(http(500), true)]
    #[case(http(503), true)]
    #[case(http(599), true)]
    #[case(http(429), true)]
    #[case(http(400), false)]
    #[case(http(401), false)]
    #[case(http(404), false)]
    #[case(Failure::Database { code: "57P03".into(), message: String::new() }, false)]
    #[case(Failure::Other("validation".into()), false)]
    fn test_default_classifier(#[case] failure: Failure, #[case] expected: bool) {
        assert_eq!(DefaultClassifier.is_retryable(&failure, 0), expected);
    }

    #[test]
    fn test_database_classifier_extends_defaults() {
        let classifier = TransientDatabaseClassifier::default();

        assert!(classifier.is_retryable(&http(502), 0));
        assert!(classifier.is_retryable(&Failure::Network("down".into()), 0));
        assert!(classifier.is_retryable(
            &Failure::Database {
                code: "57P01".into(),
                message: "terminating connection".into()
            },
            0
        ));
        assert!(!classifier.is_retryable(
            &Failure::Database {
                code: "42P01".into(),
                message: "relation does not exist".into()
            },
            0
        ));
        assert!(!classifier.is_retryable(&http(403), 0));
    }

    #[test]
    fn test_database_code_behind_client_status_is_classified() {
        let classifier = TransientDatabaseClassifier::default();

        let deadlock = Failure::from_parts(Some("deadlock detected"), Some(409), Some("40P01"), None);
        assert!(classifier.is_retryable(&deadlock, 0));
        assert!(!DefaultClassifier.is_retryable(&deadlock, 0));

        let unique = Failure::from_parts(Some("duplicate key"), Some(409), Some("23505"), None);
        assert!(!classifier.is_retryable(&unique, 0));
    }

    #[test]
    fn test_database_classifier_custom_codes() {
        let classifier = TransientDatabaseClassifier::with_codes(["PGRST301"]);

        assert!(classifier.is_transient_code("PGRST301"));
        assert!(!classifier.is_transient_code("40001"));
    }

    #[test]
    fn test_closure_classifier() {
        let classifier = |err: &Failure| err.status() == Some(409);

        assert!(classifier.is_retryable(&http(409), 3));
        assert!(!classifier.is_retryable(&http(503), 0));
    }
}
