//! Failure taxonomy for wrapped I/O calls.
//!
//! Errors coming back from the hosted database client, `fetch`-style HTTP
//! calls or plain sockets carry loosely-typed fields (a message, maybe an
//! HTTP status, maybe a vendor error code). [`Failure::from_parts`] is the
//! single adapter that inspects those fields; everything downstream works
//! with the closed [`Failure`] enum or its borrowed [`FailureKind`] view.

use std::io;
use thiserror::Error;

/// A failure reported by an I/O call wrapped in the retry engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// Connection could not be established or was dropped mid-flight.
    #[error("Network error: {0}")]
    Network(String),

    /// The call did not complete in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The remote side answered with an HTTP error status.
    #[error("HTTP error (status {status}): {message}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Error message from the response
        message: String,
    },

    /// The database rejected the call with a vendor error code.
    #[error("Database error {code}: {message}")]
    Database {
        /// Vendor error code (e.g. a PostgreSQL SQLSTATE)
        code: String,
        /// Error message from the database
        message: String,
    },

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Borrowed, copyable view of a [`Failure`] used by classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind<'a> {
    /// See [`Failure::Network`].
    Network,
    /// See [`Failure::Timeout`].
    Timeout,
    /// See [`Failure::HttpStatus`].
    HttpStatus(u16),
    /// See [`Failure::Database`].
    Database(&'a str),
    /// Not classified.
    Other,
}

impl FailureKind<'_> {
    /// Whether this is a 5xx status or 429.
    pub fn is_transient_status(&self) -> bool {
        matches!(self, FailureKind::HttpStatus(status) if (500..600).contains(status) || *status == 429)
    }
}

/// Error types that can describe themselves as a [`FailureKind`].
///
/// Implement this for an application error type to use it with the
/// built-in classifiers.
pub trait Classify {
    /// The kind of failure this error represents.
    fn failure_kind(&self) -> FailureKind<'_>;
}

impl Failure {
    /// Build a failure from the loosely-typed fields of a foreign error.
    ///
    /// Precedence: a timeout name or message wins, then a network/fetch
    /// message, then a 5xx or 429 status, then a database code, then any
    /// other status. Message matching is case-insensitive.
    ///
    /// Hosted database clients report a vendor code alongside a 4xx status
    /// (a deadlock as `409` + `40P01`); such errors become
    /// [`Failure::Database`] so code-based classifiers see them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shopgate_core::Failure;
    ///
    /// let failure = Failure::from_parts(Some("Bad gateway"), Some(502), None, None);
    /// assert_eq!(
    ///     failure,
    ///     Failure::HttpStatus { status: 502, message: "Bad gateway".to_string() }
    /// );
    ///
    /// let failure = Failure::from_parts(Some("TypeError: fetch failed"), None, None, None);
    /// assert!(matches!(failure, Failure::Network(_)));
    /// ```
    pub fn from_parts(
        message: Option<&str>,
        status: Option<u16>,
        code: Option<&str>,
        name: Option<&str>,
    ) -> Self {
        let message = message.unwrap_or_default();
        let lowered = message.to_ascii_lowercase();

        let timeout_name = matches!(name, Some("TimeoutError") | Some("AbortError"));
        if timeout_name || lowered.contains("timeout") {
            return Failure::Timeout(message.to_string());
        }

        if lowered.contains("network") || lowered.contains("fetch") {
            return Failure::Network(message.to_string());
        }

        let code = code.filter(|code| !code.is_empty());
        match (status, code) {
            (Some(status), _) if FailureKind::HttpStatus(status).is_transient_status() => {
                Failure::HttpStatus {
                    status,
                    message: message.to_string(),
                }
            }
            (_, Some(code)) => Failure::Database {
                code: code.to_string(),
                message: message.to_string(),
            },
            (Some(status), None) => Failure::HttpStatus {
                status,
                message: message.to_string(),
            },
            (None, None) => Failure::Other(message.to_string()),
        }
    }

    /// HTTP status carried by this failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Failure::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl Classify for Failure {
    fn failure_kind(&self) -> FailureKind<'_> {
        match self {
            Failure::Network(_) => FailureKind::Network,
            Failure::Timeout(_) => FailureKind::Timeout,
            Failure::HttpStatus { status, .. } => FailureKind::HttpStatus(*status),
            Failure::Database { code, .. } => FailureKind::Database(code),
            Failure::Other(_) => FailureKind::Other,
        }
    }
}

impl From<io::Error> for Failure {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => Failure::Timeout(err.to_string()),
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Failure::Network(err.to_string()),
            _ => Failure::Other(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("Request timeout"), None, None, None, FailureKind::Timeout)]
    #[case(Some("aborted"), None, None, Some("AbortError"), FailureKind::Timeout)]
    #[case(Some("slow"), Some(504), None, Some("TimeoutError"), FailureKind::Timeout)]
    #[case(Some("NetworkError when attempting to fetch"), None, None, None, FailureKind::Network)]
    #[case(Some("fetch failed"), Some(400), None, None, FailureKind::Network)]
    #[case(Some("Service unavailable"), Some(503), None, None, FailureKind::HttpStatus(503))]
    #[case(None, Some(429), None, None, FailureKind::HttpStatus(429))]
    #[case(Some("deadlock detected"), None, Some("40P01"), None, FailureKind::Database("40P01"))]
    #[case(Some("deadlock detected"), Some(409), Some("40P01"), None, FailureKind::Database("40P01"))]
    #[case(Some("duplicate key"), Some(409), Some("23505"), None, FailureKind::Database("23505"))]
    #[case(Some("Service unavailable"), Some(503), Some("PGRST000"), None, FailureKind::HttpStatus(503))]
    #[case(Some("Conflict"), Some(409), Some(""), None, FailureKind::HttpStatus(409))]
    #[case(Some("duplicate key"), None, Some(""), None, FailureKind::Other)]
    #[case(None, None, None, None, FailureKind::Other)]
    fn test_from_parts(
        #[case] message: Option<&str>,
        #[case] status: Option<u16>,
        #[case] code: Option<&str>,
        #[case] name: Option<&str>,
        #[case] expected: FailureKind<'static>,
    ) {
        let failure = Failure::from_parts(message, status, code, name);
        assert_eq!(failure.failure_kind(), expected);
    }

    #[test]
    fn test_message_matching_is_case_insensitive() {
        let failure = Failure::from_parts(Some("GATEWAY TIMEOUT"), None, None, None);
        assert_eq!(failure, Failure::Timeout("GATEWAY TIMEOUT".to_string()));
    }

    #[test]
    fn test_io_error_conversion() {
        let timed_out: Failure = io::Error::new(io::ErrorKind::TimedOut, "deadline").into();
        assert_eq!(timed_out.failure_kind(), FailureKind::Timeout);

        let reset: Failure = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        assert_eq!(reset.failure_kind(), FailureKind::Network);

        let denied: Failure = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(denied.failure_kind(), FailureKind::Other);
    }

    #[test]
    fn test_transient_status() {
        assert!(FailureKind::HttpStatus(500).is_transient_status());
        assert!(FailureKind::HttpStatus(599).is_transient_status());
        assert!(FailureKind::HttpStatus(429).is_transient_status());
        assert!(!FailureKind::HttpStatus(600).is_transient_status());
        assert!(!FailureKind::HttpStatus(404).is_transient_status());
        assert!(!FailureKind::Network.is_transient_status());
    }

    #[test]
    fn test_display() {
        let failure = Failure::HttpStatus {
            status: 502,
            message: "Bad gateway".to_string(),
        };
        assert_eq!(failure.to_string(), "HTTP error (status 502): Bad gateway");
        assert_eq!(failure.status(), Some(502));
    }
}
