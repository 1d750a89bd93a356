//! Upstream error taxonomy.
//!
//! Every failure of a single sync attempt is classified as retryable or
//! fatal. Connection failures, per-attempt timeouts and upstream 5xx
//! responses are transient; everything else short-circuits the retry loop.

use std::time::Duration;

use axum::http::StatusCode;

/// Classification of an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient; eligible to consume one of the bounded retry attempts.
    Retryable,
    /// Non-transient; retry is skipped.
    Fatal,
}

/// A failed sync attempt against the downstream dependency.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream endpoint: {0}")]
    Endpoint(String),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("connection to upstream failed: {0}")]
    Connect(String),

    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream unavailable: {0}")]
    Unavailable(StatusCode),

    #[error("upstream rejected the event: {0}")]
    Rejected(StatusCode),

    #[error("event payload could not be serialized: {0}")]
    Payload(#[from] serde_json::Error),
}

impl UpstreamError {
    /// Classify this error for the retry loop.
    pub fn kind(&self) -> ErrorKind {
        match self {
            UpstreamError::Connect(_)
            | UpstreamError::Timeout(_)
            | UpstreamError::Unavailable(_) => ErrorKind::Retryable,
            UpstreamError::Endpoint(_)
            | UpstreamError::Request(_)
            | UpstreamError::Rejected(_)
            | UpstreamError::Payload(_) => ErrorKind::Fatal,
        }
    }

    /// Map a response status to an error, or `None` for success statuses.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        if status.is_success() {
            None
        } else if status.is_server_error() {
            Some(UpstreamError::Unavailable(status))
        } else {
            Some(UpstreamError::Rejected(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_retryable() {
        assert_eq!(
            UpstreamError::Connect("refused".into()).kind(),
            ErrorKind::Retryable
        );
        assert_eq!(
            UpstreamError::Timeout(Duration::from_secs(5)).kind(),
            ErrorKind::Retryable
        );
    }

    #[test]
    fn server_errors_are_retryable() {
        let err = UpstreamError::from_status(StatusCode::SERVICE_UNAVAILABLE).unwrap();
        assert!(matches!(err, UpstreamError::Unavailable(_)));
        assert_eq!(err.kind(), ErrorKind::Retryable);
    }

    #[test]
    fn client_errors_are_fatal() {
        let err = UpstreamError::from_status(StatusCode::BAD_REQUEST).unwrap();
        assert!(matches!(err, UpstreamError::Rejected(_)));
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn success_statuses_are_not_errors() {
        assert!(UpstreamError::from_status(StatusCode::OK).is_none());
        assert!(UpstreamError::from_status(StatusCode::ACCEPTED).is_none());
    }
}
