//! API call errors.

use thiserror::Error;

use crate::types::Identity;

/// Outcome of an API call that did not produce a response.
///
/// None of these are retried by the driver; retrying is up to the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be written to the socket.
    #[error("Failed to send API request: {0}")]
    Write(String),

    /// The connection dropped while the call was waiting.
    #[error("Broken pipe: connection closed before a response arrived")]
    BrokenPipe,

    /// No response arrived within the call timeout.
    #[error("Deadline exceeded waiting for API response")]
    DeadlineExceeded,

    /// No live caller is registered for the identity.
    #[error("No API caller registered for identity {0}")]
    NoCaller(Identity),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_error() {
        let err = ApiError::Write("connection reset".to_string());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_broken_pipe_error() {
        assert!(ApiError::BrokenPipe.to_string().contains("Broken pipe"));
    }

    #[test]
    fn test_deadline_exceeded_error() {
        assert!(ApiError::DeadlineExceeded.to_string().contains("Deadline"));
    }

    #[test]
    fn test_no_caller_error() {
        let err = ApiError::NoCaller(10001);
        assert!(err.to_string().contains("10001"));
    }

    #[test]
    fn test_serialization_from() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ApiError::from(json_err);
        assert!(matches!(err, ApiError::Serialization(_)));
    }
}
