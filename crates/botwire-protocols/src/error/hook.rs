//! Lifecycle hook errors.

use thiserror::Error;

use super::ApiError;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Hook failed: {0}")]
    Failed(String),

    #[error("Hook panicked: {0}")]
    Panicked(String),

    #[error("Hook API call failed: {0}")]
    Api(#[from] ApiError),
}

impl HookError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_error() {
        let err = HookError::failed("missing group");
        assert_eq!(err.to_string(), "Hook failed: missing group");
    }

    #[test]
    fn test_panicked_error() {
        let err = HookError::Panicked("index out of bounds".to_string());
        assert!(err.to_string().contains("panicked"));
        assert!(err.to_string().contains("index out of bounds"));
    }

    #[test]
    fn test_api_error_from() {
        let err = HookError::from(ApiError::BrokenPipe);
        assert!(matches!(err, HookError::Api(ApiError::BrokenPipe)));
    }
}
