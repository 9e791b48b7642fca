//! Driver errors.

use thiserror::Error;

use botwire_core::CascadeError;

/// Errors raised by the connection state machine.
///
/// Transport errors (`Dial`, `Handshake`, `WebSocket`, `Io`) are retried by
/// the driver itself; `InvalidUri`, `Cascade` and `ReadLoop` are returned to the caller.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Dial failed: {0}")]
    Dial(String),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error(transparent)]
    Cascade(#[from] CascadeError),

    #[error("Read loop stopped: {0}")]
    ReadLoop(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for DriverError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        DriverError::WebSocket(e.to_string())
    }
}

impl From<url::ParseError> for DriverError {
    fn from(e: url::ParseError) -> Self {
        DriverError::InvalidUri(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botwire_core::HookPhase;
    use botwire_protocols::HookError;

    #[test]
    fn test_invalid_uri_from_parse_error() {
        let err = DriverError::from(url::Url::parse("not a url").unwrap_err());
        assert!(matches!(err, DriverError::InvalidUri(_)));
        assert!(err.to_string().starts_with("Invalid URI"));
    }

    #[test]
    fn test_websocket_from_tungstenite() {
        let err = DriverError::from(tokio_tungstenite::tungstenite::Error::ConnectionClosed);
        assert!(matches!(err, DriverError::WebSocket(_)));
    }

    #[test]
    fn test_cascade_is_transparent() {
        let cascade = CascadeError {
            phase: HookPhase::AllConnected,
            identity: None,
            index: 0,
            source: HookError::failed("missing group"),
        };
        let err = DriverError::from(cascade);
        assert!(err.to_string().starts_with("all-connected hook #0"));
        assert!(err.to_string().contains("missing group"));
    }

    #[test]
    fn test_io_from() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(DriverError::from(io).to_string().contains("refused"));
    }
}
