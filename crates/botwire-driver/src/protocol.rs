//! Inbound frame classification.

use serde_json::Value;

use botwire_protocols::{ApiResponse, Identity};

/// What an inbound text frame means to the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Reply to an API call, correlated by its echo.
    Response(ApiResponse),
    /// Keep-alive, dropped without further processing.
    Heartbeat,
    /// An identity came online on the existing connection.
    IdentityConnect(Identity),
    /// Anything else, handed to the event handler untouched.
    Event,
}

impl InboundFrame {
    /// Classify a decoded frame.
    ///
    /// The presence of `echo` alone makes a frame a response, whatever else
    /// it carries.
    pub fn classify(frame: &Value) -> Self {
        if frame.get("echo").is_some() {
            return InboundFrame::Response(ApiResponse::from_frame(frame));
        }
        if frame.get("meta_event_type").and_then(Value::as_str) == Some("heartbeat") {
            return InboundFrame::Heartbeat;
        }
        if frame.get("sub_type").and_then(Value::as_str) == Some("connect") {
            if let Some(identity) = frame.get("self_id").and_then(parse_identity) {
                return InboundFrame::IdentityConnect(identity);
            }
        }
        InboundFrame::Event
    }
}

/// Identity carried by a handshake announcement (`{"self_id": ...}`).
pub fn announced_identity(frame: &Value) -> Option<Identity> {
    frame.get("self_id").and_then(parse_identity)
}

fn parse_identity(value: &Value) -> Option<Identity> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
