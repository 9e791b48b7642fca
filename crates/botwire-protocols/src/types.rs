//! Wire envelope types.
//!
//! Only the envelope matters to the driver: `params` and `data` are opaque
//! JSON values whose meaning belongs to the protocol action.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One logical bot session multiplexed on a driver's socket.
pub type Identity = i64;

/// Outbound API request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub action: String,
    #[serde(default)]
    pub params: Value,
    /// Correlation id. Always overwritten by the driver before sending.
    #[serde(default)]
    pub echo: u64,
}

impl ApiRequest {
    /// Create a request for `action` with the given parameters.
    pub fn new(action: impl Into<String>, params: Value) -> Self {
        Self {
            action: action.into(),
            params,
            echo: 0,
        }
    }
}

/// Inbound API response.
///
/// Built once from a wire frame and read through accessors afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    status: String,
    data: Value,
    msg: String,
    wording: String,
    retcode: i64,
    echo: u64,
}

impl ApiResponse {
    pub fn new(status: impl Into<String>, data: Value, retcode: i64, echo: u64) -> Self {
        Self {
            status: status.into(),
            data,
            msg: String::new(),
            wording: String::new(),
            retcode,
            echo,
        }
    }

    pub fn with_message(mut self, msg: impl Into<String>, wording: impl Into<String>) -> Self {
        self.msg = msg.into();
        self.wording = wording.into();
        self
    }

    /// Build a response from a decoded frame.
    ///
    /// Missing or mistyped fields fall back to their zero value, so a
    /// sparse frame from a lenient server still correlates.
    pub fn from_frame(frame: &Value) -> Self {
        let text = |key: &str| {
            frame
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            status: text("status"),
            data: frame.get("data").cloned().unwrap_or(Value::Null),
            msg: text("msg"),
            wording: text("wording"),
            retcode: frame.get("retcode").and_then(Value::as_i64).unwrap_or(0),
            echo: frame.get("echo").and_then(parse_echo).unwrap_or(0),
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }

    pub fn wording(&self) -> &str {
        &self.wording
    }

    pub fn retcode(&self) -> i64 {
        self.retcode
    }

    pub fn echo(&self) -> u64 {
        self.echo
    }

    /// Whether the remote side reported success.
    pub fn is_ok(&self) -> bool {
        self.status == "ok" && self.retcode == 0
    }

    /// Consume the response, keeping only its payload.
    pub fn into_data(self) -> Value {
        self.data
    }
}

/// Read an echo value that may arrive as a number or a numeric string.
pub fn parse_echo(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
