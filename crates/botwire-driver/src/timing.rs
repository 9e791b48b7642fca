//! Driver timing.

use std::time::Duration;

use botwire_config::TimingConfig;

/// Delays and deadlines used by the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverTiming {
    /// Wait between failed dial or handshake attempts.
    pub dial_backoff: Duration,
    /// How long the handshake waits for identities to announce themselves.
    pub handshake_window: Duration,
    /// Wait between a dropped transport and the next dial.
    pub reconnect_delay: Duration,
    /// How long an API call waits for its response.
    pub api_timeout: Duration,
}

impl Default for DriverTiming {
    fn default() -> Self {
        Self {
            dial_backoff: Duration::from_secs(2),
            handshake_window: Duration::from_secs(5),
            reconnect_delay: Duration::from_millis(3),
            api_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&TimingConfig> for DriverTiming {
    fn from(config: &TimingConfig) -> Self {
        Self {
            dial_backoff: config.dial_backoff(),
            handshake_window: config.handshake_window(),
            reconnect_delay: config.reconnect_delay(),
            api_timeout: config.api_timeout(),
        }
    }
}
