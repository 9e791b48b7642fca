//! # botwire Driver
//!
//! Forward WebSocket driver: dials the bot server, waits for identities to
//! announce themselves, then multiplexes API calls and inbound events on one
//! socket, reconnecting whenever the transport drops.
//!
//! ## Components
//!
//! - [`WsClient`] - Connection state machine and API caller
//! - [`PendingCalls`] - Echo to response-channel correlation table
//! - [`InboundFrame`] - Classification of inbound text frames
//! - [`Endpoint`] - TCP or Unix-socket transport target

pub mod client;
pub mod correlation;
pub mod error;
pub mod protocol;
pub mod timing;
pub mod transport;

pub use client::{ConnectionState, WsClient};
pub use correlation::PendingCalls;
pub use error::DriverError;
pub use protocol::InboundFrame;
pub use timing::DriverTiming;
pub use transport::{encode_unix_url, resolve_uri, Endpoint};
