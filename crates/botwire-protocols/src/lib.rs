//! # botwire Protocols
//!
//! Wire types and trait definitions shared by the botwire crates.
//! Contains only interface definitions - no implementations.
//!
//! ## Core Traits
//!
//! - [`ApiCaller`] - Issues correlated API calls over a live connection
//! - [`EventHandler`] - Consumes protocol events the driver does not handle itself
//! - [`Plugin`] - Pluggable unit bootstrapped once the driver is ready

pub mod caller;
pub mod error;
pub mod plugin;
pub mod types;

pub use caller::{ApiCaller, EventHandler};
pub use error::{ApiError, HookError, PluginError};
pub use plugin::{Plugin, PluginInfo};
pub use types::{parse_echo, ApiRequest, ApiResponse, Identity};
