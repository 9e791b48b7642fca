//! # botwire Core
//!
//! Lifecycle machinery shared by botwire drivers.
//!
//! ## Components
//!
//! - [`CallerRegistry`] - Maps each identity to its live API caller
//! - [`HookContext`] - Identity-bound context handed to hooks
//! - [`HookCascade`] - Ordered lifecycle callbacks with per-phase failure policy
//! - [`PluginOrchestrator`] - Two-phase plugin bootstrap
//! - [`ShutdownSignal`] - Broadcast trigger for graceful shutdown

pub mod context;
pub mod hooks;
pub mod isolation;
pub mod lifecycle;
pub mod plugins;
pub mod registry;

pub use context::HookContext;
pub use hooks::{CascadeError, FailurePolicy, HookCallback, HookCascade, HookPhase};
pub use lifecycle::ShutdownSignal;
pub use plugins::{PluginOrchestrator, PreloadReport};
pub use registry::CallerRegistry;
