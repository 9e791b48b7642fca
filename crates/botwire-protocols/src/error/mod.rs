//! Error types for the botwire protocol layer.

mod api;
mod hook;
mod plugin;

pub use api::*;
pub use hook::*;
pub use plugin::*;
