//! Plugin errors.

use thiserror::Error;

use super::ApiError;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Plugin pre-load failed: {0}")]
    PreloadFailed(String),

    #[error("Plugin start failed: {0}")]
    StartFailed(String),

    #[error("Plugin panicked: {0}")]
    Panicked(String),

    #[error("Plugin API call failed: {0}")]
    Api(#[from] ApiError),
}
