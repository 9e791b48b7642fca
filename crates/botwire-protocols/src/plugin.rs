//! Plugin trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Descriptive metadata for a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub details: String,
}

impl PluginInfo {
    /// Create plugin info with a name and version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            author: String::new(),
            details: String::new(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

/// A pluggable unit bootstrapped after every identity has connected.
///
/// Bootstrap runs in two phases. `pre_load` runs for every plugin and a
/// failure removes the plugin; `start` then runs for the survivors.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Returns the plugin metadata.
    fn info(&self) -> &PluginInfo;

    /// Prepare the plugin. A failure removes it before the start phase.
    async fn pre_load(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Begin work. Runs detached; a failure is logged and isolated.
    async fn start(&self) -> Result<(), PluginError>;
}
