//! Two-phase plugin bootstrap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use botwire_protocols::{Plugin, PluginError, PluginInfo};

use crate::isolation::{catch_panic, panic_message};

/// Outcome of the pre-load phase.
#[derive(Debug, Default)]
pub struct PreloadReport {
    /// Plugins that survived, in registration order.
    pub loaded: Vec<String>,
    /// Plugins removed because pre-load failed.
    pub removed: Vec<(String, PluginError)>,
}

/// Owns the plugin list and runs the bootstrap once per process.
///
/// Pre-load runs every plugin concurrently and waits for all of them; the
/// failures are removed only after every task has finished, so no plugin
/// is dropped from under a sibling still running. Start is fire-and-forget.
pub struct PluginOrchestrator {
    plugins: Mutex<Vec<Arc<dyn Plugin>>>,
    bootstrapped: AtomicBool,
}

impl PluginOrchestrator {
    pub fn new() -> Self {
        Self {
            plugins: Mutex::new(Vec::new()),
            bootstrapped: AtomicBool::new(false),
        }
    }

    /// Register a plugin.
    pub fn register(&self, plugin: Arc<dyn Plugin>) {
        info!("Registering plugin: {} v{}", plugin.info().name, plugin.info().version);
        self.plugins.lock().push(plugin);
    }

    /// Metadata of every registered plugin, in registration order.
    pub fn list(&self) -> Vec<PluginInfo> {
        self.plugins.lock().iter().map(|p| p.info().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.lock().is_empty()
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.load(Ordering::SeqCst)
    }

    /// Run pre-load then start, the first time only.
    ///
    /// Returns the start handles, or `None` if bootstrap already ran.
    pub async fn bootstrap(&self) -> Option<Vec<JoinHandle<()>>> {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            return None;
        }
        let report = self.pre_load_all().await;
        info!(
            loaded = report.loaded.len(),
            removed = report.removed.len(),
            "Plugin pre-load finished"
        );
        Some(self.start_all())
    }

    /// Pre-load every plugin concurrently and drop the ones that fail.
    pub async fn pre_load_all(&self) -> PreloadReport {
        let snapshot: Vec<Arc<dyn Plugin>> = self.plugins.lock().clone();

        let handles = snapshot.iter().map(|plugin| {
            let plugin = plugin.clone();
            tokio::spawn(async move { plugin.pre_load().await })
        });
        let outcomes = join_all(handles).await;

        let mut report = PreloadReport::default();
        let mut failed: Vec<Arc<dyn Plugin>> = Vec::new();
        for (plugin, outcome) in snapshot.iter().zip(outcomes) {
            let name = plugin.info().name.clone();
            let failure = match outcome {
                Ok(Ok(())) => {
                    report.loaded.push(name);
                    continue;
                }
                Ok(Err(e)) => e,
                Err(join_err) if join_err.is_panic() => {
                    PluginError::Panicked(panic_message(join_err.into_panic().as_ref()))
                }
                Err(join_err) => PluginError::PreloadFailed(join_err.to_string()),
            };
            error!(plugin = %name, error = %failure, "Plugin pre-load failed, removing");
            failed.push(plugin.clone());
            report.removed.push((name, failure));
        }

        if !failed.is_empty() {
            self.plugins
                .lock()
                .retain(|p| !failed.iter().any(|f| Arc::ptr_eq(p, f)));
        }
        report
    }

    /// Start every surviving plugin on its own task without waiting.
    pub fn start_all(&self) -> Vec<JoinHandle<()>> {
        let snapshot: Vec<Arc<dyn Plugin>> = self.plugins.lock().clone();
        snapshot
            .into_iter()
            .map(|plugin| {
                tokio::spawn(async move {
                    let name = plugin.info().name.clone();
                    match catch_panic(plugin.start()).await {
                        Ok(Ok(())) => info!("Plugin {} started", name),
                        Ok(Err(e)) => warn!(plugin = %name, error = %e, "Plugin start failed"),
                        Err(message) => error!(plugin = %name, "Plugin start panicked: {}", message),
                    }
                })
            })
            .collect()
    }
}

impl Default for PluginOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "plugins_tests.rs"]
mod tests;
