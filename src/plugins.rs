//! Built-in plugins.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use botwire_core::CallerRegistry;
use botwire_protocols::{Identity, Plugin, PluginError, PluginInfo};

/// Logs the account behind each configured identity once the driver is up.
pub struct LoginInfoPlugin {
    info: PluginInfo,
    identities: Vec<Identity>,
    callers: Arc<CallerRegistry>,
}

impl LoginInfoPlugin {
    pub fn new(identities: Vec<Identity>, callers: Arc<CallerRegistry>) -> Self {
        Self {
            info: PluginInfo::new("login-info", env!("CARGO_PKG_VERSION"))
                .with_author("botwire")
                .with_details("Queries get_login_info for every configured identity"),
            identities,
            callers,
        }
    }
}

#[async_trait]
impl Plugin for LoginInfoPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn pre_load(&self) -> Result<(), PluginError> {
        if self.identities.is_empty() {
            return Err(PluginError::PreloadFailed(
                "no identities configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn start(&self) -> Result<(), PluginError> {
        for &identity in &self.identities {
            let Some(caller) = self.callers.load(identity) else {
                warn!(identity, "No live connection, skipping login info");
                continue;
            };
            let response = caller.call_action("get_login_info", Value::Null).await?;
            if !response.is_ok() {
                return Err(PluginError::StartFailed(format!(
                    "get_login_info for {} returned {} ({})",
                    identity,
                    response.retcode(),
                    response.wording()
                )));
            }
            let nickname = response.data()["nickname"].as_str().unwrap_or_default();
            info!(identity, nickname, "Logged in");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botwire_protocols::{ApiCaller, ApiError, ApiRequest, ApiResponse};
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedCaller {
        retcode: i64,
        actions: Mutex<Vec<String>>,
    }

    impl ScriptedCaller {
        fn new(retcode: i64) -> Arc<Self> {
            Arc::new(Self {
                retcode,
                actions: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ApiCaller for ScriptedCaller {
        async fn call_api(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
            self.actions.lock().unwrap().push(request.action);
            let status = if self.retcode == 0 { "ok" } else { "failed" };
            Ok(ApiResponse::new(status, json!({"nickname": "bot"}), self.retcode, 1))
        }
    }

    #[tokio::test]
    async fn test_preload_requires_identities() {
        let plugin = LoginInfoPlugin::new(vec![], Arc::default());
        assert!(matches!(
            plugin.pre_load().await,
            Err(PluginError::PreloadFailed(_))
        ));

        let plugin = LoginInfoPlugin::new(vec![1], Arc::default());
        assert!(plugin.pre_load().await.is_ok());
    }

    #[tokio::test]
    async fn test_start_queries_each_live_identity() {
        let callers = Arc::new(CallerRegistry::new());
        let caller = ScriptedCaller::new(0);
        callers.store(1, caller.clone());

        let plugin = LoginInfoPlugin::new(vec![1, 2], callers);
        plugin.start().await.unwrap();

        assert_eq!(*caller.actions.lock().unwrap(), vec!["get_login_info"]);
    }

    #[tokio::test]
    async fn test_start_reports_failed_call() {
        let callers = Arc::new(CallerRegistry::new());
        callers.store(1, ScriptedCaller::new(100));

        let plugin = LoginInfoPlugin::new(vec![1], callers);
        let err = plugin.start().await.unwrap_err();
        assert!(matches!(err, PluginError::StartFailed(_)));
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn test_info() {
        let plugin = LoginInfoPlugin::new(vec![1], Arc::default());
        assert_eq!(plugin.info().name, "login-info");
    }
}
