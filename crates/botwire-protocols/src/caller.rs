//! Caller and event handler traits.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::types::{ApiRequest, ApiResponse};

/// Something that can issue correlated API calls.
///
/// Implemented by the WebSocket driver; stored per identity in the caller
/// registry so hooks and plugins can reach the live connection.
#[async_trait]
pub trait ApiCaller: Send + Sync + 'static {
    /// Send `request` and wait for its response.
    async fn call_api(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;

    /// Shorthand for building an [`ApiRequest`] and calling it.
    async fn call_action(&self, action: &str, params: Value) -> Result<ApiResponse, ApiError> {
        self.call_api(ApiRequest::new(action, params)).await
    }
}

/// Receives protocol events the driver does not consume itself.
///
/// Called inline from the read loop, so implementations must not block.
/// Responses to API calls are read by that same loop: a handler that wants
/// to call the API has to spawn a task instead of awaiting inline.
pub trait EventHandler: Send + Sync + 'static {
    fn handle_event(&self, payload: &str, caller: Arc<dyn ApiCaller>);
}

impl<F> EventHandler for F
where
    F: Fn(&str, Arc<dyn ApiCaller>) + Send + Sync + 'static,
{
    fn handle_event(&self, payload: &str, caller: Arc<dyn ApiCaller>) {
        self(payload, caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct EchoCaller;

    #[async_trait]
    impl ApiCaller for EchoCaller {
        async fn call_api(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
            Ok(ApiResponse::new("ok", request.params, 0, request.echo))
        }
    }

    #[tokio::test]
    async fn test_call_action_builds_request() {
        let caller = EchoCaller;
        let rsp = caller
            .call_action("get_login_info", serde_json::json!({"a": 1}))
            .await
            .unwrap();
        assert_eq!(rsp.data()["a"], 1);
        assert_eq!(rsp.echo(), 0);
    }

    #[test]
    fn test_closure_event_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = move |payload: &str, _caller: Arc<dyn ApiCaller>| {
            sink.lock().unwrap().push(payload.to_string());
        };
        handler.handle_event("{\"post_type\":\"message\"}", Arc::new(EchoCaller));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
