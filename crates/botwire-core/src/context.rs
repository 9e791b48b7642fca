//! Identity-bound context handed to lifecycle hooks.

use serde_json::Value;
use std::sync::Arc;

use botwire_protocols::{ApiCaller, ApiError, ApiResponse, Identity};

use crate::registry::CallerRegistry;

/// Context for one identity, built fresh for every hook invocation.
#[derive(Clone)]
pub struct HookContext {
    identity: Identity,
    /// `None` when the identity has no live caller, e.g. after disconnect.
    caller: Option<Arc<dyn ApiCaller>>,
}

impl HookContext {
    pub fn new(identity: Identity, caller: Option<Arc<dyn ApiCaller>>) -> Self {
        Self { identity, caller }
    }

    /// Build a context from whatever caller is registered right now.
    pub fn from_registry(identity: Identity, registry: &CallerRegistry) -> Self {
        Self::new(identity, registry.load(identity))
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn caller(&self) -> Option<&Arc<dyn ApiCaller>> {
        self.caller.as_ref()
    }

    pub fn has_caller(&self) -> bool {
        self.caller.is_some()
    }

    /// Call `action` through this identity's caller.
    pub async fn call_action(&self, action: &str, params: Value) -> Result<ApiResponse, ApiError> {
        match &self.caller {
            Some(caller) => caller.call_action(action, params).await,
            None => Err(ApiError::NoCaller(self.identity)),
        }
    }
}

impl std::fmt::Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("identity", &self.identity)
            .field("has_caller", &self.caller.is_some())
            .finish()
    }
}
