//! Registry of live API callers keyed by identity.

use dashmap::DashMap;
use std::sync::Arc;

use botwire_protocols::{ApiCaller, Identity};

/// Maps each connected identity to the caller that can reach it.
///
/// Safe for concurrent store and delete: the handshake, the read loop and
/// hook contexts all touch it from different tasks.
pub struct CallerRegistry {
    callers: DashMap<Identity, Arc<dyn ApiCaller>>,
}

impl CallerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            callers: DashMap::new(),
        }
    }

    /// Register `caller` for `identity`, replacing any previous caller.
    pub fn store(&self, identity: Identity, caller: Arc<dyn ApiCaller>) {
        self.callers.insert(identity, caller);
    }

    /// Remove the caller for `identity`. Returns whether one was registered.
    pub fn delete(&self, identity: Identity) -> bool {
        self.callers.remove(&identity).is_some()
    }

    /// Get the caller for `identity`.
    pub fn load(&self, identity: Identity) -> Option<Arc<dyn ApiCaller>> {
        self.callers.get(&identity).map(|c| c.clone())
    }

    /// Check if `identity` has a caller.
    pub fn contains(&self, identity: Identity) -> bool {
        self.callers.contains_key(&identity)
    }

    /// All registered identities, in no particular order.
    pub fn identities(&self) -> Vec<Identity> {
        self.callers.iter().map(|e| *e.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.callers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }
}

impl Default for CallerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use botwire_protocols::{ApiError, ApiRequest, ApiResponse};

    struct NullCaller;

    #[async_trait]
    impl ApiCaller for NullCaller {
        async fn call_api(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
            Ok(ApiResponse::new("ok", serde_json::Value::Null, 0, request.echo))
        }
    }

    #[test]
    fn test_registry_creation() {
        let registry = CallerRegistry::new();
        assert!(registry.is_empty());
        assert!(CallerRegistry::default().identities().is_empty());
    }

    #[test]
    fn test_store_and_load() {
        let registry = CallerRegistry::new();
        registry.store(1001, Arc::new(NullCaller));

        assert!(registry.contains(1001));
        assert!(registry.load(1001).is_some());
        assert!(registry.load(1002).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_store_replaces() {
        let registry = CallerRegistry::new();
        registry.store(1001, Arc::new(NullCaller));
        registry.store(1001, Arc::new(NullCaller));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_delete() {
        let registry = CallerRegistry::new();
        registry.store(1001, Arc::new(NullCaller));

        assert!(registry.delete(1001));
        assert!(!registry.delete(1001));
        assert!(!registry.contains(1001));
    }

    #[test]
    fn test_identities() {
        let registry = CallerRegistry::new();
        registry.store(1, Arc::new(NullCaller));
        registry.store(2, Arc::new(NullCaller));

        let mut ids = registry.identities();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_concurrent_store_delete() {
        let registry = Arc::new(CallerRegistry::new());
        let mut handles = Vec::new();
        for id in 0..32 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.store(id, Arc::new(NullCaller));
                if id % 2 == 0 {
                    registry.delete(id);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(registry.len(), 16);
    }
}
