use super::*;
use async_trait::async_trait;
use botwire_protocols::{ApiCaller, ApiError, ApiRequest, ApiResponse};
use parking_lot::Mutex;
use std::sync::atomic::AtomicUsize;

struct NullCaller;

#[async_trait]
impl ApiCaller for NullCaller {
    async fn call_api(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        Ok(ApiResponse::new("ok", serde_json::Value::Null, 0, request.echo))
    }
}

fn cascade() -> HookCascade {
    HookCascade::new(Arc::new(CallerRegistry::new()))
}

async fn exploding_hook() -> Result<(), HookError> {
    panic!("hook exploded")
}

async fn panicking_cleanup(_ctxs: Vec<HookContext>) -> Result<(), HookError> {
    panic!("cleanup panicked")
}

/// Shared log of which hooks ran, in order.
fn journal() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn test_phase_policies() {
    assert_eq!(HookPhase::TransportEstablished.policy(), FailurePolicy::FailFast);
    assert_eq!(HookPhase::IdentityConnected.policy(), FailurePolicy::FailFast);
    assert_eq!(HookPhase::AllConnected.policy(), FailurePolicy::FailFast);
    assert_eq!(HookPhase::Disconnected.policy(), FailurePolicy::FailSoft);
}

#[test]
fn test_hook_count() {
    let mut hooks = cascade();
    hooks.add_transport_hook(|| async { Ok(()) });
    hooks.add_identity_hook(1, |_ctx| async { Ok(()) });
    hooks.add_identity_hook(2, |_ctx| async { Ok(()) });
    hooks.add_identity_hook(2, |_ctx| async { Ok(()) });
    hooks.add_disconnect_hook(|_ctxs| async { Ok(()) });

    assert_eq!(hooks.hook_count(HookPhase::TransportEstablished), 1);
    assert_eq!(hooks.hook_count(HookPhase::IdentityConnected), 3);
    assert_eq!(hooks.hook_count(HookPhase::AllConnected), 0);
    assert_eq!(hooks.hook_count(HookPhase::Disconnected), 1);
}

#[tokio::test]
async fn test_transport_established_arms_disconnect() {
    let hooks = cascade();
    assert!(!hooks.is_disconnect_armed());

    hooks.on_transport_established().await.unwrap();
    assert!(hooks.is_disconnect_armed());
}

#[tokio::test]
async fn test_transport_failure_is_fatal_and_unarmed() {
    let ran = journal();
    let mut hooks = cascade();
    hooks.add_transport_hook(|| async { Err(HookError::failed("no database")) });
    let later = ran.clone();
    hooks.add_transport_hook(move || {
        let later = later.clone();
        async move {
            later.lock().push("second".to_string());
            Ok(())
        }
    });

    let err = hooks.on_transport_established().await.unwrap_err();
    assert_eq!(err.phase, HookPhase::TransportEstablished);
    assert_eq!(err.index, 0);
    assert!(matches!(err.source, HookError::Failed(_)));
    assert!(ran.lock().is_empty());
    assert!(!hooks.is_disconnect_armed());
}

#[tokio::test]
async fn test_transport_panic_is_captured() {
    let mut hooks = cascade();
    hooks.add_transport_hook(exploding_hook);

    let err = hooks.on_transport_established().await.unwrap_err();
    match err.source {
        HookError::Panicked(message) => assert!(message.contains("hook exploded")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_identity_hooks_bound_to_identity() {
    let seen = journal();
    let mut hooks = cascade();
    hooks.callers().store(10, Arc::new(NullCaller));
    for id in [10, 20] {
        let seen = seen.clone();
        hooks.add_identity_hook(id, move |ctx| {
            let seen = seen.clone();
            async move {
                seen.lock()
                    .push(format!("{}:{}", ctx.identity(), ctx.has_caller()));
                Ok(())
            }
        });
    }

    hooks.on_identity_connected(10).await.unwrap();
    hooks.on_identity_connected(30).await.unwrap();
    hooks.on_identity_connected(20).await.unwrap();

    assert_eq!(*seen.lock(), vec!["10:true", "20:false"]);
}

#[tokio::test]
async fn test_identity_failure_names_identity() {
    let mut hooks = cascade();
    hooks.add_identity_hook(42, |_ctx| async { Err(HookError::failed("join group")) });

    let err = hooks.on_identity_connected(42).await.unwrap_err();
    assert_eq!(err.identity, Some(42));
    let display = err.to_string();
    assert!(display.contains("identity-connected"));
    assert!(display.contains("for identity 42"));
    assert!(display.contains("join group"));
}

#[tokio::test]
async fn test_all_connected_receives_every_context() {
    let seen = journal();
    let mut hooks = cascade();
    let sink = seen.clone();
    hooks.add_all_connected_hook(move |ctxs| {
        let sink = sink.clone();
        async move {
            let ids: Vec<String> = ctxs.iter().map(|c| c.identity().to_string()).collect();
            sink.lock().push(ids.join(","));
            Ok(())
        }
    });

    hooks.on_all_connected(&[3, 1, 2]).await.unwrap();
    hooks.on_all_connected(&[]).await.unwrap();

    assert_eq!(*seen.lock(), vec!["3,1,2", ""]);
}

#[tokio::test]
async fn test_disconnect_skipped_when_unarmed() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut hooks = cascade();
    let c = count.clone();
    hooks.add_disconnect_hook(move |_ctxs| {
        c.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    });

    assert!(!hooks.on_disconnected(&[1]).await);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_disconnect_fires_once_per_epoch() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut hooks = cascade();
    let c = count.clone();
    hooks.add_disconnect_hook(move |_ctxs| {
        c.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    });

    hooks.on_transport_established().await.unwrap();
    assert!(hooks.on_disconnected(&[1]).await);
    assert!(!hooks.is_disconnect_armed());
    assert!(!hooks.on_disconnected(&[1]).await);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // Next epoch re-arms.
    hooks.on_transport_established().await.unwrap();
    assert!(hooks.is_disconnect_armed());
    assert!(hooks.on_disconnected(&[1]).await);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_disconnect_triggers_fire_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut hooks = cascade();
    let c = count.clone();
    hooks.add_disconnect_hook(move |_ctxs| {
        let c = c.clone();
        async move {
            tokio::task::yield_now().await;
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    let hooks = Arc::new(hooks);

    for _ in 0..50 {
        hooks.on_transport_established().await.unwrap();
        let read_loop = tokio::spawn({
            let hooks = hooks.clone();
            async move { hooks.on_disconnected(&[1, 2]).await }
        });
        let shutdown = tokio::spawn({
            let hooks = hooks.clone();
            async move { hooks.on_disconnected(&[1, 2]).await }
        });
        let (a, b) = (read_loop.await.unwrap(), shutdown.await.unwrap());
        assert!(a ^ b, "exactly one trigger should run the cascade");
        assert!(!hooks.is_disconnect_armed());
    }
    assert_eq!(count.load(Ordering::SeqCst), 50);
}

#[tokio::test]
async fn test_disconnect_is_fail_soft() {
    let ran = journal();
    let mut hooks = cascade();
    hooks.add_disconnect_hook(|_ctxs| async { Err(HookError::failed("flush failed")) });
    hooks.add_disconnect_hook(panicking_cleanup);
    let sink = ran.clone();
    hooks.add_disconnect_hook(move |ctxs| {
        let sink = sink.clone();
        async move {
            sink.lock().push(format!("last:{}", ctxs.len()));
            Ok(())
        }
    });

    hooks.on_transport_established().await.unwrap();
    assert!(hooks.on_disconnected(&[5, 6]).await);
    assert_eq!(*ran.lock(), vec!["last:2"]);
}

#[tokio::test]
async fn test_hooks_run_in_registration_order() {
    let ran = journal();
    let mut hooks = cascade();
    for name in ["a", "b", "c"] {
        let sink = ran.clone();
        hooks.add_transport_hook(move || {
            let sink = sink.clone();
            async move {
                sink.lock().push(name.to_string());
                Ok(())
            }
        });
    }

    hooks.on_transport_established().await.unwrap();
    assert_eq!(*ran.lock(), vec!["a", "b", "c"]);
}
