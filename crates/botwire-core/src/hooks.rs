//! Lifecycle hook cascade.
//!
//! Four phases fire around a connection epoch:
//! - transport established (after the handshake)
//! - identity connected (once per identity)
//! - all connected (after every per-identity cascade)
//! - disconnected (at most once per epoch)
//!
//! Connect phases are preconditions and fail fast: the first failing hook
//! stops the cascade and its error is returned for the driver to abort on.
//! The disconnect phase is cleanup and fails soft: every hook runs, failures
//! are logged.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, error};

use botwire_protocols::{HookError, Identity};

use crate::context::HookContext;
use crate::isolation::catch_panic;
use crate::registry::CallerRegistry;

pub type HookFuture = BoxFuture<'static, Result<(), HookError>>;

/// A registered lifecycle callback, tagged by the context it takes.
#[derive(Clone)]
pub enum HookCallback {
    /// Takes no context.
    Transport(Arc<dyn Fn() -> HookFuture + Send + Sync>),
    /// Takes the context of one identity.
    Identity(Arc<dyn Fn(HookContext) -> HookFuture + Send + Sync>),
    /// Takes one context per configured identity.
    Identities(Arc<dyn Fn(Vec<HookContext>) -> HookFuture + Send + Sync>),
}

impl HookCallback {
    fn invoke(&self, contexts: &[HookContext]) -> HookFuture {
        match self {
            HookCallback::Transport(f) => f(),
            HookCallback::Identity(f) => match contexts.first() {
                Some(ctx) => f(ctx.clone()),
                None => Box::pin(async { Err(HookError::failed("identity hook without context")) }),
            },
            HookCallback::Identities(f) => f(contexts.to_vec()),
        }
    }
}

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    TransportEstablished,
    IdentityConnected,
    AllConnected,
    Disconnected,
}

impl HookPhase {
    /// What a failing hook means for this phase.
    pub fn policy(self) -> FailurePolicy {
        match self {
            HookPhase::TransportEstablished
            | HookPhase::IdentityConnected
            | HookPhase::AllConnected => FailurePolicy::FailFast,
            HookPhase::Disconnected => FailurePolicy::FailSoft,
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::TransportEstablished => write!(f, "transport-established"),
            HookPhase::IdentityConnected => write!(f, "identity-connected"),
            HookPhase::AllConnected => write!(f, "all-connected"),
            HookPhase::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Failure handling for a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure and report it.
    FailFast,
    /// Log each failure and keep going.
    FailSoft,
}

/// A fail-fast cascade stopped at a failing hook.
#[derive(Debug, Error)]
#[error("{phase} hook #{index}{} failed: {source}", identity_suffix(.identity))]
pub struct CascadeError {
    pub phase: HookPhase,
    pub identity: Option<Identity>,
    /// Position of the failing hook within its phase.
    pub index: usize,
    pub source: HookError,
}

fn identity_suffix(identity: &Option<Identity>) -> String {
    identity
        .map(|id| format!(" for identity {}", id))
        .unwrap_or_default()
}

/// Ordered lifecycle callbacks plus the single-fire disconnect guard.
///
/// Registration takes `&mut self` and must finish before the owning driver
/// is shared; execution only needs `&self`.
pub struct HookCascade {
    callers: Arc<CallerRegistry>,
    transport: Vec<HookCallback>,
    identity: HashMap<Identity, Vec<HookCallback>>,
    all_connected: Vec<HookCallback>,
    disconnected: Vec<HookCallback>,
    /// A disconnect cascade is owed for the current epoch.
    disconnect_armed: AtomicBool,
}

impl HookCascade {
    pub fn new(callers: Arc<CallerRegistry>) -> Self {
        Self {
            callers,
            transport: Vec::new(),
            identity: HashMap::new(),
            all_connected: Vec::new(),
            disconnected: Vec::new(),
            disconnect_armed: AtomicBool::new(false),
        }
    }

    pub fn callers(&self) -> &Arc<CallerRegistry> {
        &self.callers
    }

    /// Run `hook` once the transport handshake completes.
    pub fn add_transport_hook<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.transport
            .push(HookCallback::Transport(Arc::new(move || -> HookFuture {
                Box::pin(hook())
            })));
    }

    /// Run `hook` whenever `identity` connects.
    pub fn add_identity_hook<F, Fut>(&mut self, identity: Identity, hook: F)
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.identity
            .entry(identity)
            .or_default()
            .push(HookCallback::Identity(Arc::new(move |ctx| -> HookFuture {
                Box::pin(hook(ctx))
            })));
    }

    /// Run `hook` after every configured identity has connected.
    pub fn add_all_connected_hook<F, Fut>(&mut self, hook: F)
    where
        F: Fn(Vec<HookContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.all_connected
            .push(HookCallback::Identities(Arc::new(move |ctxs| -> HookFuture {
                Box::pin(hook(ctxs))
            })));
    }

    /// Run `hook` when the connection drops or the driver shuts down.
    pub fn add_disconnect_hook<F, Fut>(&mut self, hook: F)
    where
        F: Fn(Vec<HookContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.disconnected
            .push(HookCallback::Identities(Arc::new(move |ctxs| -> HookFuture {
                Box::pin(hook(ctxs))
            })));
    }

    /// Number of hooks registered for `phase`, across identities.
    pub fn hook_count(&self, phase: HookPhase) -> usize {
        match phase {
            HookPhase::TransportEstablished => self.transport.len(),
            HookPhase::IdentityConnected => self.identity.values().map(Vec::len).sum(),
            HookPhase::AllConnected => self.all_connected.len(),
            HookPhase::Disconnected => self.disconnected.len(),
        }
    }

    pub fn is_disconnect_armed(&self) -> bool {
        self.disconnect_armed.load(Ordering::SeqCst)
    }

    /// Run the transport-established hooks, then arm the disconnect cascade.
    pub async fn on_transport_established(&self) -> Result<(), CascadeError> {
        self.run_phase(HookPhase::TransportEstablished, &self.transport, &[], None)
            .await?;
        self.disconnect_armed.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Run the hooks registered for `identity`.
    pub async fn on_identity_connected(&self, identity: Identity) -> Result<(), CascadeError> {
        let Some(hooks) = self.identity.get(&identity) else {
            return Ok(());
        };
        let ctx = HookContext::from_registry(identity, &self.callers);
        self.run_phase(HookPhase::IdentityConnected, hooks, &[ctx], Some(identity))
            .await
    }

    /// Run the all-connected hooks with one context per identity.
    pub async fn on_all_connected(&self, identities: &[Identity]) -> Result<(), CascadeError> {
        let ctxs = self.contexts(identities);
        self.run_phase(HookPhase::AllConnected, &self.all_connected, &ctxs, None)
            .await
    }

    /// Run the disconnect hooks if a disconnect is owed for this epoch.
    ///
    /// The armed flag is cleared by the same atomic swap that reads it, so
    /// of two racing callers exactly one runs the hooks. Returns whether
    /// this call ran them.
    pub async fn on_disconnected(&self, identities: &[Identity]) -> bool {
        if !self.disconnect_armed.swap(false, Ordering::SeqCst) {
            debug!("Disconnect cascade not armed, skipping");
            return false;
        }
        let ctxs = self.contexts(identities);
        // Fail-soft phases never return an error.
        let _ = self
            .run_phase(HookPhase::Disconnected, &self.disconnected, &ctxs, None)
            .await;
        true
    }

    fn contexts(&self, identities: &[Identity]) -> Vec<HookContext> {
        identities
            .iter()
            .map(|id| HookContext::from_registry(*id, &self.callers))
            .collect()
    }

    async fn run_phase(
        &self,
        phase: HookPhase,
        hooks: &[HookCallback],
        contexts: &[HookContext],
        identity: Option<Identity>,
    ) -> Result<(), CascadeError> {
        debug!(%phase, count = hooks.len(), "Running hook cascade");
        for (index, hook) in hooks.iter().enumerate() {
            let outcome = catch_panic(async { hook.invoke(contexts).await }).await;
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(message) => HookError::Panicked(message),
            };
            match phase.policy() {
                FailurePolicy::FailFast => {
                    return Err(CascadeError {
                        phase,
                        identity,
                        index,
                        source: failure,
                    });
                }
                FailurePolicy::FailSoft => {
                    error!(%phase, index, error = %failure, "Hook failed");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
