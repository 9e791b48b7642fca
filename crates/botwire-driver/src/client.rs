//! Forward WebSocket driver.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

use botwire_config::DriverConfig;
use botwire_core::{CallerRegistry, HookCascade, PluginOrchestrator, ShutdownSignal};
use botwire_protocols::{ApiCaller, ApiError, ApiRequest, ApiResponse, EventHandler, Identity};

use crate::correlation::PendingCalls;
use crate::error::DriverError;
use crate::protocol::{announced_identity, InboundFrame};
use crate::timing::DriverTiming;
use crate::transport::{dial, resolve_uri, WsSink, WsSource};

/// Where the driver is in its connection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Idle = 0,
    Dialing = 1,
    Handshaking = 2,
    Connected = 3,
    Disconnected = 4,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Dialing,
            2 => ConnectionState::Handshaking,
            3 => ConnectionState::Connected,
            4 => ConnectionState::Disconnected,
            _ => ConnectionState::Idle,
        }
    }
}

/// WebSocket client that dials the bot server and serves API calls over it.
///
/// Hooks must be registered through [`WsClient::hooks_mut`] before the
/// client is wrapped in an `Arc`; everything after that needs `&self` only.
///
/// Hooks that run on the read loop (transport-established after a
/// reconnect, identity-connected for a connect event) block frame
/// delivery while they run. They must spawn any API call they want to make.
pub struct WsClient {
    url: String,
    access_token: Option<String>,
    self_ids: Vec<Identity>,
    timing: DriverTiming,
    hooks: HookCascade,
    plugins: Option<Arc<PluginOrchestrator>>,
    pending: PendingCalls,
    seq: AtomicU64,
    writer: tokio::sync::Mutex<Option<WsSink>>,
    /// Read half of a fresh connection, waiting for the read loop to take it.
    reader: tokio::sync::Mutex<Option<WsSource>>,
    state: AtomicU8,
    closing: AtomicBool,
}

impl WsClient {
    /// Create a client for `url`.
    pub fn new(
        url: impl Into<String>,
        access_token: Option<String>,
        self_ids: Vec<Identity>,
        callers: Arc<CallerRegistry>,
    ) -> Self {
        Self {
            url: url.into(),
            access_token: access_token.filter(|t| !t.is_empty()),
            self_ids,
            timing: DriverTiming::default(),
            hooks: HookCascade::new(callers),
            plugins: None,
            pending: PendingCalls::new(),
            seq: AtomicU64::new(0),
            writer: tokio::sync::Mutex::new(None),
            reader: tokio::sync::Mutex::new(None),
            state: AtomicU8::new(ConnectionState::Idle as u8),
            closing: AtomicBool::new(false),
        }
    }

    /// Create a client from the `[driver]` config section.
    pub fn from_config(config: &DriverConfig, callers: Arc<CallerRegistry>) -> Self {
        Self::new(
            config.url.clone(),
            config.token().map(str::to_string),
            config.self_ids.clone(),
            callers,
        )
        .with_timing(DriverTiming::from(&config.timing))
    }

    pub fn with_timing(mut self, timing: DriverTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Bootstrap `plugins` after the first all-connected cascade.
    pub fn with_plugins(mut self, plugins: Arc<PluginOrchestrator>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    pub fn hooks_mut(&mut self) -> &mut HookCascade {
        &mut self.hooks
    }

    pub fn hooks(&self) -> &HookCascade {
        &self.hooks
    }

    pub fn callers(&self) -> &Arc<CallerRegistry> {
        self.hooks.callers()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn self_ids(&self) -> &[Identity] {
        &self.self_ids
    }

    pub fn timing(&self) -> &DriverTiming {
        &self.timing
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Number of API calls waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn next_echo(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Dial until a connection completes its handshake, then run the
    /// transport-established hooks.
    ///
    /// Dial and handshake failures are retried forever after the dial
    /// backoff. Only an unusable address or a failing hook is returned.
    pub async fn connect(self: &Arc<Self>) -> Result<(), DriverError> {
        let endpoint = resolve_uri(&self.url)?;
        info!("Connecting to WebSocket server: {}", self.url);

        loop {
            self.set_state(ConnectionState::Dialing);
            let (sink, mut source) = match dial(&endpoint, self.access_token.as_deref()).await {
                Ok(halves) => halves,
                Err(e) => {
                    warn!(url = %self.url, error = %e, "Failed to connect to WebSocket server");
                    tokio::time::sleep(self.timing.dial_backoff).await;
                    continue;
                }
            };

            self.set_state(ConnectionState::Handshaking);
            if let Err(e) = self.handshake(&mut source).await {
                warn!(url = %self.url, error = %e, "Handshake with WebSocket server failed");
                tokio::time::sleep(self.timing.dial_backoff).await;
                continue;
            }

            *self.writer.lock().await = Some(sink);
            *self.reader.lock().await = Some(source);
            break;
        }

        self.set_state(ConnectionState::Connected);
        self.hooks.on_transport_established().await?;
        Ok(())
    }

    /// Wait for identities to announce themselves on a fresh connection.
    ///
    /// Completes when every configured identity has announced, after the
    /// first announcement if none are configured, or when the window ends.
    pub(crate) async fn handshake(self: &Arc<Self>, source: &mut WsSource) -> Result<(), DriverError> {
        let mut outstanding: HashSet<Identity> = self.self_ids.iter().copied().collect();
        let wait_for_any = outstanding.is_empty();
        let deadline = tokio::time::Instant::now() + self.timing.handshake_window;

        loop {
            let message = match tokio::time::timeout_at(deadline, source.next()).await {
                Err(_) => {
                    if self.self_ids.len() > 1 {
                        warn!(
                            missing = outstanding.len(),
                            "Handshake timed out, {} identities did not connect",
                            outstanding.len()
                        );
                    }
                    return Ok(());
                }
                Ok(None) => {
                    return Err(DriverError::Handshake(
                        "connection closed during handshake".to_string(),
                    ));
                }
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(message))) => message,
            };

            let Message::Text(text) = message else {
                continue;
            };
            let frame: Value = match serde_json::from_str(text.as_str()) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed handshake frame");
                    continue;
                }
            };
            let Some(identity) = announced_identity(&frame) else {
                debug!("Handshake frame without self_id: {}", text.as_str());
                continue;
            };

            self.register(identity);
            info!(identity, "Connected to WebSocket server: {}", self.url);

            outstanding.remove(&identity);
            if wait_for_any || outstanding.is_empty() {
                return Ok(());
            }
        }
    }

    /// Serve the connection until a shutdown signal closes it.
    ///
    /// Starts the read loop, runs the identity-connected hooks for every
    /// configured identity, then the all-connected hooks, then the plugin
    /// bootstrap. Connects first if [`WsClient::connect`] was not called.
    /// Returns early with the read loop's error if a connect-phase hook fails.
    pub async fn run(
        self: &Arc<Self>,
        handler: Arc<dyn EventHandler>,
        shutdown: ShutdownSignal,
    ) -> Result<(), DriverError> {
        let mut shutdown_rx = shutdown.subscribe();
        if self.state() == ConnectionState::Idle {
            self.connect().await?;
        }

        let mut read_task = tokio::spawn(self.clone().read_loop(handler));
        if let Err(e) = self.startup_cascade().await {
            read_task.abort();
            return Err(e);
        }

        loop {
            tokio::select! {
                signal = shutdown_rx.recv() => {
                    if let Err(RecvError::Closed) = signal {
                        read_task.abort();
                        return Ok(());
                    }
                }
                joined = &mut read_task => {
                    return match joined {
                        Ok(result) => result,
                        Err(e) => Err(DriverError::ReadLoop(e.to_string())),
                    };
                }
            }
            info!("Shutdown requested, closing connection");
            self.closing.store(true, Ordering::SeqCst);
            self.hooks.on_disconnected(&self.self_ids).await;
            match self.close().await {
                Ok(()) => {
                    info!("Connection closed");
                    read_task.abort();
                    return Ok(());
                }
                Err(e) => error!(error = %e, "Failed to close connection"),
            }
        }
    }

    async fn startup_cascade(&self) -> Result<(), DriverError> {
        for identity in &self.self_ids {
            self.hooks.on_identity_connected(*identity).await?;
        }
        self.hooks.on_all_connected(&self.self_ids).await?;
        if let Some(plugins) = &self.plugins {
            // Start tasks are detached.
            plugins.bootstrap().await;
        }
        Ok(())
    }

    /// Close the transport. The read loop stops instead of reconnecting.
    pub async fn close(&self) -> Result<(), DriverError> {
        self.closing.store(true, Ordering::SeqCst);
        let mut writer = self.writer.lock().await;
        if let Some(sink) = writer.as_mut() {
            if let Err(e) = sink.close().await {
                self.closing.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        }
        *writer = None;
        self.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    /// Drain each connection and reconnect after it drops.
    ///
    /// Returns `Ok` once the client is closed. A failing connect-phase hook
    /// ends the loop with its error.
    async fn read_loop(self: Arc<Self>, handler: Arc<dyn EventHandler>) -> Result<(), DriverError> {
        loop {
            let source = self.reader.lock().await.take();
            if let Some(mut source) = source {
                while let Some(message) = source.next().await {
                    match message {
                        Ok(Message::Text(text)) => {
                            if let Err(e) = self.dispatch(text.as_str(), &handler).await {
                                error!(error = %e, "Lifecycle hook failed, stopping");
                                return Err(e);
                            }
                        }
                        Ok(Message::Close(frame)) => debug!(?frame, "Close frame received"),
                        Ok(_) => {}
                        Err(e) => {
                            warn!(error = %e, "WebSocket read failed");
                            break;
                        }
                    }
                }
                if self.closing.load(Ordering::SeqCst) {
                    debug!("Read loop stopped after close");
                    return Ok(());
                }
                self.handle_disconnect().await;
                tokio::time::sleep(self.timing.reconnect_delay).await;
            }
            if self.closing.load(Ordering::SeqCst) {
                return Ok(());
            }
            if let Err(e) = self.connect().await {
                error!(error = %e, "Reconnect failed, stopping");
                return Err(e);
            }
        }
    }

    /// Deregister identities, fail pending calls and run the disconnect hooks.
    pub(crate) async fn handle_disconnect(&self) {
        self.set_state(ConnectionState::Disconnected);
        *self.writer.lock().await = None;
        for identity in &self.self_ids {
            self.callers().delete(*identity);
        }
        let dropped = self.pending.drop_all();
        warn!(url = %self.url, dropped, "WebSocket connection lost");
        self.hooks.on_disconnected(&self.self_ids).await;
    }

    /// Route one text frame. Only a failing identity-connected hook is an error.
    pub(crate) async fn dispatch(
        self: &Arc<Self>,
        text: &str,
        handler: &Arc<dyn EventHandler>,
    ) -> Result<(), DriverError> {
        let frame: Value = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Ignoring frame that is not valid JSON");
                return Ok(());
            }
        };

        match InboundFrame::classify(&frame) {
            InboundFrame::Response(response) => {
                let echo = response.echo();
                debug!(echo, "Received API response: {}", text.trim());
                if !self.pending.deliver(echo, response) {
                    debug!(echo, "No pending call for response");
                }
            }
            InboundFrame::Heartbeat => trace!("Heartbeat received"),
            InboundFrame::IdentityConnect(identity) => {
                self.register(identity);
                info!(identity, "Connected to WebSocket server: {}", self.url);
                self.hooks.on_identity_connected(identity).await?;
            }
            InboundFrame::Event => {
                debug!("Received event: {}", text);
                let caller: Arc<dyn ApiCaller> = self.clone();
                handler.handle_event(text, caller);
            }
        }
        Ok(())
    }

    fn register(self: &Arc<Self>, identity: Identity) {
        let caller: Arc<dyn ApiCaller> = self.clone();
        self.callers().store(identity, caller);
    }

    async fn write(&self, payload: String) -> Result<(), ApiError> {
        let mut writer = self.writer.lock().await;
        let sink = writer
            .as_mut()
            .ok_or_else(|| ApiError::Write("not connected".to_string()))?;
        sink.send(Message::Text(payload.into()))
            .await
            .map_err(|e| ApiError::Write(e.to_string()))
    }
}

#[async_trait]
impl ApiCaller for WsClient {
    async fn call_api(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        request.echo = self.next_echo();
        let echo = request.echo;
        let payload = serde_json::to_string(&request)?;

        let rx = self.pending.allocate(echo);
        if let Err(e) = self.write(payload).await {
            self.pending.remove(echo);
            warn!(echo, action = %request.action, error = %e, "Failed to send API request");
            return Err(e);
        }
        debug!(echo, action = %request.action, "Sent API request");

        match tokio::time::timeout(self.timing.api_timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ApiError::BrokenPipe),
            Err(_) => {
                self.pending.remove(echo);
                Err(ApiError::DeadlineExceeded)
            }
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
