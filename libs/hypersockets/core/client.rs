use crate::config::ConnectionConfig;
use crate::connection_state::{
    AtomicConnectionPhase, AtomicMetrics, ConnectionPhase, ConnectionStatus,
};
use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// How often [`ConnectionManager::next_event`] polls the event channel
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Events published by the connection manager, in transport order
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent<T> {
    /// Handshake started for a new URL
    Connecting,
    /// Handshake completed
    Connected,
    /// A data frame arrived (decoded, or raw when decoding failed)
    Message(Decoded<T>),
    /// Transport error; a `Disconnected` usually follows
    Error(String),
    /// Connection closed (peer, transport failure or local teardown)
    Disconnected,
}

/// Client metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub frames_received: u64,
    pub decode_fallbacks: u64,
    pub connections_opened: u64,
    pub close_requests: u64,
    pub phase: ConnectionPhase,
    pub status: ConnectionStatus,
}

/// Lifecycle step applied to the shared state by a connection task
enum Transition<T> {
    Connecting,
    Opened,
    Frame(Decoded<T>),
    Failed(String),
    Closed,
}

/// State shared between the manager and its connection task
///
/// Every write goes through [`SharedConnection::apply`], which drops writes
/// from connections that have been superseded. The generation check and the
/// publish happen under one lock, so once `supersede` returns no event from
/// an older connection can be observed.
struct SharedConnection<T> {
    generation: AtomicU64,
    publish: Mutex<()>,
    phase: AtomicConnectionPhase,
    status: RwLock<ConnectionStatus>,
    latest: RwLock<Option<Decoded<T>>>,
    metrics: AtomicMetrics,
    event_tx: Sender<ClientEvent<T>>,
}

impl<T: Clone> SharedConnection<T> {
    fn new(event_tx: Sender<ClientEvent<T>>) -> Self {
        Self {
            generation: AtomicU64::new(0),
            publish: Mutex::new(()),
            phase: AtomicConnectionPhase::new(ConnectionPhase::Idle),
            status: RwLock::new(ConnectionStatus::INITIAL),
            latest: RwLock::new(None),
            metrics: AtomicMetrics::new(),
            event_tx,
        }
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidate the running connection and return the new generation
    fn supersede(&self) -> u64 {
        let _guard = self.publish.lock();
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Apply a transition if `generation` is still current
    ///
    /// Returns `false` when the write was discarded as stale.
    fn apply(&self, generation: u64, transition: Transition<T>) -> bool {
        let _guard = self.publish.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }

        let event = match transition {
            Transition::Connecting => {
                self.phase.set(ConnectionPhase::Connecting);
                ClientEvent::Connecting
            }
            Transition::Opened => {
                self.phase.set(ConnectionPhase::Open);
                let mut status = self.status.write();
                *status = status.opened();
                ClientEvent::Connected
            }
            Transition::Frame(decoded) => {
                *self.latest.write() = Some(decoded.clone());
                ClientEvent::Message(decoded)
            }
            Transition::Failed(reason) => {
                self.phase.set(ConnectionPhase::Errored);
                let mut status = self.status.write();
                *status = status.errored();
                ClientEvent::Error(reason)
            }
            Transition::Closed => {
                // close is processed at most once per connection
                let phase = self.phase.get();
                if matches!(phase, ConnectionPhase::Closed | ConnectionPhase::Idle) {
                    return true;
                }
                self.phase.set(ConnectionPhase::Closed);
                let mut status = self.status.write();
                *status = status.closed();
                ClientEvent::Disconnected
            }
        };

        // The receiver lives in the manager; a send error only means it is gone.
        let _ = self.event_tx.send(event);
        true
    }
}

/// Handle to the running connection task
struct ActiveConnection {
    close_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ActiveConnection {
    fn request_close(&mut self) -> bool {
        match self.close_tx.take() {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }
}

/// Owns at most one WebSocket connection at a time
///
/// The manager exposes the `{connected, error}` status, the most recent
/// decoded frame, and an ordered event channel. A connection is opened by
/// assigning a URL; assigning a different URL (or `None`) first closes the
/// current connection, exactly once, and waits for it to finish. Dropping
/// the manager closes the connection as well.
///
/// # Type Parameters
/// - `D`: FrameDecoder implementation
pub struct ConnectionManager<D>
where
    D: FrameDecoder,
{
    config: Arc<ConnectionConfig<D>>,
    shared: Arc<SharedConnection<D::Output>>,
    event_rx: Receiver<ClientEvent<D::Output>>,
    url: Option<String>,
    active: Option<ActiveConnection>,
}

impl<D> ConnectionManager<D>
where
    D: FrameDecoder,
{
    /// Create a manager with no URL
    ///
    /// This is called by the builder's `build()` method.
    pub(crate) fn new(config: ConnectionConfig<D>) -> Self {
        let (event_tx, event_rx) = unbounded();

        Self {
            config: Arc::new(config),
            shared: Arc::new(SharedConnection::new(event_tx)),
            event_rx,
            url: None,
            active: None,
        }
    }

    pub fn config(&self) -> &ConnectionConfig<D> {
        &self.config
    }

    /// Currently assigned URL, if any
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Get current `{connected, error}` status
    #[inline]
    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status.read()
    }

    /// Get current lifecycle phase
    #[inline]
    pub fn phase(&self) -> ConnectionPhase {
        self.shared.phase.get()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.status().connected
    }

    /// Whether a connection task is currently owned by this manager
    pub fn has_active_connection(&self) -> bool {
        self.active.is_some()
    }

    /// Most recent frame, decoded or raw; `None` before the first frame
    pub fn latest_message(&self) -> Option<Decoded<D::Output>> {
        self.shared.latest.read().clone()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        let metrics = &self.shared.metrics;
        Metrics {
            frames_received: metrics.frames_received(),
            decode_fallbacks: metrics.decode_fallbacks(),
            connections_opened: metrics.connections_opened(),
            close_requests: metrics.close_requests(),
            phase: self.phase(),
            status: self.status(),
        }
    }

    /// Assign the endpoint URL
    ///
    /// - same URL as now: no-op
    /// - `None`: close the current connection (if any) and stay closed
    /// - new URL: close the current connection, then open a fresh one
    pub async fn set_url(&mut self, url: Option<String>) -> Result<()> {
        self.replace(url, false).await
    }

    /// Shorthand for `set_url(Some(url))`
    pub async fn open(&mut self, url: impl Into<String>) -> Result<()> {
        self.set_url(Some(url.into())).await
    }

    /// Tear down and re-open even when the URL did not change
    ///
    /// Used after a peer close, where assigning the same URL would be a no-op.
    pub async fn reopen(&mut self, url: impl Into<String>) -> Result<()> {
        self.replace(Some(url.into()), true).await
    }

    /// Close the current connection and forget the URL
    pub async fn close(&mut self) {
        self.teardown().await;
        self.url = None;
    }

    async fn replace(&mut self, url: Option<String>, force: bool) -> Result<()> {
        if !force && self.url == url {
            debug!("[{}] URL unchanged, keeping current connection", self.config.label);
            return Ok(());
        }

        if let Some(ref url) = url {
            validate_ws_url(url)?;
        }

        self.teardown().await;
        self.url = url;

        match self.url.clone() {
            Some(url) => self.spawn_connection(url),
            None => warn!("[{}] WebSocket URL is not set, not connecting", self.config.label),
        }

        Ok(())
    }

    fn spawn_connection(&mut self, url: String) {
        let generation = self.shared.current_generation();
        let (close_tx, close_rx) = oneshot::channel();

        let handle = {
            let config = Arc::clone(&self.config);
            let shared = Arc::clone(&self.shared);

            tokio::spawn(async move {
                run_connection(url, generation, config, shared, close_rx).await;
            })
        };

        self.active = Some(ActiveConnection {
            close_tx: Some(close_tx),
            handle,
        });
    }

    /// Close the active connection exactly once and wait for its task
    async fn teardown(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        // Nothing the old connection does from here on reaches the shared state.
        let generation = self.shared.supersede();

        if active.request_close() {
            self.shared.metrics.increment_close_requests();
        }

        match tokio::time::timeout(self.config.close_timeout, &mut active.handle).await {
            Ok(_) => debug!("[{}] Previous connection task finished", self.config.label),
            Err(_) => {
                warn!(
                    "[{}] Connection did not close within {:?}, aborting task",
                    self.config.label, self.config.close_timeout
                );
                active.handle.abort();
            }
        }

        self.shared.apply(generation, Transition::Closed);
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent<D::Output>> {
        self.event_rx.try_recv().ok()
    }

    /// Take every queued event, in order
    pub fn drain_events(&self) -> Vec<ClientEvent<D::Output>> {
        self.event_rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next event
    pub async fn next_event(&self, timeout: Duration) -> Option<ClientEvent<D::Output>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.try_recv_event() {
                return Some(event);
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(EVENT_POLL_INTERVAL).await;
        }
    }
}

impl<D> Drop for ConnectionManager<D>
where
    D: FrameDecoder,
{
    fn drop(&mut self) {
        if let Some(mut active) = self.active.take() {
            self.shared.supersede();
            if active.request_close() {
                self.shared.metrics.increment_close_requests();
                debug!("[{}] Manager dropped, closing connection", self.config.label);
            }
        }
    }
}

/// Connection task: handshake, then read frames until closed
async fn run_connection<D>(
    url: String,
    generation: u64,
    config: Arc<ConnectionConfig<D>>,
    shared: Arc<SharedConnection<D::Output>>,
    mut close_rx: oneshot::Receiver<()>,
) where
    D: FrameDecoder,
{
    let label = config.label.as_str();
    shared.apply(generation, Transition::Connecting);
    debug!("[{}] Connecting to {}", label, redact_url(&url));

    let handshake = tokio::time::timeout(config.connect_timeout, connect_async(url.as_str()));

    let ws_stream = tokio::select! {
        _ = &mut close_rx => {
            debug!("[{}] Closed before handshake completed", label);
            return;
        }
        result = handshake => match result {
            Ok(Ok((ws_stream, _response))) => ws_stream,
            Ok(Err(e)) => {
                error!("[{}] Failed to connect: {}", label, e);
                shared.apply(generation, Transition::Failed(e.to_string()));
                shared.apply(generation, Transition::Closed);
                return;
            }
            Err(_) => {
                let reason = format!("handshake timed out after {:?}", config.connect_timeout);
                error!("[{}] Failed to connect: {}", label, reason);
                shared.apply(generation, Transition::Failed(reason));
                shared.apply(generation, Transition::Closed);
                return;
            }
        }
    };

    shared.metrics.increment_opened();
    if shared.apply(generation, Transition::Opened) {
        info!("[{}] WebSocket connected to {}", label, redact_url(&url));
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = &mut close_rx => {
                debug!("[{}] Close requested", label);
                if let Err(e) = write.close().await {
                    debug!("[{}] Close handshake failed: {}", label, e);
                    return;
                }
                // Wait for the peer's close echo; frames read meanwhile are discarded
                let echo = async {
                    while let Some(Ok(msg)) = read.next().await {
                        if msg.is_close() {
                            break;
                        }
                    }
                };
                if tokio::time::timeout(config.close_timeout / 2, echo).await.is_err() {
                    debug!("[{}] No close echo from peer", label);
                }
                return;
            }
            frame = read.next() => match frame {
                Some(Ok(msg)) => {
                    let Some(ws_msg) = tungstenite_to_ws_message(msg) else {
                        continue;
                    };
                    shared.metrics.increment_received();

                    let decoded = config.decoder.decode_frame(&ws_msg);
                    if let Decoded::RawFallback(ref raw) = decoded {
                        shared.metrics.increment_fallbacks();
                        warn!(
                            "[{}] Error parsing frame, publishing raw payload ({} bytes)",
                            label,
                            raw.len()
                        );
                    }
                    shared.apply(generation, Transition::Frame(decoded));
                }
                Some(Err(e)) => {
                    error!("[{}] WebSocket error: {}", label, e);
                    shared.apply(generation, Transition::Failed(e.to_string()));
                    shared.apply(generation, Transition::Closed);
                    return;
                }
                None => {
                    warn!("[{}] WebSocket disconnected", label);
                    shared.apply(generation, Transition::Closed);
                    return;
                }
            }
        }
    }
}

fn validate_ws_url(url: &str) -> Result<()> {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        Ok(())
    } else {
        Err(HyperSocketError::Configuration(format!(
            "WebSocket URL must start with ws:// or wss://, got '{}'",
            redact_url(url)
        )))
    }
}

/// Drop the query string so credentials never reach the logs
pub fn redact_url(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

/// Convert tungstenite Message to WsMessage
fn tungstenite_to_ws_message(msg: Message) -> Option<WsMessage> {
    match msg {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}
