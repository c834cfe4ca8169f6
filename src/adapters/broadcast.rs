//! Broadcast transport - one event stream fanned out to many peers.
//!
//! Each peer owns a small outbound buffer drained by its own writer task, so
//! a slow peer only loses its own messages and never delays the others.
//! Peers whose channel is closed are dropped from the set on the next send.
//!
//! With the `websocket` feature, `connect` starts an axum WebSocket server on
//! `host:port`; every socket becomes a peer and text frames it sends are
//! parsed as commands. Without the feature, or when the server cannot bind,
//! `connect` logs a warning and the adapter only serves peers attached with
//! [`BroadcastAdapter::attach_peer`].

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use super::{CommandInbox, UiAdapter};
use crate::schema::{BatchEnvelope, UiCommand, UiEvent};
use crate::types::Result;

/// Outbound messages buffered per peer before that peer starts losing them.
pub const PEER_BUFFER: usize = 256;

/// Identifies one connected peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Peer set and inbound command buffer, shared with server tasks.
#[derive(Debug, Default)]
struct PeerHub {
    peers: Mutex<HashMap<PeerId, mpsc::Sender<String>>>,
    next_peer: AtomicU64,
    inbox: CommandInbox,
}

impl PeerHub {
    fn attach(&self) -> (PeerId, mpsc::Receiver<String>) {
        let id = PeerId(self.next_peer.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(PEER_BUFFER);
        let total = {
            let mut peers = self.lock_peers();
            peers.insert(id, tx);
            peers.len()
        };
        tracing::debug!(peer = %id, total, "Peer connected");
        (id, rx)
    }

    fn detach(&self, id: PeerId) -> bool {
        let (removed, total) = {
            let mut peers = self.lock_peers();
            (peers.remove(&id).is_some(), peers.len())
        };
        if removed {
            tracing::debug!(peer = %id, total, "Peer disconnected");
        }
        removed
    }

    fn broadcast(&self, message: &str) {
        let peers: Vec<(PeerId, mpsc::Sender<String>)> = self
            .lock_peers()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        for (id, tx) in peers {
            match tx.try_send(message.to_string()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(peer = %id, "Peer buffer full, message dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    self.detach(id);
                }
            }
        }
    }

    fn push_inbound(&self, text: &str) {
        match UiCommand::from_json(text) {
            Ok(command) => self.inbox.push(command),
            Err(err) => tracing::warn!(error = %err, "Received invalid command from peer"),
        }
    }

    fn lock_peers(&self) -> std::sync::MutexGuard<'_, HashMap<PeerId, mpsc::Sender<String>>> {
        self.peers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug)]
pub struct BroadcastAdapter {
    host: String,
    port: u16,
    hub: Arc<PeerHub>,
    server: Mutex<Option<CancellationToken>>,
}

impl BroadcastAdapter {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            hub: Arc::new(PeerHub::default()),
            server: Mutex::new(None),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Register an in-process peer; it receives every broadcast message.
    pub fn attach_peer(&self) -> (PeerId, mpsc::Receiver<String>) {
        self.hub.attach()
    }

    pub fn detach_peer(&self, id: PeerId) -> bool {
        self.hub.detach(id)
    }

    pub fn peer_count(&self) -> usize {
        self.hub.lock_peers().len()
    }

    /// Feed a raw inbound message from a peer; invalid commands are dropped.
    pub fn push_inbound(&self, text: &str) {
        self.hub.push_inbound(text);
    }

    fn server_slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.server
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(feature = "websocket")]
    async fn start_server(&self) {
        let listener = match tokio::net::TcpListener::bind((self.host.as_str(), self.port)).await {
            Ok(listener) => listener,
            Err(err) => {
                tracing::warn!(
                    host = %self.host,
                    port = self.port,
                    error = %err,
                    "WebSocket server failed to start, serving attached peers only"
                );
                return;
            }
        };

        let cancel = CancellationToken::new();
        *self.server_slot() = Some(cancel.clone());
        tracing::info!("WebSocket server started on ws://{}:{}", self.host, self.port);
        tokio::spawn(ws::serve(listener, self.hub.clone(), cancel));
    }

    #[cfg(not(feature = "websocket"))]
    async fn start_server(&self) {
        tracing::warn!(
            host = %self.host,
            port = self.port,
            "WebSocket support not compiled in (enable the `websocket` feature), serving attached peers only"
        );
    }
}

#[async_trait]
impl UiAdapter for BroadcastAdapter {
    fn name(&self) -> &str {
        "websocket"
    }

    async fn connect(&self) -> Result<()> {
        if self.hub.inbox.is_connected() {
            return Ok(());
        }
        self.hub.inbox.set_connected(true);
        self.start_server().await;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.hub.inbox.set_connected(false);
        let server = self.server_slot().take();
        if let Some(cancel) = server {
            cancel.cancel();
            tracing::info!("WebSocket server stopped");
        }
        Ok(())
    }

    async fn emit(&self, event: &UiEvent) {
        if self.peer_count() == 0 {
            return;
        }
        match event.to_json() {
            Ok(message) => self.hub.broadcast(&message),
            Err(err) => tracing::warn!(event_type = %event.event_type, error = %err, "Failed to encode event"),
        }
    }

    async fn emit_batch(&self, events: &[UiEvent]) {
        if self.peer_count() == 0 || events.is_empty() {
            return;
        }
        match BatchEnvelope::encode(events) {
            Ok(message) => self.hub.broadcast(&message),
            Err(err) => tracing::warn!(error = %err, "Failed to encode event batch"),
        }
    }

    fn commands(&self) -> BoxStream<'static, UiCommand> {
        self.hub.inbox.stream()
    }
}

#[cfg(feature = "websocket")]
mod ws {
    use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
    use axum::extract::State;
    use axum::response::Response;
    use axum::routing::get;
    use axum::Router;
    use futures::{SinkExt, StreamExt};
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    use super::PeerHub;

    pub(super) async fn serve(listener: TcpListener, hub: Arc<PeerHub>, cancel: CancellationToken) {
        let app = Router::new().route("/", get(upgrade)).with_state(hub);
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await;
        if let Err(err) = result {
            tracing::warn!(error = %err, "WebSocket server exited");
        }
    }

    async fn upgrade(ws: WebSocketUpgrade, State(hub): State<Arc<PeerHub>>) -> Response {
        ws.on_upgrade(move |socket| serve_peer(socket, hub))
    }

    async fn serve_peer(socket: WebSocket, hub: Arc<PeerHub>) {
        let (id, mut outbound) = hub.attach();
        let (mut sink, mut stream) = socket.split();

        let writer = tokio::spawn(async move {
            while let Some(message) = outbound.recv().await {
                if sink.send(Message::Text(message.into())).await.is_err() {
                    break;
                }
            }
        });

        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => hub.push_inbound(text.as_str()),
                Message::Close(_) => break,
                _ => {}
            }
        }

        writer.abort();
        hub.detach(id);
    }
}
