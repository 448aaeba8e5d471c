//! # Real-Time Relay Server
//!
//! The single central broadcast point connecting client machines and admin
//! views. Every party opens one long-lived WebSocket to the relay; the relay
//! acknowledges the connection and from then on only rebroadcasts what it
//! receives - it never inspects, filters or reorders payloads.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Relay Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      RelayServer (Axum)                         │   │
//! │  │                                                                 │   │
//! │  │  /ws endpoint ──▶ WebSocket upgrade                            │   │
//! │  │  /health      ──▶ { status, timestamp, connections }           │   │
//! │  │                        │                                        │   │
//! │  │                        ▼                                        │   │
//! │  │              ┌─────────────────┐                                │   │
//! │  │              │ Party connection│ ◀───── one task per            │   │
//! │  │              │    handler      │        connected party         │   │
//! │  │              └────────┬────────┘                                │   │
//! │  │                       │                                         │   │
//! │  │         ┌─────────────┼─────────────┐                          │   │
//! │  │         ▼             ▼             ▼                          │   │
//! │  │  ┌──────────┐  ┌──────────┐  ┌──────────┐                      │   │
//! │  │  │ Machine  │  │ Admin    │  │ Admin    │   Connected          │   │
//! │  │  │ view     │  │ view #1  │  │ view #2  │   parties            │   │
//! │  │  └──────────┘  └──────────┘  └──────────┘                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Message Flow:                                                          │
//! │  ─────────────                                                          │
//! │  1. Party connects, relay sends connection:established                 │
//! │  2. client:resource-update ──► admin:resource-update to every OTHER    │
//! │     party (the origin does not receive its own echo)                   │
//! │  3. admin:refill ──► client:refill-update to every party               │
//! │  4. Periodic pings keep connections alive                              │
//! │                                                                         │
//! │  Delivery is fire-and-forget: lagging receivers drop messages, and     │
//! │  no ordering is guaranteed across the two event classes.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::protocol::RelayMessage;

// =============================================================================
// Constants
// =============================================================================

/// Default WebSocket port for the relay server.
pub const DEFAULT_RELAY_PORT: u16 = 3001;

/// Ping interval to keep connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum message size (1MB).
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

// =============================================================================
// Relay Configuration
// =============================================================================

/// Configuration for the relay server.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Port to listen on (0 picks a free port).
    pub port: u16,
    /// Bind address (default: 0.0.0.0).
    pub bind_addr: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            port: DEFAULT_RELAY_PORT,
            bind_addr: "0.0.0.0".to_string(),
        }
    }
}

impl RelayConfig {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Connected Party
// =============================================================================

/// A party (client view or admin view) connected to the relay.
#[derive(Debug, Clone)]
pub struct ConnectedParty {
    /// Relay-assigned party id.
    pub party_id: Uuid,
    /// Remote address.
    pub addr: SocketAddr,
    /// Connection time.
    pub connected_at: std::time::Instant,
}

/// A broadcast entry: the rebroadcast message plus enough routing context
/// to honor the no-self-echo rule for resource updates.
#[derive(Debug, Clone)]
struct Envelope {
    /// Party that emitted the original event.
    origin: Uuid,
    /// Whether the origin is excluded from delivery.
    exclude_origin: bool,
    /// The already-renamed outbound event.
    message: RelayMessage,
}

// =============================================================================
// Relay State
// =============================================================================

/// Shared state for the relay server.
pub struct RelayState {
    /// Connected parties.
    parties: RwLock<HashMap<Uuid, ConnectedParty>>,
    /// Broadcast channel fanning messages out to all connection tasks.
    broadcast_tx: broadcast::Sender<Envelope>,
}

impl RelayState {
    fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(256);
        RelayState {
            parties: RwLock::new(HashMap::new()),
            broadcast_tx,
        }
    }

    /// Queues a message for every connected party.
    fn broadcast(&self, envelope: Envelope) {
        // No receivers is fine - fire-and-forget
        let _ = self.broadcast_tx.send(envelope);
    }

    /// Returns the number of connected parties.
    pub async fn party_count(&self) -> usize {
        self.parties.read().await.len()
    }
}

// =============================================================================
// Relay Server
// =============================================================================

/// The relay server that manages WebSocket connections.
pub struct RelayServer {
    config: RelayConfig,
    state: Arc<RelayState>,
}

/// Handle for controlling a started relay server.
#[derive(Clone)]
pub struct RelayHandle {
    state: Arc<RelayState>,
    local_addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
}

impl RelayHandle {
    /// The address the relay actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the number of connected parties.
    pub async fn party_count(&self) -> usize {
        self.state.party_count().await
    }

    /// Shuts down the relay server.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Relay shutdown channel closed".into()))
    }
}

impl RelayServer {
    /// Creates a new relay server.
    pub fn new(config: RelayConfig) -> Self {
        RelayServer {
            config,
            state: Arc::new(RelayState::new()),
        }
    }

    /// Starts the relay server and returns a handle.
    pub async fn start(self) -> SyncResult<RelayHandle> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        // Build the router
        let app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone());

        // Bind the listener
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            SyncError::ConnectionFailed(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| SyncError::ConnectionFailed(e.to_string()))?;

        info!(addr = %local_addr, "Relay server started");

        let handle = RelayHandle {
            state: self.state.clone(),
            local_addr,
            shutdown_tx,
        };

        // Spawn the server
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                shutdown_rx.recv().await;
                info!("Relay server shutting down");
            })
            .await
            .ok();
        });

        Ok(handle)
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

/// Health probe payload - informational only.
#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    /// Milliseconds since the Unix epoch.
    timestamp: i64,
    /// Count of connected relay parties.
    connections: usize,
}

/// Health check endpoint.
async fn health_handler(State(state): State<Arc<RelayState>>) -> impl IntoResponse {
    Json(HealthStatus {
        status: "ok",
        timestamp: chrono::Utc::now().timestamp_millis(),
        connections: state.party_count().await,
    })
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayState>>,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    info!(addr = %addr, "New WebSocket connection");
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, addr))
}

/// Handles one party's WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<RelayState>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let party_id = Uuid::new_v4();

    // Register the party
    {
        let mut parties = state.parties.write().await;
        parties.insert(
            party_id,
            ConnectedParty {
                party_id,
                addr,
                connected_at: std::time::Instant::now(),
            },
        );
    }

    info!(party_id = %party_id, addr = %addr, "Party connected");

    // Subscribe to broadcasts BEFORE acknowledging, so a party that sees
    // connection:established is guaranteed to observe later rebroadcasts.
    let mut broadcast_rx = state.broadcast_tx.subscribe();

    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(64);

    // Outgoing message task
    let outgoing_handle = tokio::spawn(async move {
        while let Some(msg) = outgoing_rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Acknowledge the connection
    if let Ok(json) = RelayMessage::ConnectionEstablished.to_json() {
        if outgoing_tx.send(Message::Text(json.into())).await.is_err() {
            warn!(party_id = %party_id, "Failed to acknowledge connection");
            remove_party(&state, party_id).await;
            outgoing_handle.abort();
            return;
        }
    }

    // Broadcast forwarding task
    let forward_party_id = party_id;
    let outgoing_tx_clone = outgoing_tx.clone();
    let broadcast_handle = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(envelope) => {
                    if envelope.exclude_origin && envelope.origin == forward_party_id {
                        continue;
                    }
                    if let Ok(json) = envelope.message.to_json() {
                        if outgoing_tx_clone
                            .send(Message::Text(json.into()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(party_id = %forward_party_id, skipped, "Broadcast receiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Ping task
    let outgoing_tx_ping = outgoing_tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_interval = interval(PING_INTERVAL);
        loop {
            ping_interval.tick().await;
            if outgoing_tx_ping
                .send(Message::Ping(axum::body::Bytes::new()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Main receive loop
    loop {
        match receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => match RelayMessage::from_json(&text) {
                    Ok(relay_msg) => handle_party_message(&state, party_id, relay_msg),
                    Err(e) => {
                        debug!(party_id = %party_id, ?e, "Invalid message format");
                    }
                },
                Message::Binary(data) => match serde_json::from_slice::<RelayMessage>(&data) {
                    Ok(relay_msg) => handle_party_message(&state, party_id, relay_msg),
                    Err(e) => {
                        debug!(party_id = %party_id, ?e, "Invalid binary message");
                    }
                },
                Message::Pong(_) => {
                    // Connection is alive
                }
                Message::Ping(data) => {
                    // Respond with pong
                    let _ = outgoing_tx.send(Message::Pong(data)).await;
                }
                Message::Close(_) => {
                    info!(party_id = %party_id, "Party requested close");
                    break;
                }
            },
            Some(Err(e)) => {
                warn!(party_id = %party_id, ?e, "WebSocket error");
                break;
            }
            None => {
                info!(party_id = %party_id, "Party disconnected");
                break;
            }
        }
    }

    // Cleanup
    ping_handle.abort();
    broadcast_handle.abort();
    outgoing_handle.abort();
    remove_party(&state, party_id).await;
}

/// Routes an inbound event to its rebroadcast form.
///
/// The payload passes through untouched; only the event name changes.
fn handle_party_message(state: &RelayState, party_id: Uuid, msg: RelayMessage) {
    debug!(party_id = %party_id, msg_type = %msg.type_name(), "Received party message");

    match msg {
        RelayMessage::ClientResourceUpdate(update) => {
            // Machine announced a mutation: fan out to the OTHER parties.
            state.broadcast(Envelope {
                origin: party_id,
                exclude_origin: true,
                message: RelayMessage::AdminResourceUpdate(update),
            });
        }
        RelayMessage::AdminRefill(update) => {
            // Admin refill: every party, origin included, sees the result.
            state.broadcast(Envelope {
                origin: party_id,
                exclude_origin: false,
                message: RelayMessage::ClientRefillUpdate(update),
            });
        }
        other => {
            // Rebroadcast-only events arriving inbound are a client bug.
            debug!(
                party_id = %party_id,
                msg_type = %other.type_name(),
                "Ignoring unexpected inbound event"
            );
        }
    }
}

/// Removes a party from the connected list.
async fn remove_party(state: &RelayState, party_id: Uuid) {
    let mut parties = state.parties.write().await;
    if parties.remove(&party_id).is_some() {
        info!(party_id = %party_id, "Party removed");
    }
}

// =============================================================================
// Unit & Integration Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RefillUpdate, ResourceUpdate};
    use futures_util::StreamExt;
    use kava_core::{ResourceAmounts, MACHINE_SEED};
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

    #[test]
    fn test_relay_config_default() {
        let config = RelayConfig::default();
        assert_eq!(config.port, DEFAULT_RELAY_PORT);
        assert_eq!(config.bind_addr, "0.0.0.0");
    }

    #[test]
    fn test_relay_config_bind_address() {
        let config = RelayConfig {
            port: 9000,
            bind_addr: "127.0.0.1".to_string(),
        };
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
    }

    async fn start_test_relay() -> RelayHandle {
        let server = RelayServer::new(RelayConfig {
            port: 0,
            bind_addr: "127.0.0.1".to_string(),
        });
        server.start().await.unwrap()
    }

    async fn connect_party(handle: &RelayHandle) -> WsStream {
        let url = format!("ws://{}/ws", handle.local_addr());
        let (mut ws, _) = connect_async(&url).await.unwrap();
        // Consume the acknowledgment so the party is known to be registered
        assert_eq!(recv_relay(&mut ws).await, RelayMessage::ConnectionEstablished);
        ws
    }

    async fn recv_relay(ws: &mut WsStream) -> RelayMessage {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for relay message")
                .expect("stream ended")
                .expect("websocket error");
            if let WsMessage::Text(text) = frame {
                return RelayMessage::from_json(&text).unwrap();
            }
        }
    }

    async fn send_relay(ws: &mut WsStream, msg: &RelayMessage) {
        use futures_util::SinkExt;
        ws.send(WsMessage::Text(msg.to_json().unwrap().into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_resource_update_reaches_other_parties_unchanged() {
        let handle = start_test_relay().await;
        let mut machine = connect_party(&handle).await;
        let mut admin = connect_party(&handle).await;

        let update = ResourceUpdate {
            inventory: MACHINE_SEED,
            timestamp: 1_700_000_000_000,
        };
        send_relay(&mut machine, &RelayMessage::ClientResourceUpdate(update)).await;

        // The other party observes the rebroadcast with an unchanged payload
        match recv_relay(&mut admin).await {
            RelayMessage::AdminResourceUpdate(received) => assert_eq!(received, update),
            other => panic!("expected admin:resource-update, got {}", other.type_name()),
        }

        // The origin does not receive its own echo (keepalive pings aside)
        let echo = tokio::time::timeout(Duration::from_millis(200), recv_relay(&mut machine)).await;
        assert!(echo.is_err(), "origin received its own resource update");
    }

    #[tokio::test]
    async fn test_refill_reaches_every_party() {
        let handle = start_test_relay().await;
        let mut admin = connect_party(&handle).await;
        let mut machine = connect_party(&handle).await;

        let update = RefillUpdate {
            amounts: ResourceAmounts {
                water: 300,
                coffee: 28,
                ..Default::default()
            },
            timestamp: 1_700_000_000_000,
        };
        send_relay(&mut admin, &RelayMessage::AdminRefill(update)).await;

        // Refill updates go to every connected party, origin included
        match recv_relay(&mut machine).await {
            RelayMessage::ClientRefillUpdate(received) => assert_eq!(received, update),
            other => panic!("expected client:refill-update, got {}", other.type_name()),
        }
        match recv_relay(&mut admin).await {
            RelayMessage::ClientRefillUpdate(received) => assert_eq!(received, update),
            other => panic!("expected client:refill-update, got {}", other.type_name()),
        }
    }

    #[tokio::test]
    async fn test_party_count_tracks_connections() {
        let handle = start_test_relay().await;
        assert_eq!(handle.party_count().await, 0);

        let _a = connect_party(&handle).await;
        let _b = connect_party(&handle).await;
        assert_eq!(handle.party_count().await, 2);
    }

    #[tokio::test]
    async fn test_health_probe_reports_connections() {
        let handle = start_test_relay().await;
        let _a = connect_party(&handle).await;

        let url = format!("http://{}/health", handle.local_addr());
        let body: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connections"], 1);
        assert!(body["timestamp"].as_i64().unwrap() > 0);
    }
}
