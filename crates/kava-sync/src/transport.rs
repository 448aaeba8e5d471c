//! # WebSocket Transport
//!
//! Relay client with automatic reconnection and backoff. One `Transport`
//! owns one long-lived bidirectional channel to the relay; the cloneable
//! [`TransportHandle`] is the connection object that gets injected into the
//! inventory managers - there is no process-wide connection singleton.
//!
//! ## Connection Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    WebSocket Connection States                          │
//! │                                                                         │
//! │  ┌────────────┐    connect()    ┌────────────┐                         │
//! │  │Disconnected│ ──────────────► │ Connecting │                         │
//! │  └────────────┘                 └─────┬──────┘                         │
//! │        ▲                              │                                 │
//! │        │                    success   │   failure                       │
//! │        │                        ┌─────┴─────┐                          │
//! │        │                        ▼           ▼                           │
//! │        │              ┌────────────┐  ┌────────────┐                   │
//! │        │              │ Connected  │  │ Backoff    │                   │
//! │        │              └─────┬──────┘  └─────┬──────┘                   │
//! │        │                    │               │                           │
//! │        │              disconnect/error      │  timer expired            │
//! │        │                    │               │                           │
//! │        │                    ▼               │                           │
//! │        │              ┌────────────┐        │                           │
//! │        └───────────── │Reconnecting│ ◄──────┘                          │
//! │                       └────────────┘                                    │
//! │                                                                         │
//! │  BACKOFF STRATEGY (Exponential with Jitter)                            │
//! │  ───────────────────────────────────────────                           │
//! │  Attempt 1: 500ms                                                       │
//! │  Attempt 2: 1s                                                          │
//! │  Attempt 3: 2s                                                          │
//! │  ...                                                                    │
//! │  Max delay: 60s, retries unbounded by default                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::protocol::RelayMessage;

// =============================================================================
// Transport State
// =============================================================================

/// Connection state for the WebSocket transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected.
    Disconnected,
    /// Attempting to connect.
    Connecting,
    /// Connected and ready.
    Connected,
    /// Waiting before reconnection attempt.
    Backoff,
    /// Reconnection in progress.
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Backoff => write!(f, "backoff"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

// =============================================================================
// Transport Configuration
// =============================================================================

/// Configuration for the WebSocket transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Relay WebSocket URL to connect to.
    pub url: String,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Initial backoff duration.
    pub initial_backoff: Duration,

    /// Maximum backoff duration (the cap on the exponential curve).
    pub max_backoff: Duration,

    /// Maximum reconnection attempts (0 = infinite).
    pub max_retries: u32,

    /// Ping interval for keepalive.
    pub ping_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            url: String::new(),
            connect_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
            max_retries: 0, // Infinite
            ping_interval: Duration::from_secs(30),
        }
    }
}

// =============================================================================
// Transport Handle
// =============================================================================

/// The explicitly owned connection object injected into the managers.
///
/// Sends are fire-and-forget from the managers' point of view: a dropped or
/// disconnected relay never fails a ledger operation.
#[derive(Clone)]
pub struct TransportHandle {
    /// Sender for outgoing messages.
    outgoing_tx: mpsc::Sender<RelayMessage>,

    /// Current connection state.
    state: Arc<RwLock<ConnectionState>>,

    /// Shutdown signal.
    shutdown_tx: mpsc::Sender<()>,
}

impl TransportHandle {
    /// Sends a message through the transport.
    pub async fn send(&self, message: RelayMessage) -> SyncResult<()> {
        self.outgoing_tx
            .send(message)
            .await
            .map_err(|_| SyncError::ChannelError("Failed to send message".into()))
    }

    /// Returns the current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Returns true if currently connected.
    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Connected
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Failed to send shutdown signal".into()))
    }

    /// A handle backed by a bare channel instead of a socket.
    ///
    /// Everything sent through it appears on the returned receiver, which is
    /// what manager tests observe instead of a live relay.
    pub fn detached() -> (TransportHandle, mpsc::Receiver<RelayMessage>) {
        let (outgoing_tx, outgoing_rx) = mpsc::channel::<RelayMessage>(64);
        let (shutdown_tx, _shutdown_rx) = mpsc::channel::<()>(1);
        let handle = TransportHandle {
            outgoing_tx,
            state: Arc::new(RwLock::new(ConnectionState::Connected)),
            shutdown_tx,
        };
        (handle, outgoing_rx)
    }
}

// =============================================================================
// WebSocket Transport
// =============================================================================

/// WebSocket transport with automatic reconnection.
///
/// ## Usage
/// ```rust,ignore
/// let config = TransportConfig {
///     url: "ws://localhost:3001/ws".into(),
///     ..Default::default()
/// };
///
/// let (handle, mut incoming_rx) = Transport::spawn(config);
///
/// // Send events
/// handle.send(RelayMessage::resource_update(inventory)).await?;
///
/// // Receive rebroadcasts
/// while let Some(msg) = incoming_rx.recv().await {
///     println!("Received: {}", msg.type_name());
/// }
/// ```
pub struct Transport {
    config: TransportConfig,
    state: Arc<RwLock<ConnectionState>>,
    outgoing_rx: mpsc::Receiver<RelayMessage>,
    incoming_tx: mpsc::Sender<RelayMessage>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl Transport {
    /// Creates a new transport and spawns its background task.
    ///
    /// Returns a handle for sending messages and a receiver for incoming
    /// rebroadcasts.
    pub fn spawn(config: TransportConfig) -> (TransportHandle, mpsc::Receiver<RelayMessage>) {
        let (outgoing_tx, outgoing_rx) = mpsc::channel::<RelayMessage>(100);
        let (incoming_tx, incoming_rx) = mpsc::channel::<RelayMessage>(100);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let state = Arc::new(RwLock::new(ConnectionState::Disconnected));

        let transport = Transport {
            config,
            state: state.clone(),
            outgoing_rx,
            incoming_tx,
            shutdown_rx,
        };

        // Spawn background task
        tokio::spawn(transport.run());

        let handle = TransportHandle {
            outgoing_tx,
            state,
            shutdown_tx,
        };

        (handle, incoming_rx)
    }

    /// Main transport loop.
    async fn run(mut self) {
        info!(url = %self.config.url, "Transport starting");

        let mut backoff = self.create_backoff();
        let mut retry_count = 0u32;

        loop {
            // Check for shutdown
            if self.shutdown_rx.try_recv().is_ok() {
                info!("Transport received shutdown signal");
                break;
            }

            // Try to connect
            *self.state.write().await = ConnectionState::Connecting;

            match self.connect_with_timeout().await {
                Ok(ws_stream) => {
                    info!("Relay connected");
                    *self.state.write().await = ConnectionState::Connected;

                    // Reset backoff on successful connection
                    backoff.reset();
                    retry_count = 0;

                    // Run the connection loop
                    if let Err(e) = self.connection_loop(ws_stream).await {
                        warn!(?e, "Connection loop ended");
                    } else {
                        // Clean shutdown from inside the loop
                        break;
                    }
                }
                Err(e) => {
                    error!(?e, "Failed to connect");
                }
            }

            // Connection lost or failed - enter backoff
            *self.state.write().await = ConnectionState::Backoff;

            // Check retry limit
            if self.config.max_retries > 0 {
                retry_count += 1;
                if retry_count >= self.config.max_retries {
                    error!(
                        max_retries = self.config.max_retries,
                        "Max reconnection attempts reached"
                    );
                    break;
                }
            }

            // Wait for backoff duration
            if let Some(duration) = backoff.next_backoff() {
                debug!(?duration, attempt = retry_count, "Waiting before reconnect");

                tokio::select! {
                    _ = tokio::time::sleep(duration) => {
                        *self.state.write().await = ConnectionState::Reconnecting;
                    }
                    _ = self.shutdown_rx.recv() => {
                        info!("Shutdown during backoff");
                        break;
                    }
                }
            } else {
                // Backoff exhausted (shouldn't happen with infinite backoff)
                error!("Backoff exhausted");
                break;
            }
        }

        *self.state.write().await = ConnectionState::Disconnected;
        info!("Transport stopped");
    }

    /// Connects with timeout.
    async fn connect_with_timeout(
        &self,
    ) -> SyncResult<WebSocketStream<MaybeTlsStream<TcpStream>>> {
        let connect_future = connect_async(&self.config.url);

        match timeout(self.config.connect_timeout, connect_future).await {
            Ok(Ok((ws_stream, response))) => {
                debug!(status = ?response.status(), "WebSocket handshake complete");
                Ok(ws_stream)
            }
            Ok(Err(e)) => Err(SyncError::from(e)),
            Err(_) => Err(SyncError::Timeout(self.config.connect_timeout.as_secs())),
        }
    }

    /// Main connection loop - handles sending and receiving.
    ///
    /// Returns `Ok(())` only on an explicit shutdown; every other exit is a
    /// connection loss that the outer loop answers with a reconnect.
    async fn connection_loop(
        &mut self,
        ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    ) -> SyncResult<()> {
        let (write, mut read) = ws_stream.split();
        let write = Arc::new(Mutex::new(write));

        let mut ping_interval = tokio::time::interval(self.config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Handle outgoing messages
                Some(msg) = self.outgoing_rx.recv() => {
                    let json = msg.to_json()?;
                    debug!(msg_type = %msg.type_name(), "Sending message");
                    let mut writer = write.lock().await;
                    writer.send(WsMessage::Text(json.into())).await?;
                }

                // Handle incoming messages
                Some(result) = read.next() => {
                    match result {
                        Ok(WsMessage::Text(text)) => {
                            match RelayMessage::from_json(&text) {
                                Ok(msg) => {
                                    debug!(msg_type = %msg.type_name(), "Received message");
                                    if self.incoming_tx.send(msg).await.is_err() {
                                        warn!("Incoming message receiver dropped");
                                        return Err(SyncError::ChannelError("Receiver dropped".into()));
                                    }
                                }
                                Err(e) => {
                                    warn!(?e, "Failed to parse message");
                                }
                            }
                        }
                        Ok(WsMessage::Ping(data)) => {
                            let mut writer = write.lock().await;
                            writer.send(WsMessage::Pong(data)).await?;
                        }
                        Ok(WsMessage::Pong(_)) => {
                            debug!("Received pong");
                        }
                        Ok(WsMessage::Close(frame)) => {
                            info!(?frame, "Received close frame");
                            return Err(SyncError::Disconnected);
                        }
                        Ok(WsMessage::Binary(_)) => {
                            warn!("Received unexpected binary message");
                        }
                        Ok(WsMessage::Frame(_)) => {
                            // Raw frame, ignore
                        }
                        Err(e) => {
                            error!(?e, "WebSocket error");
                            return Err(SyncError::from(e));
                        }
                    }
                }

                // Send periodic pings
                _ = ping_interval.tick() => {
                    let mut writer = write.lock().await;
                    writer.send(WsMessage::Ping(vec![].into())).await?;
                    debug!("Sent ping");
                }

                // Check for shutdown
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, closing connection");
                    let mut writer = write.lock().await;
                    let _ = writer.send(WsMessage::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }

    /// Creates the exponential backoff configuration.
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_backoff,
            max_interval: self.config.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None, // No limit on total time
            ..Default::default()
        }
    }
}
