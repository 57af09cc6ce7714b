//! WebSocket transport server using Axum.
//!
//! Handles HTTP upgrade to WebSocket, answers pings, and hands every
//! connection's lifecycle events to a [`ConnectionHandler`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use crate::socket::{ChannelSocket, ConnectionHandler, TransportError};

/// Transport server configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// Enable permissive CORS on the HTTP routes
    pub enable_cors: bool,
    /// Maximum concurrent connections
    pub max_connections: Option<usize>,
    /// Enable verbose connection logging
    pub verbose_logging: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 7070,
            hostname: "127.0.0.1".into(),
            enable_cors: false,
            max_connections: Some(32),
            verbose_logging: false,
        }
    }
}

/// Shared state for the transport server.
struct AppState<H: ConnectionHandler> {
    handler: Arc<H>,
    config: TransportConfig,
    /// Open socket count (for health check and the connection limit)
    client_count: Arc<AtomicUsize>,
}

/// The transport server: accepts WebSocket connections and pumps messages.
pub struct TransportServer {
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound port
    port: u16,
    client_count: Arc<AtomicUsize>,
}

impl TransportServer {
    /// Bind the listener and start serving connections to `handler`.
    pub async fn start<H: ConnectionHandler>(
        config: TransportConfig,
        handler: Arc<H>,
    ) -> Result<Self, TransportError> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let client_count = Arc::new(AtomicUsize::new(0));

        let state = Arc::new(AppState {
            handler,
            config: config.clone(),
            client_count: client_count.clone(),
        });

        let mut app = Router::new()
            .route("/ws", get(ws_upgrade_handler::<H>))
            .route("/health", get(health_handler::<H>))
            .with_state(state);
        if config.enable_cors {
            app = app.layer(CorsLayer::permissive());
        }

        let raw_addr = format!("{}:{}", config.hostname, config.port);
        let addr: SocketAddr = raw_addr
            .parse()
            .map_err(|_| TransportError::Address(raw_addr.clone()))?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        info!("Remoting transport listening on ws://{}:{}/ws", config.hostname, actual_port);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            port: actual_port,
            client_count,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of currently open sockets.
    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Gracefully stop the server. Calling it twice is harmless.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
            info!("Remoting transport stopped");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn ws_upgrade_handler<H: ConnectionHandler>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    if let Some(max) = state.config.max_connections {
        let current = state.client_count.load(Ordering::Relaxed);
        if current >= max {
            warn!("Connection rejected: max connections reached ({max})");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    }

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
        .into_response()
}

async fn health_handler<H: ConnectionHandler>(
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "clients": state.client_count.load(Ordering::Relaxed),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Connection Handler
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_ws_connection<H: ConnectionHandler>(
    mut socket: WebSocket,
    state: Arc<AppState<H>>,
) {
    // Slot ids are reused after close, so log lines carry a per-socket tag.
    let peer = uuid::Uuid::new_v4();

    let (channel, mut outbound_rx) = ChannelSocket::new();
    let Some(connection) = state.handler.on_connection(Arc::new(channel)) else {
        warn!("Connection refused by server: {peer}");
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    let total = state.client_count.fetch_add(1, Ordering::Relaxed) + 1;
    info!("Client connected: {peer} as connection {connection} (total: {total})");

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if state.config.verbose_logging {
                            debug!("<- {peer}: {}", text.as_str());
                        }
                        state.handler.on_message(connection, text.as_str());
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring binary frame from {peer}");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client closed: {peer}");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for {peer}: {e}");
                        break;
                    }
                    _ => {}
                }
            }

            outbound = outbound_rx.recv() => {
                let Some(text) = outbound else { break };
                if state.config.verbose_logging {
                    debug!("-> {peer}: {text}");
                }
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    error!("Failed to send to {peer}: {e}");
                    break;
                }
            }
        }
    }

    state.handler.on_close(connection);

    let total = state.client_count.fetch_sub(1, Ordering::Relaxed) - 1;
    info!("Client disconnected: {peer} (total: {total})");
}
