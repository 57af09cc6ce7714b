//! Socket handles and the connection-event contract.

use std::sync::Arc;

use tokio::sync::mpsc;

/// Identifier a [`ConnectionHandler`] assigns to an accepted socket.
pub type ConnectionId = usize;

/// Errors raised by the transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("socket is closed")]
    Closed,
    #[error("invalid bind address {0}")]
    Address(String),
    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// Write side of one client connection.
pub trait Socket: Send + Sync {
    /// Queue one text message for delivery.
    fn send(&self, text: String) -> Result<(), TransportError>;
}

/// Receives connection lifecycle events from the transport.
///
/// Messages for one connection are delivered sequentially in arrival order.
/// Different connections may be delivered concurrently.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// A socket opened. Returning `None` refuses it and the transport closes it.
    fn on_connection(&self, socket: Arc<dyn Socket>) -> Option<ConnectionId>;

    /// A text message arrived on an accepted connection.
    fn on_message(&self, connection: ConnectionId, text: &str);

    /// The socket closed.
    fn on_close(&self, connection: ConnectionId);
}

/// A [`Socket`] backed by an unbounded queue.
///
/// The receiving half is drained by whoever owns the real socket (the
/// WebSocket connection task, or a test).
#[derive(Debug, Clone)]
pub struct ChannelSocket {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSocket {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Socket for ChannelSocket {
    fn send(&self, text: String) -> Result<(), TransportError> {
        self.tx.send(text).map_err(|_| TransportError::Closed)
    }
}
