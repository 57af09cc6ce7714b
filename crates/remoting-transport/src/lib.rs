//! Remoting Transport Layer
//!
//! Provides the WebSocket transport for the remoting server.
//! The transport layer handles:
//! - Connection lifecycle (open, message, close)
//! - Ping replies and the connection limit
//! - Draining each connection's outbound queue onto its socket
//!
//! The transport is decoupled from the server logic via the
//! [`ConnectionHandler`] trait.

pub mod server;
pub mod socket;

pub use server::{TransportConfig, TransportServer};
pub use socket::{ChannelSocket, ConnectionHandler, ConnectionId, Socket, TransportError};
