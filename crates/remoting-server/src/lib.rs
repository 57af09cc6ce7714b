//! Remoting Server: exposes registered services to remote clients.
//!
//! The server owns the service registry and the connection table, and
//! implements [`ConnectionHandler`](remoting_transport::ConnectionHandler)
//! so a transport can feed it connection, message, and close events.
//! Each connection gets its own session and instance table; requests are
//! dispatched by `type` to the standard handler set and answered through
//! the result bridge.

pub mod bridge;
pub mod connection;
pub mod dispatcher;
pub mod handlers;
pub mod registry;
pub mod server;
pub mod service;
pub mod session;
pub mod slots;

pub use bridge::Reply;
pub use connection::Connection;
pub use dispatcher::{Dispatcher, Handler};
pub use registry::{ServiceDescriptor, ServiceRegistry};
pub use server::RemotingServer;
pub use service::{Args, InstanceContext, ServiceBuilder, ServiceDefinition};
pub use session::Session;
pub use slots::SlotTable;
