//! Remoting server: owns the registry and the connection table, and routes
//! transport events to the dispatcher.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use remoting_protocol::RemotingError;
use remoting_transport::{ConnectionHandler, ConnectionId, Socket};
use serde_json::Value;
use tracing::{info, warn};

use crate::connection::Connection;
use crate::dispatcher::Dispatcher;
use crate::registry::ServiceRegistry;
use crate::service::ServiceDefinition;
use crate::slots::SlotTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerState {
    Stopped,
    Running,
}

/// The remoting server.
///
/// Connections are accepted only while the server is running. Stopping it
/// refuses new connections but leaves open ones untouched.
pub struct RemotingServer {
    registry: ServiceRegistry,
    connections: RwLock<SlotTable<Arc<Connection>>>,
    dispatcher: Dispatcher,
    state: Mutex<ServerState>,
}

impl RemotingServer {
    pub fn new() -> Self {
        Self::with_dispatcher(Dispatcher::new())
    }

    /// Build a server around a custom handler table.
    pub fn with_dispatcher(dispatcher: Dispatcher) -> Self {
        Self {
            registry: ServiceRegistry::new(),
            connections: RwLock::new(SlotTable::new()),
            dispatcher,
            state: Mutex::new(ServerState::Stopped),
        }
    }

    // ── Services ─────────────────────────────────────────────────────────

    /// Register a service under `name`, replacing any previous registration.
    pub fn register(
        &self,
        name: &str,
        definition: impl Into<Arc<ServiceDefinition>>,
        construction_args: Vec<Value>,
    ) {
        self.registry.register(name, definition.into(), construction_args);
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.registry.unregister(name)
    }

    pub fn list_services(&self) -> Vec<String> {
        self.registry.list()
    }

    pub fn exported_methods(&self, name: &str) -> Result<Vec<String>, RemotingError> {
        self.registry.exported_methods(name)
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Begin accepting connections. Returns false if already running.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ServerState::Running {
            return false;
        }
        *state = ServerState::Running;
        info!("Remoting server started ({} services)", self.registry.len());
        true
    }

    /// Stop accepting connections. Returns false if already stopped.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ServerState::Stopped {
            return false;
        }
        *state = ServerState::Stopped;
        info!("Remoting server stopped accepting connections");
        true
    }

    pub fn is_running(&self) -> bool {
        *self.state.lock() == ServerState::Running
    }

    // ── Connections ──────────────────────────────────────────────────────

    /// Create a connection for `socket` under the smallest free id.
    /// Returns `None` while the server is stopped.
    pub fn add_connection(&self, socket: Arc<dyn Socket>) -> Option<usize> {
        if !self.is_running() {
            return None;
        }

        let mut connections = self.connections.write();
        let id = connections.next_free();
        connections.insert(Arc::new(Connection::new(id, socket)));
        Some(id)
    }

    /// Discard a connection and every instance on it.
    pub fn remove_connection(&self, id: usize) {
        if let Some(connection) = self.connections.write().remove(id) {
            connection.close();
        }
    }

    pub fn connection(&self, id: usize) -> Option<Arc<Connection>> {
        self.connections.read().get(id).cloned()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Handle one inbound text message on connection `id`.
    pub fn handle_message(&self, id: usize, text: &str) {
        let Some(connection) = self.connection(id) else {
            warn!("Message for unknown connection {id}");
            return;
        };
        self.dispatcher.dispatch(&self.registry, &connection, text);
    }
}

impl Default for RemotingServer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionHandler for RemotingServer {
    fn on_connection(&self, socket: Arc<dyn Socket>) -> Option<ConnectionId> {
        let id = self.add_connection(socket);
        if id.is_none() {
            warn!("Connection refused: server is stopped");
        }
        id
    }

    fn on_message(&self, connection: ConnectionId, text: &str) {
        self.handle_message(connection, text);
    }

    fn on_close(&self, connection: ConnectionId) {
        self.remove_connection(connection);
        info!("Connection {connection} closed ({} open)", self.connection_count());
    }
}
