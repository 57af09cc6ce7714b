//! Client connection: session store, instance table, and outbound writes.

use std::sync::Arc;

use parking_lot::Mutex;
use remoting_protocol::{ErrorResponse, RemotingError};
use remoting_transport::Socket;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::registry::ServiceRegistry;
use crate::service::{Args, Instance, InstanceContext};
use crate::session::Session;
use crate::slots::SlotTable;

/// One transport connection and everything created on it.
///
/// The instance table sits behind its own lock because pending async replies
/// and the connection task may touch the connection from different threads.
pub struct Connection {
    id: usize,
    session: Session,
    instances: Mutex<SlotTable<Instance>>,
    socket: Arc<dyn Socket>,
}

impl Connection {
    pub fn new(id: usize, socket: Arc<dyn Socket>) -> Self {
        Self {
            id,
            session: Session::new(),
            instances: Mutex::new(SlotTable::new()),
            socket,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// The session shared by every instance on this connection.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Construct an instance of `service` and store it under the smallest
    /// free slot id.
    ///
    /// Lookup and constructor failures are returned untouched; the caller
    /// decides how to report them.
    pub fn create_instance(
        &self,
        registry: &ServiceRegistry,
        service: &str,
    ) -> Result<usize, RemotingError> {
        let descriptor = registry.lookup(service)?;
        let definition = Arc::clone(&descriptor.definition);

        let ctx = InstanceContext::new(self.id, self.session.clone(), definition.exports_handle());
        let object = definition.construct(&ctx, Args::new(descriptor.construction_args.clone()))?;

        let slot = self.instances.lock().insert(Instance::new(definition, object));
        debug!("Connection {}: created {service} at slot {slot}", self.id);
        Ok(slot)
    }

    /// Drop the instance at `slot`. Absent slots are ignored.
    pub fn release_instance(&self, slot: usize) -> bool {
        let released = self.instances.lock().remove(slot).is_some();
        if released {
            debug!("Connection {}: released slot {slot}", self.id);
        }
        released
    }

    pub(crate) fn instance(&self, slot: usize) -> Option<Instance> {
        self.instances.lock().get(slot).cloned()
    }

    /// Exported method names of the instance at `slot`.
    pub fn instance_exports(&self, slot: usize) -> Option<Vec<String>> {
        self.instances.lock().get(slot).map(|i| i.exports().to_vec())
    }

    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }

    /// Drop every instance. Called when the transport closes the socket.
    pub fn close(&self) {
        self.instances.lock().clear();
    }

    /// Serialize an envelope and write it to the socket.
    pub fn send<T: Serialize>(&self, envelope: &T) {
        let text = match serde_json::to_string(envelope) {
            Ok(text) => text,
            Err(e) => {
                error!("Connection {}: failed to serialize envelope: {e}", self.id);
                return;
            }
        };
        if let Err(e) = self.socket.send(text) {
            debug!("Connection {}: dropping outbound message: {e}", self.id);
        }
    }

    /// Send an error envelope; `id` is included only when known.
    pub fn send_error(&self, error: RemotingError, id: Option<Value>) {
        self.send(&ErrorResponse::new(id, error));
    }
}
