//! ServiceRegistry: named service descriptors available for instantiation.

use std::sync::Arc;

use parking_lot::RwLock;
use remoting_protocol::RemotingError;
use serde_json::Value;
use tracing::info;

use crate::service::ServiceDefinition;

/// A registered service: its definition and the arguments every instance is
/// constructed with. Immutable once registered.
#[derive(Debug)]
pub struct ServiceDescriptor {
    pub name: String,
    pub definition: Arc<ServiceDefinition>,
    pub construction_args: Vec<Value>,
}

impl ServiceDescriptor {
    pub fn exports(&self) -> &[String] {
        self.definition.exports()
    }
}

/// Holds one descriptor per service name.
///
/// Listing follows registration order. Re-registering a name swaps the
/// descriptor but keeps the name's original position.
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<Vec<Arc<ServiceDescriptor>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a descriptor. Returns true if it replaced an existing one.
    pub fn register(
        &self,
        name: &str,
        definition: Arc<ServiceDefinition>,
        construction_args: Vec<Value>,
    ) -> bool {
        let descriptor = Arc::new(ServiceDescriptor {
            name: name.to_string(),
            definition,
            construction_args,
        });

        let mut services = self.services.write();
        match services.iter_mut().find(|d| d.name == name) {
            Some(existing) => {
                *existing = descriptor;
                info!("Service replaced: {name}");
                true
            }
            None => {
                services.push(descriptor);
                info!("Service registered: {name}");
                false
            }
        }
    }

    /// Remove a descriptor. Instances already created from it keep working.
    pub fn unregister(&self, name: &str) -> bool {
        let mut services = self.services.write();
        let before = services.len();
        services.retain(|d| d.name != name);
        let removed = services.len() != before;
        if removed {
            info!("Service unregistered: {name}");
        }
        removed
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<ServiceDescriptor>, RemotingError> {
        self.services
            .read()
            .iter()
            .find(|d| d.name == name)
            .cloned()
            .ok_or_else(|| RemotingError::service_not_found(name))
    }

    /// Registered names, in registration order.
    pub fn list(&self) -> Vec<String> {
        self.services.read().iter().map(|d| d.name.clone()).collect()
    }

    pub fn exported_methods(&self, name: &str) -> Result<Vec<String>, RemotingError> {
        self.lookup(name).map(|d| d.exports().to_vec())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.read().iter().any(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }
}
