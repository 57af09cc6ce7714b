//! Per-connection session store.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Handle to the mutable state shared by every instance on one connection.
///
/// Cloning the handle shares the store; it never copies it. A login recorded
/// by one instance is visible to every other instance on the same connection.
#[derive(Debug, Clone, Default)]
pub struct Session {
    store: Arc<Mutex<Map<String, Value>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.lock().get(key).cloned()
    }

    /// Read a key and decode it. Missing keys and shape mismatches are `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    /// Store a value, returning the one it replaced.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.store.lock().insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.store.lock().remove(key)
    }

}
