//! Request dispatcher: decodes inbound text and routes it by `type`.

use std::collections::HashMap;
use std::sync::Arc;

use remoting_protocol::{ErrorResponse, RemotingError, Request, Response};
use tracing::debug;

use crate::bridge::{self, Reply};
use crate::connection::Connection;
use crate::handlers;
use crate::registry::ServiceRegistry;

/// A protocol operation.
pub type Handler = fn(&ServiceRegistry, &Connection, &Request) -> Reply;

/// Maps request types to handlers.
pub struct Dispatcher {
    handlers: HashMap<&'static str, Handler>,
}

impl Dispatcher {
    /// A dispatcher with no handlers; every request is an unknown type.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A dispatcher with the standard handler set.
    pub fn new() -> Self {
        let mut dispatcher = Self::empty();
        handlers::install(&mut dispatcher);
        dispatcher
    }

    /// Route `kind` to `handler`, replacing any previous handler.
    pub fn add(&mut self, kind: &'static str, handler: Handler) {
        self.handlers.insert(kind, handler);
    }

    /// Decode one inbound message.
    pub fn parse(&self, raw: &str) -> Result<Request, ErrorResponse> {
        Request::from_text(raw)
    }

    /// Run the handler for `request.type` and deliver its reply.
    pub fn route(&self, registry: &ServiceRegistry, connection: &Arc<Connection>, request: Request) {
        let kind = request.kind.as_deref();
        let Some(handler) = kind.and_then(|k| self.handlers.get(k)) else {
            debug!("Connection {}: unknown request type {kind:?}", connection.id());
            connection.send_error(RemotingError::unknown_request_type(kind), request.id.clone());
            return;
        };

        debug!("Connection {}: {} request", connection.id(), kind.unwrap_or_default());
        let reply = handler(registry, connection, &request);
        bridge::deliver(connection, Response::for_request(&request), reply);
    }

    /// Parse then route. Malformed input is answered on the connection.
    pub fn dispatch(&self, registry: &ServiceRegistry, connection: &Arc<Connection>, raw: &str) {
        match self.parse(raw) {
            Ok(request) => self.route(registry, connection, request),
            Err(envelope) => {
                debug!("Connection {}: rejected message: {}", connection.id(), envelope.name);
                connection.send(&envelope);
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
