//! The protocol operations: `services`, `exports`, `instance`, `invoke`, `release`.
//!
//! Each handler returns a [`Reply`]; the dispatcher seeds the response with
//! the request's id and type and hands both to the result bridge.

use remoting_protocol::{RemotingError, Request, RequestTypes};
use serde_json::json;

use crate::bridge::Reply;
use crate::connection::Connection;
use crate::dispatcher::Dispatcher;
use crate::registry::ServiceRegistry;
use crate::service::Args;

/// Install the standard handler set, including the `call` alias.
pub fn install(dispatcher: &mut Dispatcher) {
    dispatcher.add(RequestTypes::SERVICES, services);
    dispatcher.add(RequestTypes::EXPORTS, exports);
    dispatcher.add(RequestTypes::INSTANCE, instance);
    dispatcher.add(RequestTypes::INVOKE, invoke);
    dispatcher.add(RequestTypes::CALL, invoke);
    dispatcher.add(RequestTypes::RELEASE, release);
}

/// Names of all registered services.
pub fn services(registry: &ServiceRegistry, _connection: &Connection, _request: &Request) -> Reply {
    Reply::ok(json!(registry.list()))
}

/// Exported method names of `request.service`. Unknown services are an error.
pub fn exports(registry: &ServiceRegistry, _connection: &Connection, request: &Request) -> Reply {
    let service = request.service.as_deref().unwrap_or_default();
    registry.exported_methods(service).map(|names| json!(names)).into()
}

/// Create an instance of `request.service` on this connection.
pub fn instance(registry: &ServiceRegistry, connection: &Connection, request: &Request) -> Reply {
    let service = request.service.as_deref().unwrap_or_default();

    let slot = match connection.create_instance(registry, service) {
        Ok(slot) => slot,
        Err(cause) => {
            return Reply::err(RemotingError::new_instance(format!(
                "Could not create instance of '{service}': {cause}"
            )));
        }
    };

    let exports = connection.instance_exports(slot).unwrap_or_default();
    Reply::ok(json!({ "instance": slot, "exports": exports }))
}

/// Call an exported method on one of this connection's instances.
pub fn invoke(_registry: &ServiceRegistry, connection: &Connection, request: &Request) -> Reply {
    let Some(instance) = request.slot().and_then(|slot| connection.instance(slot)) else {
        return Reply::err(RemotingError::instance_not_found(request.instance));
    };

    let method = request.method.as_deref().unwrap_or_default();
    if !instance.is_exported(method) {
        return Reply::err(RemotingError::no_such_method(method));
    }

    let args = Args::new(request.args.clone().unwrap_or_default());
    instance.invoke(method, args)
}

/// Drop an instance. Succeeds whether or not the slot was occupied.
pub fn release(_registry: &ServiceRegistry, connection: &Connection, request: &Request) -> Reply {
    if let Some(slot) = request.slot() {
        connection.release_instance(slot);
    }
    Reply::Bare
}
