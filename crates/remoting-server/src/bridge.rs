//! Result bridge: turns a handler's reply into an outbound envelope.
//!
//! Service methods declare at registration whether they answer
//! synchronously or with a future, so there is no runtime probing: a
//! [`Reply::Ready`] is sent before the dispatcher returns, while a
//! [`Reply::Pending`] is awaited on its own task and answered whenever it
//! settles. Pending replies can therefore overtake, or be overtaken by,
//! later requests on the same connection; clients correlate by `id`.
//!
//! A panic in service code is caught here and at the synchronous call sites
//! in [`service`](crate::service), and answered as an error for that request
//! alone.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use remoting_protocol::{HandlerResult, RemotingError, Response};
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

use crate::connection::Connection;

/// What a handler or service method hands back.
pub enum Reply {
    /// Success with no `result` field (e.g. `release`).
    Bare,
    /// Settled immediately.
    Ready(HandlerResult),
    /// Settles later.
    Pending(BoxFuture<'static, HandlerResult>),
}

impl Reply {
    pub fn ok(value: serde_json::Value) -> Self {
        Self::Ready(Ok(value))
    }

    pub fn err(error: RemotingError) -> Self {
        Self::Ready(Err(error))
    }

}

impl From<HandlerResult> for Reply {
    fn from(result: HandlerResult) -> Self {
        Self::Ready(result)
    }
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bare => f.write_str("Bare"),
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Send `reply` on `connection`, seeded with `response`'s id and type.
pub fn deliver(connection: &Arc<Connection>, response: Response, reply: Reply) {
    match reply {
        Reply::Bare => connection.send(&response),
        Reply::Ready(result) => send_result(connection, response, result),
        Reply::Pending(future) => match Handle::try_current() {
            Ok(runtime) => {
                let connection = Arc::clone(connection);
                runtime.spawn(async move {
                    let result = AssertUnwindSafe(future)
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|payload| Err(panic_error(payload)));
                    debug!("Async reply settled on connection {}", connection.id());
                    send_result(&connection, response, result);
                });
            }
            Err(_) => {
                warn!("No async runtime to settle a pending reply on connection {}", connection.id());
                connection.send_error(
                    RemotingError::generic("Asynchronous results are unavailable outside a runtime"),
                    response.id,
                );
            }
        },
    }
}

/// Convert a caught panic payload into a generic `Error`.
pub(crate) fn panic_error(payload: Box<dyn Any + Send>) -> RemotingError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".into());
    error!("Service code panicked: {detail}");
    RemotingError::generic(format!("Service panicked: {detail}"))
}

fn send_result(connection: &Connection, response: Response, result: HandlerResult) {
    match result {
        Ok(value) => connection.send(&response.with_result(value)),
        Err(error) => connection.send_error(error, response.id),
    }
}
