//! Remoting: Protocol Types
//!
//! Wire envelopes for the remoting protocol: one JSON object per message,
//! requests addressed by `type`, responses echoing the client's `id`.
//! This crate is the single source of truth for request type names and
//! error names.

pub mod envelope;
pub mod error;
pub mod request_types;

pub use envelope::{ErrorResponse, Request, Response, ERROR_TYPE};
pub use error::{ErrorKind, RemotingError, GENERIC_ERROR_NAME};
pub use request_types::{is_known_request_type, RequestTypes};

/// Result of a handler or service method.
pub type HandlerResult = Result<serde_json::Value, RemotingError>;
