//! Remoting error types and the protocol's well-known error names.

use serde::{Deserialize, Serialize};

/// Well-known error names plus the names forwarded from service methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    // Dispatcher errors
    ParseError,
    InvalidRequest,
    UnknownRequestType,

    // Handler errors
    ServiceNotFound,
    NewInstanceError,
    InstanceNotFound,
    NoSuchMethod,

    // Raised by service code
    InvalidArguments,
    SerializationError,
    Remote(String),
}

impl ErrorKind {
    pub fn name(&self) -> &str {
        match self {
            Self::ParseError => "ParseError",
            Self::InvalidRequest => "InvalidRequest",
            Self::UnknownRequestType => "UnknownRequestType",
            Self::ServiceNotFound => "ServiceNotFound",
            Self::NewInstanceError => "NewInstanceError",
            Self::InstanceNotFound => "InstanceNotFound",
            Self::NoSuchMethod => "NoSuchMethod",
            Self::InvalidArguments => "InvalidArguments",
            Self::SerializationError => "SerializationError",
            Self::Remote(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "ParseError" => Self::ParseError,
            "InvalidRequest" => Self::InvalidRequest,
            "UnknownRequestType" => Self::UnknownRequestType,
            "ServiceNotFound" => Self::ServiceNotFound,
            "NewInstanceError" => Self::NewInstanceError,
            "InstanceNotFound" => Self::InstanceNotFound,
            "NoSuchMethod" => Self::NoSuchMethod,
            "InvalidArguments" => Self::InvalidArguments,
            "SerializationError" => Self::SerializationError,
            other => Self::Remote(other.to_string()),
        }
    }
}

/// An error as it travels on the wire: a name and an optional message.
///
/// Service methods fail with this type too, so whatever name they pick is
/// forwarded to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{name}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct RemotingError {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Name used when a failing method supplies none.
pub const GENERIC_ERROR_NAME: &str = "Error";

impl RemotingError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            name: kind.name().to_string(),
            message: Some(message.into()),
        }
    }

    /// An error with a caller-chosen name. Blank names fall back to `"Error"`.
    pub fn remote(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: if name.trim().is_empty() { GENERIC_ERROR_NAME.to_string() } else { name },
            message: Some(message.into()),
        }
    }

    /// A bare `"Error"` with only a message.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::remote(GENERIC_ERROR_NAME, message)
    }

    pub fn without_message(mut self) -> Self {
        self.message = None;
        self
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn unknown_request_type(kind: Option<&str>) -> Self {
        match kind {
            Some(kind) => Self::new(ErrorKind::UnknownRequestType, format!("Unknown request type: {kind}")),
            None => Self::new(ErrorKind::UnknownRequestType, "Request has no type"),
        }
    }

    pub fn service_not_found(service: &str) -> Self {
        Self::new(ErrorKind::ServiceNotFound, format!("Service not found: {service}"))
    }

    pub fn new_instance(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NewInstanceError, message)
    }

    pub fn instance_not_found(instance: Option<i64>) -> Self {
        match instance {
            Some(slot) => Self::new(ErrorKind::InstanceNotFound, format!("Instance not found: {slot}")),
            None => Self::new(ErrorKind::InstanceNotFound, "Request names no instance"),
        }
    }

    pub fn no_such_method(method: &str) -> Self {
        Self::new(ErrorKind::NoSuchMethod, format!("No such method: {method}"))
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArguments, message)
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_name(&self.name)
    }
}

impl From<serde_json::Error> for RemotingError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::SerializationError, err.to_string())
    }
}
