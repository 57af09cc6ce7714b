//! Request, response, and error envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemotingError;

/// Value of the `type` field on every error envelope.
pub const ERROR_TYPE: &str = "error";

/// Inbound request envelope.
///
/// `id` is an opaque client token echoed back verbatim; a JSON `null` id is
/// treated the same as a missing one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Signed so that a negative slot is answered as a missing instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Value>>,
}

impl Request {
    /// Decode one inbound text message.
    ///
    /// Malformed JSON yields a `ParseError` envelope without an id. JSON that
    /// decodes but does not have the request shape yields `InvalidRequest`,
    /// carrying the id if the message had a usable one.
    pub fn from_text(text: &str) -> Result<Self, ErrorResponse> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            ErrorResponse::new(None, RemotingError::parse_error(format!("Message is not valid JSON: {e}")))
        })?;

        if !value.is_object() {
            return Err(ErrorResponse::new(
                None,
                RemotingError::invalid_request("Message is not a JSON object"),
            ));
        }

        let id = value.get("id").filter(|v| !v.is_null()).cloned();
        serde_json::from_value(value).map_err(|e| {
            ErrorResponse::new(id, RemotingError::invalid_request(format!("Malformed request: {e}")))
        })
    }

    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// The addressed slot, if it names one a table could hold.
    pub fn slot(&self) -> Option<usize> {
        self.instance.and_then(|i| usize::try_from(i).ok())
    }
}

/// Success envelope: `{id, type, result}`. `result` is omitted for replies
/// that carry none (e.g. `release`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Response {
    /// Seed a response with the request's id and type.
    pub fn for_request(request: &Request) -> Self {
        Self {
            id: request.id.clone(),
            kind: request.kind.clone().unwrap_or_default(),
            result: None,
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }
}

/// Error envelope: `{type: "error", name, message?, id?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl ErrorResponse {
    pub fn new(id: Option<Value>, error: RemotingError) -> Self {
        Self {
            kind: ERROR_TYPE.into(),
            name: error.name,
            message: error.message,
            id,
        }
    }
}
