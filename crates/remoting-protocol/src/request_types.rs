//! Request type names: the exact strings sent as the `type` field.

/// All request types understood by the server.
pub struct RequestTypes;

impl RequestTypes {
    pub const SERVICES: &str = "services";
    pub const EXPORTS: &str = "exports";
    pub const INSTANCE: &str = "instance";
    pub const INVOKE: &str = "invoke";
    pub const RELEASE: &str = "release";

    /// Older clients send `call` for `invoke`.
    pub const CALL: &str = "call";

    pub const ALL: &[&str] = &[
        Self::SERVICES,
        Self::EXPORTS,
        Self::INSTANCE,
        Self::INVOKE,
        Self::RELEASE,
        Self::CALL,
    ];
}

/// Returns true if the given string is a request type the server routes.
pub fn is_known_request_type(kind: &str) -> bool {
    RequestTypes::ALL.contains(&kind)
}
