//! Request/reply transport abstraction.
//!
//! # Responsibilities
//! - Define the publish-with-reply primitive the forwarder consumes
//! - Classify transport failures into codes visible to HTTP mapping
//!
//! # Design Decisions
//! - One call = one publish and at most one reply; the timeout belongs to
//!   the transport so pending state is released even if the caller goes away
//! - Errors serialize as `{code, message}`, the shape written into 500 bodies

use futures_util::future::BoxFuture;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Message headers, e.g. `content-type` and `message-type`.
pub type MessageHeaders = BTreeMap<String, String>;

/// A payload travelling over the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub payload: String,
    pub headers: MessageHeaders,
}

impl Message {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            headers: MessageHeaders::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Error code carried by [`TransportError::NoResponders`].
pub const SERVICE_UNAVAILABLE_CODE: &str = "503";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("no responders available for topic {topic}")]
    NoResponders { topic: String },

    #[error("transport closed before a reply arrived")]
    Closed,

    #[error("remote error {code}: {message}")]
    Remote { code: String, message: String },

    #[error("invalid message: {0}")]
    Encoding(String),

    #[error("broker connection failed: {0}")]
    Connection(String),
}

impl TransportError {
    /// Short machine-readable code.
    pub fn code(&self) -> &str {
        match self {
            TransportError::Timeout { .. } => "TIMEOUT",
            TransportError::NoResponders { .. } => SERVICE_UNAVAILABLE_CODE,
            TransportError::Closed => "CLOSED",
            TransportError::Remote { code, .. } => code,
            TransportError::Encoding(_) => "ENCODING",
            TransportError::Connection(_) => "CONNECTION",
        }
    }

    /// True when the remote side is known to be unable to serve the call.
    pub fn is_service_unavailable(&self) -> bool {
        self.code() == SERVICE_UNAVAILABLE_CODE
    }
}

impl Serialize for TransportError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TransportError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Publish-with-reply messaging.
pub trait Transport: Send + Sync {
    /// Publish `payload` on `topic` and wait up to `timeout` for one reply.
    fn request<'a>(
        &'a self,
        topic: &'a str,
        payload: String,
        timeout: Duration,
        headers: MessageHeaders,
    ) -> BoxFuture<'a, Result<Message, TransportError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransportError::Timeout { timeout_ms: 10 }.code(), "TIMEOUT");
        let unavailable = TransportError::NoResponders { topic: "api.get_/x".into() };
        assert!(unavailable.is_service_unavailable());
        assert!(!TransportError::Closed.is_service_unavailable());

        let remote = TransportError::Remote {
            code: "503".into(),
            message: "draining".into(),
        };
        assert!(remote.is_service_unavailable());
    }

    #[test]
    fn test_error_serialization() {
        let value = serde_json::to_value(TransportError::Timeout { timeout_ms: 2000 }).unwrap();
        assert_eq!(
            value,
            json!({ "code": "TIMEOUT", "message": "request timed out after 2000ms" })
        );
    }

    #[test]
    fn test_message_headers_lowercased() {
        let message = Message::new("{}").with_header("Content-Type", "application/json");
        assert_eq!(message.header("content-type"), Some("application/json"));
    }
}
