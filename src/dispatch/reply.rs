//! Outgoing replies.
//!
//! # Responsibilities
//! - Carry (status, headers, body) from any fulfilment strategy to the client
//! - Write JSON bodies with a content type, string bodies raw
//!
//! # Design Decisions
//! - Header names are stored lower-cased; a later `with_header` wins
//! - Conversion to an HTTP response never panics: malformed header values are
//!   dropped with a warning and a failed build degrades to a bare 500

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const JSON_UTF8_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A fully determined response, independent of the HTTP framework.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl Reply {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Reply with a JSON body and an explicit content type.
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self::new(status)
            .with_header("content-type", JSON_CONTENT_TYPE)
            .with_body(body)
    }

    /// 501 with the `{error}` body used for unimplemented endpoints.
    pub fn not_implemented(message: &str) -> Self {
        Self::json(StatusCode::NOT_IMPLEMENTED, json!({ "error": message }))
    }

    /// Error reply whose body is a serialized failure payload.
    pub fn error(status: StatusCode, body: Value) -> Self {
        Self::new(status)
            .with_header("content-type", JSON_UTF8_CONTENT_TYPE)
            .with_body(body)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.headers
                .insert(name.as_ref().to_ascii_lowercase(), value.into());
        }
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Serialize the body to bytes, adding a JSON content type when needed.
    fn body_bytes(&mut self) -> Vec<u8> {
        match self.body.take() {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(text)) => text.into_bytes(),
            Some(other) => {
                self.headers
                    .entry("content-type".to_string())
                    .or_insert_with(|| JSON_CONTENT_TYPE.to_string());
                serde_json::to_vec(&other).unwrap_or_default()
            }
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(mut self) -> Response {
        let bytes = self.body_bytes();
        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => {
                    tracing::warn!(header = %name, "Dropping malformed response header");
                }
            }
        }

        // Framing is recomputed from the actual body.
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::TRANSFER_ENCODING);
        response
    }
}

/// Render any JSON value as a header value string.
pub(crate) fn header_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
