//! Wire envelopes for forwarded calls.
//!
//! Request:
//! ```json
//! { "topic": "api.get_/users/{id}", "method": "get", "uri": "/users/{id}",
//!   "endpointDesc": { ... },
//!   "request": { "user": null, "cookies": {}, "headers": {},
//!                "parameters": { "query": {}, "uri": { "id": "42" } },
//!                "body": null } }
//! ```
//!
//! Response: `{ "status"?: 200, "headers"?: {}, "body"?: any }`.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::api::{EndpointDescriptor, HttpMethod};
use crate::dispatch::reply::{header_string, Reply};
use crate::dispatch::ApiRequest;

/// Outbound envelope, borrowed from the request being forwarded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope<'a> {
    pub topic: &'a str,
    pub method: HttpMethod,
    pub uri: &'a str,
    pub endpoint_desc: &'a EndpointDescriptor,
    pub request: RequestPayload<'a>,
}

#[derive(Debug, Serialize)]
pub struct RequestPayload<'a> {
    pub user: Option<&'a Value>,
    pub cookies: &'a BTreeMap<String, String>,
    pub headers: &'a BTreeMap<String, String>,
    pub parameters: Parameters<'a>,
    pub body: &'a Value,
}

#[derive(Debug, Serialize)]
pub struct Parameters<'a> {
    pub query: &'a BTreeMap<String, Value>,
    pub uri: &'a BTreeMap<String, String>,
}

impl<'a> RequestEnvelope<'a> {
    pub fn new(topic: &'a str, endpoint: &'a EndpointDescriptor, request: &'a ApiRequest) -> Self {
        Self {
            topic,
            method: endpoint.method,
            uri: &endpoint.uri,
            endpoint_desc: endpoint,
            request: RequestPayload {
                user: request.user.as_ref(),
                cookies: &request.cookies,
                headers: &request.headers,
                parameters: Parameters {
                    query: &request.query,
                    uri: &request.path_params,
                },
                body: &request.body,
            },
        }
    }
}

/// Reply envelope sent back by a remote peer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ResponseEnvelope {
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// The HTTP reply this envelope describes. Status defaults to 200.
    pub fn into_reply(self) -> Reply {
        let status = match self.status {
            None => StatusCode::OK,
            Some(code) => StatusCode::from_u16(code).unwrap_or_else(|_| {
                tracing::warn!(status = code, "Remote reply carries an invalid status");
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        };

        let mut reply = Reply::new(status)
            .with_headers(self.headers.iter().map(|(k, v)| (k, header_string(v))));
        reply.body = self.body;
        reply
    }
}
