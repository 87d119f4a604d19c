//! Canned example responses.
//!
//! # Responsibilities
//! - Negotiate the response media type for an endpoint
//! - Answer with the first declared example for that type
//!
//! # Design Decisions
//! - `fulfill` is pure; `handle` is the request-facing variant that also logs
//!   negotiation failures
//! - No example for the negotiated type is a 404 that still carries the
//!   declared headers and the content type

use axum::http::StatusCode;

use crate::api::EndpointDescriptor;
use crate::dispatch::Reply;
use crate::mocking::media_type::resolve_for;

/// Serves example bodies declared in the API document.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockFulfiller;

impl MockFulfiller {
    pub fn new() -> Self {
        Self
    }

    /// Build the mock reply for `endpoint` given the client's `Accept` value.
    pub fn fulfill(&self, endpoint: &EndpointDescriptor, accept: Option<&str>) -> Reply {
        let media_type = match resolve_for(endpoint, accept) {
            Ok(media_type) => media_type,
            Err(_) => return Reply::new(StatusCode::UNSUPPORTED_MEDIA_TYPE),
        };

        let headers = endpoint
            .response
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()));

        let example = endpoint
            .examples_for(&media_type)
            .and_then(|set| set.values().next());

        match example {
            Some(body) => Reply::new(StatusCode::OK)
                .with_headers(headers)
                .with_header("content-type", media_type)
                .with_body(body.clone()),
            None => Reply::new(StatusCode::NOT_FOUND)
                .with_headers(headers)
                .with_header("content-type", media_type),
        }
    }

    /// [`fulfill`](Self::fulfill), logging a negotiation failure.
    pub fn handle(&self, endpoint: &EndpointDescriptor, accept: Option<&str>) -> Reply {
        let reply = self.fulfill(endpoint, accept);
        if reply.status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
            tracing::error!(
                accept = accept.unwrap_or_default(),
                method = %endpoint.method,
                uri = %endpoint.uri,
                "The \"{}\" media-type is not supported by the {} {} operation",
                accept.unwrap_or_default(),
                endpoint.method,
                endpoint.uri
            );
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpMethod;
    use serde_json::json;

    fn endpoint() -> EndpointDescriptor {
        EndpointDescriptor::new(HttpMethod::Get, "/currencies/{code}")
            .with_produces(["application/json", "text/plain"])
            .with_header("X-Api-Version", "1.0")
            .with_example("application/json", "euro", json!({ "code": "EUR" }))
            .with_example("application/json", "dollar", json!({ "code": "USD" }))
    }

    #[test]
    fn test_first_example_is_served() {
        let reply = MockFulfiller::new().fulfill(&endpoint(), Some("application/json"));
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.header("content-type"), Some("application/json"));
        assert_eq!(reply.header("x-api-version"), Some("1.0"));
        assert_eq!(reply.body, Some(json!({ "code": "EUR" })));
    }

    #[test]
    fn test_wildcard_uses_first_produced_type() {
        let reply = MockFulfiller::new().fulfill(&endpoint(), Some("*/*"));
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.header("content-type"), Some("application/json"));

        let reply = MockFulfiller::new().fulfill(&endpoint(), None);
        assert_eq!(reply.body, Some(json!({ "code": "EUR" })));
    }

    #[test]
    fn test_unsupported_accept_is_415() {
        let reply = MockFulfiller::new().handle(&endpoint(), Some("application/xml"));
        assert_eq!(reply.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(reply.headers.is_empty());
        assert_eq!(reply.body, None);
    }

    #[test]
    fn test_missing_example_is_404_with_headers() {
        let reply = MockFulfiller::new().fulfill(&endpoint(), Some("text/plain"));
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.header("content-type"), Some("text/plain"));
        assert_eq!(reply.header("x-api-version"), Some("1.0"));
        assert_eq!(reply.body, None);
    }

    #[test]
    fn test_endpoint_without_examples_is_404() {
        let bare = EndpointDescriptor::new(HttpMethod::Get, "/test/endpoint");
        let reply = MockFulfiller::new().fulfill(&bare, None);
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.header("content-type"), Some("text/html"));
    }
}
