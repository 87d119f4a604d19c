//! Remote forwarding of API calls.
//!
//! # Responsibilities
//! - Compute the topic for an endpoint
//! - Publish the request envelope and await one correlated reply
//! - Map transport failures to HTTP replies, optionally substituting mocks
//!
//! # Design Decisions
//! - No retries: one round-trip per inbound request
//! - When mock fallback is enabled it takes precedence over the 503 mapping,
//!   so a topic nobody serves yet is answered from examples

use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use crate::api::EndpointDescriptor;
use crate::dispatch::{ApiRequest, Reply};
use crate::messaging::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::messaging::transport::{MessageHeaders, Transport, TransportError};
use crate::mocking::MockFulfiller;
use crate::observability::metrics;

pub const RPC_REQUEST_MESSAGE_TYPE: &str = "rpc/request";

/// Forwards requests to remote peers over a [`Transport`].
#[derive(Clone)]
pub struct RemoteForwarder {
    transport: Arc<dyn Transport>,
    topic_prefix: String,
    timeout: Duration,
    mock_fallback: bool,
    mock: MockFulfiller,
}

impl RemoteForwarder {
    pub fn new(transport: Arc<dyn Transport>, topic_prefix: impl Into<String>, timeout: Duration) -> Self {
        Self {
            transport,
            topic_prefix: topic_prefix.into(),
            timeout,
            mock_fallback: false,
            mock: MockFulfiller::new(),
        }
    }

    /// Answer failed round-trips from examples instead of 500/503.
    pub fn with_mock_fallback(mut self, enabled: bool) -> Self {
        self.mock_fallback = enabled;
        self
    }

    /// `<prefix>.<method>_<uri>`, e.g. `api.get_/users/{id}`.
    ///
    /// Distinct method/uri pairs give distinct topics as long as the method
    /// itself never contains `_`, which holds for every [`HttpMethod`](crate::api::HttpMethod).
    pub fn topic_name(&self, endpoint: &EndpointDescriptor) -> String {
        format!("{}.{}_{}", self.topic_prefix, endpoint.method, endpoint.uri)
    }

    /// Forward `request` and turn the outcome into a reply.
    pub async fn forward(&self, endpoint: &EndpointDescriptor, request: &ApiRequest, verbose: bool) -> Reply {
        let topic = self.topic_name(endpoint);
        let envelope = RequestEnvelope::new(&topic, endpoint, request);
        let payload = match serde_json::to_string(&envelope) {
            Ok(payload) => payload,
            Err(e) => return self.on_failure(endpoint, request, TransportError::Encoding(e.to_string())),
        };

        let mut headers = MessageHeaders::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        headers.insert("message-type".to_string(), RPC_REQUEST_MESSAGE_TYPE.to_string());

        let result = self
            .transport
            .request(&topic, payload, self.timeout, headers)
            .await
            .and_then(|message| {
                ResponseEnvelope::parse(&message.payload)
                    .map_err(|e| TransportError::Encoding(e.to_string()))
            });

        match result {
            Ok(envelope) => {
                if verbose {
                    tracing::debug!(
                        "RES {}",
                        serde_json::to_string(&envelope).unwrap_or_default()
                    );
                }
                envelope.into_reply()
            }
            Err(err) => self.on_failure(endpoint, request, err),
        }
    }

    fn on_failure(&self, endpoint: &EndpointDescriptor, request: &ApiRequest, err: TransportError) -> Reply {
        metrics::record_forward_error(err.code());
        tracing::error!(
            code = %err.code(),
            method = %endpoint.method,
            uri = %endpoint.uri,
            error = %err,
            "Remote call failed"
        );

        if self.mock_fallback {
            tracing::debug!(uri = %endpoint.uri, "Falling back to mock response");
            return self.mock.handle(endpoint, request.accept());
        }

        let body = serde_json::to_value(&err).unwrap_or_default();
        if err.is_service_unavailable() {
            Reply::error(StatusCode::SERVICE_UNAVAILABLE, body)
        } else {
            Reply::error(StatusCode::INTERNAL_SERVER_ERROR, body)
        }
    }
}
