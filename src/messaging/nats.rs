//! NATS-backed transport.
//!
//! Requests go out through the client's own inbox multiplexing; the reply
//! timeout is handed to the client so abandoned inboxes are released.

use async_nats::{Client, ConnectOptions, HeaderMap, RequestErrorKind, ServerAddr};
use futures_util::future::{BoxFuture, FutureExt};
use std::time::Duration;

use crate::config::MessagingConfig;
use crate::messaging::bus::remote_failure;
use crate::messaging::transport::{Message, MessageHeaders, Transport, TransportError};

/// [`Transport`] over a NATS connection.
#[derive(Clone)]
pub struct NatsTransport {
    client: Client,
}

impl NatsTransport {
    /// Connect to the servers listed in `config`.
    pub async fn connect(config: &MessagingConfig) -> Result<Self, TransportError> {
        let servers = config
            .servers
            .iter()
            .map(|url| url.parse::<ServerAddr>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        let client = ConnectOptions::new()
            .name(env!("CARGO_PKG_NAME"))
            .connect(servers)
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        tracing::info!(servers = ?config.servers, "Connected to NATS");
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn request_inner(
        &self,
        topic: &str,
        payload: String,
        timeout: Duration,
        headers: MessageHeaders,
    ) -> Result<Message, TransportError> {
        let request = async_nats::Request::new()
            .payload(payload.into())
            .headers(to_header_map(&headers))
            .timeout(Some(timeout));

        let reply = self
            .client
            .send_request(topic.to_string(), request)
            .await
            .map_err(|e| request_error(e.kind(), topic, timeout, e.to_string()))?;

        let reply = from_nats(&reply.payload, reply.headers.as_ref())?;
        match remote_failure(&reply) {
            Some(e) => Err(e),
            None => Ok(reply),
        }
    }
}

impl Transport for NatsTransport {
    fn request<'a>(
        &'a self,
        topic: &'a str,
        payload: String,
        timeout: Duration,
        headers: MessageHeaders,
    ) -> BoxFuture<'a, Result<Message, TransportError>> {
        self.request_inner(topic, payload, timeout, headers).boxed()
    }
}

fn to_header_map(headers: &MessageHeaders) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(name.as_str(), value.as_str());
    }
    map
}

fn from_nats(payload: &[u8], headers: Option<&HeaderMap>) -> Result<Message, TransportError> {
    let payload = String::from_utf8(payload.to_vec())
        .map_err(|e| TransportError::Encoding(e.to_string()))?;
    let mut message = Message::new(payload);
    for (name, values) in headers.into_iter().flat_map(HeaderMap::iter) {
        if let Some(value) = values.first() {
            message = message.with_header(&name.to_string(), value.to_string());
        }
    }
    Ok(message)
}

fn request_error(kind: RequestErrorKind, topic: &str, timeout: Duration, detail: String) -> TransportError {
    match kind {
        RequestErrorKind::TimedOut => TransportError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        },
        RequestErrorKind::NoResponders => TransportError::NoResponders {
            topic: topic.to_string(),
        },
        _ => TransportError::Connection(detail),
    }
}
