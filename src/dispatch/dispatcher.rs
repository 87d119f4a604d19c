//! Per-request strategy selection.
//!
//! # Responsibilities
//! - Choose local handler, mock, remote forward or 501 for each request
//! - Turn local handler outcomes into replies
//! - Emit the REQ/RES debug lines unless the endpoint is blacklisted
//!
//! # Decision Order
//! ```text
//! operationId set and not ignored?
//!   ├─ handler registered → call it
//!   └─ otherwise          → 501 (non-existing service function)
//! else mocking and not messaging → mock
//! else messaging                 → remote (may fall back to mock)
//! else                           → 501 (not implemented)
//! ```

use axum::http::StatusCode;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::api::EndpointDescriptor;
use crate::config::GatewayConfig;
use crate::dispatch::registry::{HandlerRegistry, ServiceHandler};
use crate::dispatch::reply::{Reply, JSON_CONTENT_TYPE};
use crate::dispatch::request::ApiRequest;
use crate::messaging::{RemoteForwarder, Transport};
use crate::mocking::MockFulfiller;
use crate::observability::{metrics, LogBlacklist};

pub const UNKNOWN_OPERATION_MESSAGE: &str =
    "The operationId refers to a non-existing service function";
pub const NOT_IMPLEMENTED_MESSAGE: &str =
    "The endpoint is either not implemented or `operationId` is ignored";

/// Process-wide strategy switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchFlags {
    pub ignore_api_operation_ids: bool,
    pub enable_mocking: bool,
    pub use_messaging: bool,
}

impl DispatchFlags {
    /// Mock fallback for failed remote calls needs all three switches.
    pub fn mock_fallback(&self) -> bool {
        self.use_messaging && self.enable_mocking && self.ignore_api_operation_ids
    }
}

/// An endpoint together with its handler, resolved once at startup.
#[derive(Clone)]
pub struct EndpointRoute {
    pub endpoint: Arc<EndpointDescriptor>,
    pub handler: Option<Arc<dyn ServiceHandler>>,
}

impl EndpointRoute {
    pub fn resolve(endpoint: EndpointDescriptor, registry: &HandlerRegistry) -> Self {
        let handler = endpoint
            .operation_id
            .as_deref()
            .and_then(|id| registry.get(id));
        Self {
            endpoint: Arc::new(endpoint),
            handler,
        }
    }
}

/// Decides and runs the fulfilment strategy of each request.
#[derive(Clone)]
pub struct Dispatcher {
    flags: DispatchFlags,
    blacklist: LogBlacklist,
    mock: MockFulfiller,
    forwarder: Option<RemoteForwarder>,
}

impl Dispatcher {
    pub fn new(flags: DispatchFlags, blacklist: LogBlacklist, forwarder: Option<RemoteForwarder>) -> Self {
        Self {
            flags,
            blacklist,
            mock: MockFulfiller::new(),
            forwarder,
        }
    }

    /// Build from configuration. The transport is only used when messaging is on.
    pub fn from_config(
        config: &GatewayConfig,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Self, regex::Error> {
        let web = &config.web_server;
        let flags = DispatchFlags {
            ignore_api_operation_ids: web.ignore_api_operation_ids,
            enable_mocking: web.enable_mocking,
            use_messaging: web.use_messaging,
        };
        let blacklist = LogBlacklist::new(&web.log_black_list)?;
        let forwarder = transport.filter(|_| flags.use_messaging).map(|transport| {
            RemoteForwarder::new(
                transport,
                config.messaging.topic_prefix.clone(),
                config.messaging.request_timeout(),
            )
            .with_mock_fallback(flags.mock_fallback())
        });
        Ok(Self::new(flags, blacklist, forwarder))
    }

    pub fn flags(&self) -> DispatchFlags {
        self.flags
    }

    pub fn blacklist(&self) -> &LogBlacklist {
        &self.blacklist
    }

    /// Handle one request for `route`.
    pub async fn dispatch(&self, route: &EndpointRoute, request: ApiRequest) -> Reply {
        let start = Instant::now();
        let endpoint = &route.endpoint;
        let verbose = !self.blacklist.is_blacklisted(&endpoint.uri);
        if verbose {
            tracing::debug!("REQ method:\"{}\" uri:\"{}\"", endpoint.method, endpoint.uri);
        }

        let (strategy, reply) = match endpoint.operation_id.as_deref() {
            Some(operation_id) if !self.flags.ignore_api_operation_ids => match &route.handler {
                Some(handler) => (
                    "local",
                    self.call_local(handler, operation_id, endpoint, request, verbose)
                        .await,
                ),
                None => {
                    tracing::error!(
                        operation_id = %operation_id,
                        uri = %endpoint.uri,
                        "{}",
                        UNKNOWN_OPERATION_MESSAGE
                    );
                    ("unresolved", Reply::not_implemented(UNKNOWN_OPERATION_MESSAGE))
                }
            },
            _ if self.flags.enable_mocking && !self.flags.use_messaging => {
                ("mock", self.mock.handle(endpoint, request.accept()))
            }
            _ if self.flags.use_messaging => ("remote", self.forward(endpoint, &request, verbose).await),
            _ => ("none", Reply::not_implemented(NOT_IMPLEMENTED_MESSAGE)),
        };

        metrics::record_dispatch(strategy, reply.status.as_u16(), start);
        reply
    }

    async fn forward(&self, endpoint: &EndpointDescriptor, request: &ApiRequest, verbose: bool) -> Reply {
        match &self.forwarder {
            Some(forwarder) => forwarder.forward(endpoint, request, verbose).await,
            None => {
                tracing::error!(uri = %endpoint.uri, "Messaging is enabled but no transport is attached");
                Reply::new(StatusCode::SERVICE_UNAVAILABLE)
            }
        }
    }

    async fn call_local(
        &self,
        handler: &Arc<dyn ServiceHandler>,
        operation_id: &str,
        endpoint: &Arc<EndpointDescriptor>,
        request: ApiRequest,
        verbose: bool,
    ) -> Reply {
        match handler.call(request, Arc::clone(endpoint)).await {
            Ok(response) => {
                if verbose {
                    tracing::debug!(
                        operation_id = %operation_id,
                        "RES {}",
                        response
                            .body
                            .as_ref()
                            .map(|b| b.to_string())
                            .unwrap_or_default()
                    );
                }
                let mut reply = Reply::new(StatusCode::OK).with_headers(response.headers);
                reply.body = response.body;
                reply
            }
            Err(err) => {
                tracing::error!(
                    operation_id = %operation_id,
                    status = ?err.status,
                    body = ?err.body,
                    "Service call rejected"
                );
                let status = err
                    .status
                    .and_then(|s| StatusCode::from_u16(s).ok())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let headers = err.headers.unwrap_or_else(default_error_headers);
                let mut reply = Reply::new(status).with_headers(headers);
                reply.body = err.body;
                reply
            }
        }
    }
}

fn default_error_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("content-type".to_string(), JSON_CONTENT_TYPE.to_string())])
}
