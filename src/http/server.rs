//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create one Axum route per endpoint path under the base path
//! - Wire up middleware (request ID, access log, body limit, tracing)
//! - Hand each request to the dispatcher
//! - Serve with graceful shutdown
//!
//! # Design Decisions
//! - Routes are registered with positional parameter names (`{p0}`, `{p1}`),
//!   so templates that differ only in parameter naming share a route;
//!   the descriptor's own names are restored by `EndpointDescriptor::path_params`
//! - Method selection happens inside the route, so a path declared for some
//!   methods answers 405 with `Allow` for the others; `HEAD` falls back to `GET`
//! - Every path is also registered with a trailing slash
//! - Embedder layers sit inside the request-id and access-log layers:
//!   [`HttpServer::with_layer`] sees every request before routing,
//!   [`HttpServer::with_route_layer`] only requests that matched a declared path

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, Route},
    Router,
};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::{Layer, Service, ServiceBuilder};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::api::{EndpointDescriptor, HttpMethod};
use crate::config::GatewayConfig;
use crate::dispatch::{ApiRequest, Dispatcher, EndpointRoute, HandlerRegistry};
use crate::http::middleware::{access_log_middleware, AccessLog};
use crate::lifecycle::{ServerHandle, Shutdown};
use crate::messaging::Transport;
use crate::observability::LogBlacklist;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid log blacklist pattern: {0}")]
    Blacklist(#[from] regex::Error),

    #[error("messaging is enabled but no transport was provided")]
    MissingTransport,

    #[error("unsupported route template {uri:?}: parameters must span a whole segment")]
    UnsupportedTemplate { uri: String },

    #[error("endpoint {method} {uri} is declared more than once")]
    DuplicateRoute { method: HttpMethod, uri: String },
}

/// Endpoints sharing one router path, keyed by method.
type MethodTable = BTreeMap<HttpMethod, EndpointRoute>;

/// Application state injected into handlers.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    route_prefix: Arc<str>,
    body_limit: usize,
}

/// HTTP façade over the API description.
pub struct HttpServer {
    /// Declared routes plus embedder layers, without the ambient stack.
    routes: Router,
    access_log: AccessLog,
    config: GatewayConfig,
}

impl HttpServer {
    /// Build the server for `endpoints`.
    ///
    /// Local handlers are resolved from `registry` here, once. `transport` is
    /// required when messaging is enabled.
    pub fn new(
        config: GatewayConfig,
        endpoints: Vec<EndpointDescriptor>,
        registry: &HandlerRegistry,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Self, StartupError> {
        let web = &config.web_server;
        if web.use_messaging && transport.is_none() {
            return Err(StartupError::MissingTransport);
        }

        let dispatcher = Arc::new(Dispatcher::from_config(&config, transport)?);
        let routes = resolve_routes(endpoints, registry, web.ignore_api_operation_ids);

        let state = AppState {
            dispatcher,
            route_prefix: Arc::from(web.route_prefix()),
            body_limit: web.max_body_size,
        };
        let access_log = AccessLog {
            blacklist: LogBlacklist::new(&web.log_black_list)?,
            use_response_time: web.use_response_time,
        };

        let routes = Self::build_routes(&config, routes, state)?;
        Ok(Self {
            routes,
            access_log,
            config,
        })
    }

    fn build_routes(
        config: &GatewayConfig,
        routes: Vec<EndpointRoute>,
        state: AppState,
    ) -> Result<Router, StartupError> {
        let prefix = config.web_server.route_prefix();
        let mut tables: BTreeMap<String, MethodTable> = BTreeMap::new();
        for route in routes {
            let path = axum_path(prefix, &route.endpoint)?;
            let table = tables.entry(path).or_default();
            let method = route.endpoint.method;
            if table.contains_key(&method) {
                return Err(StartupError::DuplicateRoute {
                    method,
                    uri: route.endpoint.uri.clone(),
                });
            }
            table.insert(method, route);
        }

        let mut router = Router::new();
        for (path, table) in tables {
            tracing::debug!(
                path = %path,
                methods = ?table.keys().map(HttpMethod::as_str).collect::<Vec<_>>(),
                "Route registered"
            );
            let table = Arc::new(table);
            let method_router = any(move |State(state): State<AppState>, request: Request<Body>| {
                let table = Arc::clone(&table);
                async move { handle(state, &table, request).await }
            });
            if path != "/" {
                router = router.route(&format!("{}/", path), method_router.clone());
            }
            router = router.route(&path, method_router);
        }

        Ok(router.with_state(state))
    }

    /// Add a layer that runs for every request, before routing.
    ///
    /// Layers added later wrap the ones added earlier.
    pub fn with_layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request<Body>> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request<Body>>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request<Body>>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request<Body>>>::Future: Send + 'static,
    {
        self.routes = self.routes.layer(layer);
        self
    }

    /// Add a layer that runs only for requests matching a declared path.
    ///
    /// Unknown paths answer 404 without reaching it. Does nothing when the
    /// API declares no endpoints.
    pub fn with_route_layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request<Body>> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request<Body>>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request<Body>>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request<Body>>>::Future: Send + 'static,
    {
        if self.routes.has_routes() {
            self.routes = self.routes.route_layer(layer);
        } else {
            tracing::warn!("No routes declared; route layer ignored");
        }
        self
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.routes.clone().layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(middleware::from_fn_with_state(
                    self.access_log.clone(),
                    access_log_middleware,
                ))
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(self.config.web_server.max_body_size)),
        )
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            base_path = %self.config.web_server.base_path,
            "HTTP server starting"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve in a background task, returning a handle to stop it.
    pub fn start(self, listener: TcpListener) -> Result<ServerHandle, io::Error> {
        let local_addr = listener.local_addr()?;
        let shutdown = Shutdown::new();
        let task = tokio::spawn(self.run(listener, shutdown.subscribe()));
        Ok(ServerHandle::new(local_addr, shutdown, task))
    }
}

/// Pair each endpoint with its handler, warning about unresolved operationIds.
fn resolve_routes(
    endpoints: Vec<EndpointDescriptor>,
    registry: &HandlerRegistry,
    ignore_operation_ids: bool,
) -> Vec<EndpointRoute> {
    endpoints
        .into_iter()
        .map(|endpoint| {
            let route = EndpointRoute::resolve(endpoint, registry);
            if !ignore_operation_ids && route.handler.is_none() {
                if let Some(operation_id) = &route.endpoint.operation_id {
                    tracing::warn!(
                        operation_id = %operation_id,
                        method = %route.endpoint.method,
                        uri = %route.endpoint.uri,
                        "No service handler registered; endpoint will answer 501"
                    );
                }
            }
            route
        })
        .collect()
}

/// Router path for `endpoint` under `prefix`, with positional parameter names.
fn axum_path(prefix: &str, endpoint: &EndpointDescriptor) -> Result<String, StartupError> {
    let mut index = 0;
    let mut segments = Vec::new();
    for segment in endpoint.jsf_uri.split('/').filter(|s| !s.is_empty()) {
        let is_param = segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}');
        let inner = if is_param { &segment[1..segment.len() - 1] } else { segment };
        if inner.contains(['{', '}', '*']) {
            return Err(StartupError::UnsupportedTemplate {
                uri: endpoint.uri.clone(),
            });
        }
        if is_param {
            segments.push(format!("{{p{}}}", index));
            index += 1;
        } else {
            segments.push(segment.to_string());
        }
    }

    let local = format!("/{}", segments.join("/"));
    Ok(match (prefix.is_empty(), local.as_str()) {
        (true, _) => local,
        (false, "/") => prefix.to_string(),
        (false, _) => format!("{}{}", prefix, local),
    })
}

async fn handle(state: AppState, table: &MethodTable, request: Request<Body>) -> Response {
    let route = match select_route(table, request.method()) {
        Some(route) => route,
        None => return method_not_allowed(table),
    };

    let api_request = match ApiRequest::from_http(
        request,
        &route.endpoint,
        &state.route_prefix,
        state.body_limit,
    )
    .await
    {
        Ok(api_request) => api_request,
        Err(e) => {
            tracing::warn!(uri = %route.endpoint.uri, error = %e, "Rejecting request body");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    state.dispatcher.dispatch(route, api_request).await.into_response()
}

/// The endpoint declared for `method`; `HEAD` is served by the `GET` endpoint.
fn select_route<'a>(table: &'a MethodTable, method: &Method) -> Option<&'a EndpointRoute> {
    let method = HttpMethod::parse(method.as_str())?;
    table.get(&method).or_else(|| match method {
        HttpMethod::Head => table.get(&HttpMethod::Get),
        _ => None,
    })
}

fn method_not_allowed(table: &MethodTable) -> Response {
    let mut allowed: Vec<String> = table
        .keys()
        .map(|m| m.as_str().to_ascii_uppercase())
        .collect();
    if table.contains_key(&HttpMethod::Get) && !table.contains_key(&HttpMethod::Head) {
        allowed.push("HEAD".to_string());
    }
    let allow = allowed.join(", ");
    let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(uri: &str) -> EndpointDescriptor {
        EndpointDescriptor::new(HttpMethod::Get, uri)
    }

    #[test]
    fn test_axum_path() {
        assert_eq!(axum_path("", &ep("/users/{id}/posts/{postId}")).unwrap(), "/users/{p0}/posts/{p1}");
        assert_eq!(axum_path("/v1", &ep("/users")).unwrap(), "/v1/users");
        assert_eq!(axum_path("/v1", &ep("/")).unwrap(), "/v1");
        assert_eq!(axum_path("", &ep("/")).unwrap(), "/");
    }

    #[test]
    fn test_partial_segment_parameters_rejected() {
        assert!(matches!(
            axum_path("", &ep("/files/{name}.json")),
            Err(StartupError::UnsupportedTemplate { .. })
        ));
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let mut table = MethodTable::new();
        table.insert(
            HttpMethod::Get,
            EndpointRoute::resolve(ep("/x"), &HandlerRegistry::new()),
        );
        let route = select_route(&table, &Method::HEAD).unwrap();
        assert_eq!(route.endpoint.method, HttpMethod::Get);
        assert!(select_route(&table, &Method::POST).is_none());

        let response = method_not_allowed(&table);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD");
    }

    #[test]
    fn test_route_layer_without_routes_is_ignored() {
        let server = HttpServer::new(GatewayConfig::default(), vec![], &HandlerRegistry::new(), None)
            .unwrap()
            .with_route_layer(middleware::from_fn(
                |request: Request<Body>, next: middleware::Next| async move { next.run(request).await },
            ));
        let _ = server.router();
    }

    #[test]
    fn test_messaging_requires_transport() {
        let mut config = GatewayConfig::default();
        config.web_server.use_messaging = true;
        let result = HttpServer::new(config, vec![], &HandlerRegistry::new(), None);
        assert!(matches!(result, Err(StartupError::MissingTransport)));
    }

    #[test]
    fn test_duplicate_routes_rejected() {
        let result = HttpServer::new(
            GatewayConfig::default(),
            vec![ep("/a/{x}"), ep("/a/:y")],
            &HandlerRegistry::new(),
            None,
        );
        assert!(matches!(result, Err(StartupError::DuplicateRoute { .. })));
    }
}
