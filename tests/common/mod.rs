//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use webserver_adapter::api::loader::load_api_from_yaml;
use webserver_adapter::config::GatewayConfig;
use webserver_adapter::dispatch::HandlerRegistry;
use webserver_adapter::http::HttpServer;
use webserver_adapter::messaging::Transport;
use webserver_adapter::EndpointDescriptor;

pub const API_YAML: &str = r#"
swagger: "2.0"
info:
  title: Adapter test API
  version: "1.0"
produces:
  - application/json
paths:
  /monitoring/isAlive:
    get:
      operationId: monitoring.isAlive
      responses:
        200:
          description: alive
  /monitoring/broken:
    get:
      operationId: monitoring.broken
      responses:
        200:
          description: never succeeds
  /monitoring/missing:
    get:
      operationId: monitoring.missing
      responses:
        200:
          description: nobody implements this
  /currencies/{currency}:
    get:
      produces:
        - application/json
        - text/plain
      responses:
        200:
          description: a currency
          headers:
            X-Api-Version:
              type: string
              default: "1.0"
          examples:
            application/json:
              code: EUR
              name: Euro
  /test/endpoint:
    get:
      responses:
        200:
          description: no examples at all
  /users/{id}:
    get:
      responses:
        200:
          description: a user
    post:
      consumes:
        - application/json
      responses:
        200:
          description: updated user
"#;

pub fn endpoints() -> Vec<EndpointDescriptor> {
    load_api_from_yaml(API_YAML).expect("test API document must load")
}

/// Flags in the order (ignore_api_operation_ids, enable_mocking, use_messaging).
pub fn config(ignore_api_operation_ids: bool, enable_mocking: bool, use_messaging: bool) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.web_server.ignore_api_operation_ids = ignore_api_operation_ids;
    config.web_server.enable_mocking = enable_mocking;
    config.web_server.use_messaging = use_messaging;
    config.messaging.request_timeout_ms = 200;
    config
}

pub fn router(
    config: GatewayConfig,
    registry: &HandlerRegistry,
    transport: Option<Arc<dyn Transport>>,
) -> Router {
    HttpServer::new(config, endpoints(), registry, transport)
        .expect("server must build")
        .router()
}

pub fn get(uri: &str, accept: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(accept) = accept {
        builder = builder.header("accept", accept);
    }
    builder.body(Body::empty()).unwrap()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("body is not JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Drive one request through the router in-process.
pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse { status, headers, body }
}
