//! Webserver adapter: an HTTP façade generated from an API description.
//!
//! Each declared operation becomes a live route. Per request the dispatcher
//! picks one fulfilment strategy: a locally registered handler, a canned
//! example from the document, or a remote call over request/reply messaging.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌───────────────────────────────────────────────────┐
//!                       │                 WEBSERVER ADAPTER                  │
//!                       │                                                    │
//!   Client Request      │  ┌─────────┐    ┌────────────┐    ┌────────────┐  │
//!   ────────────────────┼─▶│  http   │───▶│  dispatch  │───▶│  registry  │  │
//!                       │  │ server  │    │ dispatcher │    │  (local)   │  │
//!                       │  └─────────┘    └─────┬──────┘    └────────────┘  │
//!                       │                       │                            │
//!                       │             ┌─────────┴─────────┐                  │
//!                       │             ▼                   ▼                  │
//!                       │      ┌────────────┐      ┌─────────────┐           │     Remote
//!                       │      │  mocking   │◀─────│  messaging  │◀──────────┼──── peers
//!                       │      │ (examples) │ fall │ (forwarder) │           │
//!                       │      └────────────┘ back └─────────────┘           │
//!                       │                                                    │
//!                       │  api (descriptors) · config · observability ·      │
//!                       │  lifecycle                                         │
//!                       └───────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod api;
pub mod dispatch;
pub mod http;
pub mod messaging;
pub mod mocking;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use api::{load_api, EndpointDescriptor, HttpMethod};
pub use config::GatewayConfig;
pub use dispatch::{ApiRequest, HandlerRegistry, Reply, ServiceError, ServiceResponse};
pub use http::HttpServer;
pub use lifecycle::{ServerHandle, Shutdown};
pub use messaging::{MessageBus, NatsTransport, Transport};
