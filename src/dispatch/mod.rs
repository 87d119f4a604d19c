//! Request dispatching subsystem.
//!
//! # Data Flow
//! ```text
//! axum route (one per endpoint)
//!     → request.rs (ApiRequest: headers, cookies, query, path params, body)
//!     → dispatcher.rs (pick strategy from flags + resolved handler)
//!         ├─ registry.rs (local ServiceHandler)
//!         ├─ mocking::MockFulfiller
//!         └─ messaging::RemoteForwarder
//!     → reply.rs (Reply → HTTP response)
//! ```
//!
//! # Design Decisions
//! - Decision tree is evaluated per request; no state survives a request
//! - Handlers are resolved by operationId when routes are built, not per call
//! - Local handlers run without a timeout; remote calls always have one

pub mod dispatcher;
pub mod registry;
pub mod reply;
pub mod request;

pub use dispatcher::{DispatchFlags, Dispatcher, EndpointRoute};
pub use registry::{
    HandlerRegistry, RegistryError, ServiceError, ServiceHandler, ServiceResponse, ServiceResult,
};
pub use reply::Reply;
pub use request::{ApiRequest, AuthenticatedUser, RequestError};
