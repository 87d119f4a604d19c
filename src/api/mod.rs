//! API description subsystem.
//!
//! # Data Flow
//! ```text
//! Swagger 2.0 / OpenAPI 3 document (YAML or JSON)
//!     → loader.rs (parse, walk paths/operations)
//!     → endpoint.rs (EndpointDescriptor, router path derived once)
//!     → Vec<EndpointDescriptor> (ordered, immutable)
//!     → http::server builds one route per descriptor
//! ```
//!
//! # Design Decisions
//! - Descriptors are plain data; fulfilment strategies live elsewhere
//! - method + route shape is unique across the table

pub mod endpoint;
pub mod loader;

pub use endpoint::{EndpointDescriptor, ExampleSet, HttpMethod, SuccessResponse};
pub use loader::{load_api, ApiError};
