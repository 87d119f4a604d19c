//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → SetRequestIdLayer (x-request-id, UUID v4)
//!     → access_log (timing, X-Response-Time, blacklist-aware log line)
//!     → body limit
//!     → server.rs route for the endpoint path (method table)
//!     → dispatch::Dispatcher
//!     → Reply → response
//! ```

pub mod middleware;
pub mod server;

pub use server::{HttpServer, StartupError};
