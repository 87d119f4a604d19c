//! HTTP middleware.

pub mod access_log;

pub use access_log::{access_log_middleware, AccessLog, X_REQUEST_ID, X_RESPONSE_TIME};
