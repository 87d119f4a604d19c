//! Access log middleware.
//! One line per completed request, skipped for blacklisted paths.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::observability::LogBlacklist;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_RESPONSE_TIME: HeaderName = HeaderName::from_static("x-response-time");

/// Middleware state.
#[derive(Debug, Clone, Default)]
pub struct AccessLog {
    pub blacklist: LogBlacklist,
    /// Add an `X-Response-Time: <ms>ms` header to every response.
    pub use_response_time: bool,
}

pub async fn access_log_middleware(
    State(log): State<AccessLog>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let mut response = next.run(request).await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    if log.use_response_time {
        if let Ok(value) = HeaderValue::from_str(&format!("{:.3}ms", elapsed_ms)) {
            response.headers_mut().insert(X_RESPONSE_TIME, value);
        }
    }

    if !log.blacklist.is_blacklisted(&path) {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            duration_ms = elapsed_ms,
            "Request completed"
        );
    }

    response
}
