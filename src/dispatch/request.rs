//! Normalized inbound requests.
//!
//! # Responsibilities
//! - Collect everything a fulfilment strategy may need from an HTTP request
//! - Decode the body once: JSON for JSON media types, text otherwise
//!
//! # Design Decisions
//! - Header names are lower-cased; repeated headers are joined with ", "
//! - Repeated query keys become arrays, single keys stay strings
//! - Path parameters are percent-decoded
//! - The authenticated user is whatever an upstream layer put in the
//!   [`AuthenticatedUser`] extension

use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, Method, Request};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::api::EndpointDescriptor;

/// Request extension carrying the caller's identity, set by an auth layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser(pub Value);

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("failed to read request body: {0}")]
    Body(#[from] axum::Error),
}

/// The request as seen by local handlers and remote peers.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub query: BTreeMap<String, Value>,
    pub path_params: BTreeMap<String, String>,
    pub body: Value,
    pub user: Option<Value>,
}

impl ApiRequest {
    /// Read and normalize `request`, buffering at most `body_limit` bytes.
    pub async fn from_http(
        request: Request<Body>,
        endpoint: &EndpointDescriptor,
        route_prefix: &str,
        body_limit: usize,
    ) -> Result<Self, RequestError> {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, body_limit).await?;
        Ok(Self::from_parts(&parts, bytes, endpoint, route_prefix))
    }

    /// Build from already buffered parts.
    pub fn from_parts(
        parts: &Parts,
        body: Bytes,
        endpoint: &EndpointDescriptor,
        route_prefix: &str,
    ) -> Self {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in &parts.headers {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            match headers.get_mut(name.as_str()) {
                Some(existing) => {
                    existing.push_str(", ");
                    existing.push_str(&value);
                }
                None => {
                    headers.insert(name.as_str().to_string(), value);
                }
            }
        }

        let cookies = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(parse_cookies)
            .collect();

        let path = parts.uri.path().to_string();
        let local_path = path.strip_prefix(route_prefix).unwrap_or(&path);
        let path_params = endpoint
            .path_params(local_path)
            .unwrap_or_default()
            .into_iter()
            .map(|(name, raw)| {
                let value = percent_decode_str(&raw).decode_utf8_lossy().into_owned();
                (name, value)
            })
            .collect();

        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());

        Self {
            method: parts.method.clone(),
            query: parse_query(parts.uri.query().unwrap_or_default()),
            path,
            headers,
            cookies,
            path_params,
            body: decode_body(content_type, &body),
            user: parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|u| u.0.clone()),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn accept(&self) -> Option<&str> {
        self.header("accept")
    }
}

fn parse_cookies(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"');
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

fn parse_query(query: &str) -> BTreeMap<String, Value> {
    let mut params: BTreeMap<String, Value> = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = Value::String(value.into_owned());
        match params.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                params.insert(key.into_owned(), value);
            }
        }
    }
    params
}

/// `application/json` or any `+json` suffix, parameters ignored.
fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

fn decode_body(content_type: Option<&str>, bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    let text = || Value::String(String::from_utf8_lossy(bytes).into_owned());
    match content_type {
        Some(ct) if is_json_media_type(ct) => serde_json::from_slice(bytes).unwrap_or_else(|_| text()),
        _ => text(),
    }
}
