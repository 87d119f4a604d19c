//! Endpoint descriptors.
//!
//! # Responsibilities
//! - Normalized, immutable view of one API operation
//! - Derive the router path (`jsf_uri`) once at construction
//! - Match concrete request paths against the URI template
//!
//! # Design Decisions
//! - Descriptors are created at load time and shared via `Arc`
//! - Example sets keep declaration order (serde_json `preserve_order`),
//!   so "the first example" is stable across runs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// HTTP verbs an endpoint can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Trace,
    ];

    /// Lower-case name, as used in topic names and log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
            HttpMethod::Trace => "trace",
        }
    }

    /// Case-insensitive parse; `None` for anything that is not a known verb.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Example bodies of one media type, keyed by example name in declaration order.
pub type ExampleSet = Map<String, Value>;

/// The declared `200` response of an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse {
    /// Header values declared for the response (lower-cased names).
    pub headers: BTreeMap<String, String>,
    /// Media type → example name → example body.
    pub examples: BTreeMap<String, ExampleSet>,
}

/// Normalized description of one API operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    pub method: HttpMethod,
    /// The URI template as declared in the API document.
    pub uri: String,
    /// The URI template in router syntax.
    pub jsf_uri: String,
    /// Name of the local handler implementing this operation, if any.
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub consumes: Vec<String>,
    /// Producible media types, in declaration order.
    pub produces: Vec<String>,
    pub response: SuccessResponse,
}

impl EndpointDescriptor {
    /// Create a descriptor with no operationId, media types or examples.
    pub fn new(method: HttpMethod, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let jsf_uri = to_router_path(&uri);
        Self {
            method,
            uri,
            jsf_uri,
            operation_id: None,
            summary: None,
            consumes: Vec::new(),
            produces: Vec::new(),
            response: SuccessResponse::default(),
        }
    }

    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    pub fn with_produces<I, S>(mut self, media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.produces = media_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.response
            .headers
            .insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_example(mut self, media_type: &str, name: &str, value: Value) -> Self {
        self.response
            .examples
            .entry(media_type.to_string())
            .or_default()
            .insert(name.to_string(), value);
        self
    }

    /// The `content-type` declared on the 200 response, if any.
    pub fn declared_content_type(&self) -> Option<&str> {
        self.response
            .headers
            .get("content-type")
            .map(String::as_str)
    }

    /// The examples declared for `media_type`, if any.
    pub fn examples_for(&self, media_type: &str) -> Option<&ExampleSet> {
        self.response.examples.get(media_type)
    }

    /// Match a concrete request path against the URI template.
    ///
    /// Returns the captured path parameters in template order, or `None` when
    /// the path does not fit the template.
    pub fn path_params(&self, path: &str) -> Option<Vec<(String, String)>> {
        let template: Vec<&str> = split_segments(&self.jsf_uri).collect();
        let actual: Vec<&str> = split_segments(path).collect();
        if template.len() != actual.len() {
            return None;
        }

        let mut params = Vec::new();
        for (tpl, seg) in template.iter().zip(actual.iter()) {
            match param_name(tpl) {
                Some(name) => params.push((name.to_string(), seg.to_string())),
                None if tpl == seg => {}
                None => return None,
            }
        }
        Some(params)
    }

    /// Router path with every parameter name erased, for conflict detection.
    pub(crate) fn route_shape(&self) -> String {
        split_segments(&self.jsf_uri)
            .map(|seg| if param_name(seg).is_some() { "{}" } else { seg })
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn param_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .filter(|name| !name.is_empty())
}

/// Convert a declared URI template into router syntax.
///
/// `{param}` is kept, Express-style `:param` becomes `{param}`, a leading `/`
/// is ensured and trailing or doubled slashes are dropped.
pub fn to_router_path(uri: &str) -> String {
    let segments: Vec<String> = split_segments(uri.trim())
        .map(|seg| match seg.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{}}}", name),
            _ => seg.to_string(),
        })
        .collect();

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}
