//! Local service handlers.
//!
//! # Responsibilities
//! - Define the interface a local operation implementation exposes
//! - Map operationIds to handlers, populated once at startup
//!
//! # Design Decisions
//! - Registration validates identifiers; lookups never fail at request time
//!   because routes resolve their handler when the server is built
//! - Any `Fn(ApiRequest, Arc<EndpointDescriptor>) -> impl Future` is a handler

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use crate::api::EndpointDescriptor;
use crate::dispatch::request::ApiRequest;

/// Successful result of a local handler, written with status 200.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceResponse {
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl ServiceResponse {
    pub fn json(body: Value) -> Self {
        Self {
            headers: BTreeMap::new(),
            body: Some(body),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }
}

/// Rejection from a local handler. A missing status means 500.
#[derive(Debug, Clone, Default, PartialEq, Error)]
#[error("service call failed (status {status:?})")]
pub struct ServiceError {
    pub status: Option<u16>,
    pub headers: Option<BTreeMap<String, String>>,
    pub body: Option<Value>,
}

impl ServiceError {
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

pub type ServiceResult = Result<ServiceResponse, ServiceError>;

/// A local implementation of an API operation.
pub trait ServiceHandler: Send + Sync {
    fn call(
        &self,
        request: ApiRequest,
        endpoint: Arc<EndpointDescriptor>,
    ) -> BoxFuture<'static, ServiceResult>;
}

impl<F, Fut> ServiceHandler for F
where
    F: Fn(ApiRequest, Arc<EndpointDescriptor>) -> Fut + Send + Sync,
    Fut: Future<Output = ServiceResult> + Send + 'static,
{
    fn call(
        &self,
        request: ApiRequest,
        endpoint: Arc<EndpointDescriptor>,
    ) -> BoxFuture<'static, ServiceResult> {
        self(request, endpoint).boxed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("operationId must not be empty")]
    Empty,

    #[error("invalid operationId {0:?}: expected dot-separated identifiers")]
    Malformed(String),

    #[error("a handler is already registered for operationId {0:?}")]
    Duplicate(String),
}

/// Explicit operationId → handler table.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ServiceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under a dotted operationId such as `monitoring.isAlive`.
    pub fn register<H>(&mut self, operation_id: &str, handler: H) -> Result<(), RegistryError>
    where
        H: ServiceHandler + 'static,
    {
        validate_operation_id(operation_id)?;
        if self.handlers.contains_key(operation_id) {
            return Err(RegistryError::Duplicate(operation_id.to_string()));
        }
        self.handlers
            .insert(operation_id.to_string(), Arc::new(handler));
        tracing::debug!(operation_id = %operation_id, "Service handler registered");
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<H>(mut self, operation_id: &str, handler: H) -> Result<Self, RegistryError>
    where
        H: ServiceHandler + 'static,
    {
        self.register(operation_id, handler)?;
        Ok(self)
    }

    pub fn get(&self, operation_id: &str) -> Option<Arc<dyn ServiceHandler>> {
        self.handlers.get(operation_id).cloned()
    }

    pub fn contains(&self, operation_id: &str) -> bool {
        self.handlers.contains_key(operation_id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.handlers.keys().collect();
        ids.sort();
        f.debug_struct("HandlerRegistry")
            .field("operation_ids", &ids)
            .finish()
    }
}

fn validate_operation_id(operation_id: &str) -> Result<(), RegistryError> {
    if operation_id.is_empty() {
        return Err(RegistryError::Empty);
    }
    let well_formed = operation_id.split('.').all(|segment| {
        let mut chars = segment.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => chars
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '-'),
            _ => false,
        }
    });
    if well_formed {
        Ok(())
    } else {
        Err(RegistryError::Malformed(operation_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn alive(_req: ApiRequest, _ep: Arc<EndpointDescriptor>) -> ServiceResult {
        Ok(ServiceResponse::json(json!({ "status": "OK" })))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = HandlerRegistry::new()
            .with("monitoring.isAlive", alive)
            .unwrap();
        assert!(registry.contains("monitoring.isAlive"));
        assert!(registry.get("monitoring.isAlive").is_some());
        assert!(registry.get("monitoring.isDead").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rejects_bad_ids() {
        let mut registry = HandlerRegistry::new();
        assert_eq!(registry.register("", alive), Err(RegistryError::Empty));
        for bad in ["monitoring.", ".isAlive", "a..b", "1abc", "has space"] {
            assert!(
                matches!(registry.register(bad, alive), Err(RegistryError::Malformed(_))),
                "{bad} should be rejected"
            );
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut registry = HandlerRegistry::new();
        registry.register("svc.op", alive).unwrap();
        assert_eq!(
            registry.register("svc.op", alive),
            Err(RegistryError::Duplicate("svc.op".to_string()))
        );
    }

    #[tokio::test]
    async fn test_closure_handler() {
        let greeting = "hello".to_string();
        let handler = move |req: ApiRequest, _ep: Arc<EndpointDescriptor>| {
            let greeting = greeting.clone();
            async move {
                Ok::<_, ServiceError>(ServiceResponse::json(
                    json!({ "greeting": greeting, "path": req.path }),
                ))
            }
        };
        let registry = HandlerRegistry::new().with("svc.greet", handler).unwrap();

        let endpoint = Arc::new(EndpointDescriptor::new(crate::api::HttpMethod::Get, "/greet"));
        let (parts, _) = axum::http::Request::builder()
            .uri("/greet")
            .body(())
            .unwrap()
            .into_parts();
        let request = ApiRequest::from_parts(&parts, Default::default(), &endpoint, "");

        let result = registry
            .get("svc.greet")
            .unwrap()
            .call(request, endpoint)
            .await
            .unwrap();
        assert_eq!(result.body, Some(json!({ "greeting": "hello", "path": "/greet" })));
    }
}
