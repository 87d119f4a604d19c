//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the adapter.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the webserver adapter.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Dispatch and routing behaviour.
    pub web_server: WebServerConfig,

    /// Remote forwarding over the messaging transport.
    pub messaging: MessagingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3007").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3007".to_string(),
        }
    }
}

/// Settings that drive how each endpoint gets fulfilled.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebServerConfig {
    /// Path to the Swagger/OpenAPI document describing the endpoints.
    pub rest_api_path: String,

    /// URI prefix applied to every registered route ("/" means no prefix).
    pub base_path: String,

    /// Never call local handlers, even when an endpoint declares an `operationId`.
    pub ignore_api_operation_ids: bool,

    /// Allow serving canned examples from the endpoint descriptors.
    pub enable_mocking: bool,

    /// Allow forwarding requests to remote peers over the messaging transport.
    pub use_messaging: bool,

    /// Add an `X-Response-Time` header to every response.
    pub use_response_time: bool,

    /// Regex patterns of request paths that are not logged verbosely.
    pub log_black_list: Vec<String>,

    /// Maximum accepted request body size in bytes.
    pub max_body_size: usize,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            rest_api_path: "api.yml".to_string(),
            base_path: "/".to_string(),
            ignore_api_operation_ids: false,
            enable_mocking: false,
            use_messaging: false,
            use_response_time: false,
            log_black_list: Vec::new(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

impl WebServerConfig {
    /// The prefix to prepend to route paths, empty when the base path is the root.
    pub fn route_prefix(&self) -> &str {
        if self.base_path == "/" {
            ""
        } else {
            &self.base_path
        }
    }
}

/// Messaging configuration for remote forwarding.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// NATS server URLs the binary connects to when messaging is enabled.
    pub servers: Vec<String>,

    /// Namespace prefix of the computed topic names.
    pub topic_prefix: String,

    /// Upper bound on awaiting a remote reply, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            topic_prefix: "api".to_string(),
            request_timeout_ms: 2000,
        }
    }
}

impl MessagingConfig {
    /// The reply timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:3007");
        assert_eq!(config.web_server.base_path, "/");
        assert!(!config.web_server.enable_mocking);
        assert!(!config.web_server.use_messaging);
        assert_eq!(config.messaging.request_timeout(), Duration::from_millis(2000));
        assert_eq!(config.messaging.servers, vec!["nats://localhost:4222".to_string()]);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [web_server]
            enable_mocking = true
            log_black_list = ["/health"]

            [messaging]
            topic_prefix = "easer"
            "#,
        )
        .unwrap();

        assert!(config.web_server.enable_mocking);
        assert_eq!(config.web_server.log_black_list, vec!["/health".to_string()]);
        assert_eq!(config.web_server.base_path, "/");
        assert_eq!(config.messaging.topic_prefix, "easer");
        assert_eq!(config.messaging.request_timeout_ms, 2000);
    }

    #[test]
    fn test_route_prefix() {
        let mut web = WebServerConfig::default();
        assert_eq!(web.route_prefix(), "");
        web.base_path = "/api/v1".into();
        assert_eq!(web.route_prefix(), "/api/v1");
    }
}
