//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that every log blacklist pattern compiles
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid bind address {address:?}: {reason}")]
    BindAddress { address: String, reason: String },

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("base path {0:?} must start with '/' and must not end with '/'")]
    BasePath(String),

    #[error("log blacklist pattern {pattern:?} does not compile: {source}")]
    BlacklistPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("messaging request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("topic prefix must not be empty when messaging is enabled")]
    EmptyTopicPrefix,

    #[error("at least one messaging server is required when messaging is enabled")]
    NoMessagingServers,
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.listener.bind_address.parse::<SocketAddr>() {
        errors.push(ValidationError::BindAddress {
            address: config.listener.bind_address.clone(),
            reason: e.to_string(),
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let base_path = &config.web_server.base_path;
    if !base_path.starts_with('/') || (base_path.len() > 1 && base_path.ends_with('/')) {
        errors.push(ValidationError::BasePath(base_path.clone()));
    }

    for pattern in &config.web_server.log_black_list {
        if let Err(source) = regex::Regex::new(pattern) {
            errors.push(ValidationError::BlacklistPattern {
                pattern: pattern.clone(),
                source,
            });
        }
    }

    if config.messaging.request_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.web_server.use_messaging && config.messaging.topic_prefix.is_empty() {
        errors.push(ValidationError::EmptyTopicPrefix);
    }

    if config.web_server.use_messaging && config.messaging.servers.is_empty() {
        errors.push(ValidationError::NoMessagingServers);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
