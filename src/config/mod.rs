//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → config file (TOML) via loader.rs
//!     → WEBSERVER_* environment overrides via env.rs
//!     → CLI flags (main.rs)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; request handling only reads it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, resolve_config_with, ConfigError};
pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::MessagingConfig;
pub use schema::ObservabilityConfig;
pub use schema::WebServerConfig;
