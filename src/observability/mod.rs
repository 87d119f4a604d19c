//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Gate for verbose request logging:
//!     → blacklist.rs (path patterns exempt from REQ/RES lines and access log)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through all subsystems
//! - Metrics are cheap (atomic increments)

pub mod blacklist;
pub mod logging;
pub mod metrics;

pub use blacklist::LogBlacklist;
