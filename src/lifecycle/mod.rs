//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Load API → Build server → Bind → ServerHandle
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - No process-wide server handle: `HttpServer::start` returns a
//!   [`ServerHandle`] owned by the caller
//! - Pending remote replies are released by their own timeouts on shutdown

pub mod handle;
pub mod shutdown;
pub mod signals;

pub use handle::ServerHandle;
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
