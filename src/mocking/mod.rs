//! Mocking subsystem.
//!
//! # Data Flow
//! ```text
//! (EndpointDescriptor, Accept header)
//!     → media_type.rs (single-value negotiation against `produces`)
//!     → fulfiller.rs (first example for the negotiated type)
//!     → Reply: 200 example | 404 no example | 415 unsupported
//! ```
//!
//! # Design Decisions
//! - Synchronous and side-effect free; safe from any task without locking
//! - Shared by direct mocking and the forwarder's fallback

pub mod fulfiller;
pub mod media_type;

pub use fulfiller::MockFulfiller;
pub use media_type::{resolve, UnsupportedMediaType};
