//! Messaging subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher (remote strategy)
//!     → forwarder.rs (topic = <prefix>.<method>_<uri>)
//!     → envelope.rs (RequestEnvelope → JSON payload)
//!     → transport.rs (Transport::request with timeout)
//!         → bus.rs (in-process MessageBus: responders, _INBOX replies)
//!         → nats.rs (NatsTransport: a NATS broker)
//!     → envelope.rs (ResponseEnvelope → Reply)
//!     → on failure: mock fallback | 503 | 500
//! ```
//!
//! # Design Decisions
//! - Transport is a trait so a broker-backed client can replace the bus
//! - The pending-reply table is the only shared mutable state

pub mod bus;
pub mod envelope;
pub mod forwarder;
pub mod nats;
pub mod transport;

pub use bus::MessageBus;
pub use envelope::{RequestEnvelope, ResponseEnvelope};
pub use forwarder::RemoteForwarder;
pub use nats::NatsTransport;
pub use transport::{Message, MessageHeaders, Transport, TransportError};
