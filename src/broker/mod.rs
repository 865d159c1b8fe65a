//! Broker session abstraction.
//!
//! The core treats the broker client as an external collaborator behind the
//! [`BrokerSession`] trait: destination listing, non-destructive browsing,
//! and message send. [`InMemoryBroker`] is the in-process reference
//! implementation used by tests and embedded callers.

/// In-memory broker backend.
pub mod memory;
/// Connection parameters and session traits.
pub mod session;

pub use memory::{InMemoryBroker, InMemorySession};
pub use session::{BrokerMetadata, BrokerSession, ConnectParams};
