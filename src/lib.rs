//! # QueueScope - Broker Destination Monitoring
//!
//! QueueScope watches queues and topics on a message broker by taking
//! non-destructive browse snapshots on a fixed cadence and diffing
//! consecutive snapshots into arrival and removal events. It also supports
//! copying an observed message into an editable draft and sending the
//! edited copy as a brand-new message.
//!
//! ## Core Concepts
//!
//! - **Destination**: A named queue or topic, identified by `(name, kind)`
//! - **ObservedMessage**: An immutable snapshot of one browsed message
//! - **MonitorSession**: A poll-and-diff watch over a set of destinations
//! - **MessageDraft**: A detached, editable copy awaiting send
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use queuescope::{
//!     start_monitor, ConnectParams, Destination, InMemoryBroker,
//!     MonitorSession, SchedulerConfig,
//! };
//!
//! let broker = InMemoryBroker::new();
//! let session = Arc::new(broker.connect(&ConnectParams::default())?);
//!
//! // Watch one queue plus everything discovered later.
//! let monitor = MonitorSession::new([Destination::queue("orders")], true);
//! let registration = start_monitor(monitor, session, SchedulerConfig::default());
//!
//! while let Ok(event) = registration.stream.recv() {
//!     println!("{event:?}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod destination;
pub mod error;
pub mod message;
pub mod properties;

// Broker access and destination discovery
pub mod broker;
pub mod registry;

// Monitoring and edit-and-resend
pub mod editor;
pub mod monitor;

// Re-export primary types at crate root for convenience
pub use broker::{BrokerMetadata, BrokerSession, ConnectParams, InMemoryBroker, InMemorySession};
pub use destination::{Destination, DestinationKind};
pub use editor::{MessageDraft, SendFailed};
pub use error::{
    BrokerError, ConnectionError, ScopeError, ScopeResult, SendError, StreamError,
};
pub use message::{MessageBody, MessageId, ObservedMessage};
pub use monitor::{
    start_monitor, diff_snapshot, EventKind, EventStream, MonitorEvent, MonitorHandle,
    MonitorRegistration, MonitorSession, SchedulerConfig, SessionId, SessionStatus, SnapshotDiff,
    StopHandle,
};
pub use properties::{PropertyMap, PropertyParseError};
pub use registry::{DestinationDelta, DestinationRegistry};
