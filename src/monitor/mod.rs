//! Poll-and-diff monitoring subsystem.
//!
//! A [`MonitorSession`] watches a set of destinations by browsing each one
//! on a fixed cadence and diffing consecutive snapshots into arrival and
//! removal events. The engine is embedded-first (in-process) and exposes a
//! stream handle for consumers; the scheduler runs sessions on dedicated
//! worker threads.

/// Snapshot diffing.
pub mod diff;
/// Session state machine and tick execution.
pub mod engine;
/// Event and session identity types.
pub mod events;
/// Worker thread, handles and event streams.
pub mod scheduler;

pub use diff::{diff_snapshot, SnapshotDiff};
pub use engine::{MonitorSession, StopHandle};
pub use events::{EventKind, MonitorEvent, SessionId, SessionStatus};
pub use scheduler::{start_monitor, EventStream, MonitorHandle, MonitorRegistration, SchedulerConfig};
