//! Event and identifier types for the monitoring subsystem.
//!
//! These types are intentionally serializable so events can be streamed to
//! a presentation layer or logged as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::destination::Destination;
use crate::message::{MessageId, ObservedMessage};

/// Unique identifier for a monitor session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a monitor session.
///
/// `Stopped` is terminal: it is reached by an explicit stop or by fatal
/// connection loss, and a stopped session is never resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Poll ticks are being executed.
    Running,
    /// No further ticks will run.
    Stopped,
}

/// What a poll tick observed.
///
/// Within one tick and destination, removals are emitted before additions
/// so a live view can drop stale rows before inserting new ones.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A message not present in the previous snapshot.
    MessageAdded {
        destination: Destination,
        message: ObservedMessage,
    },

    /// A previously seen message is no longer present (consumed by another
    /// client or expired). A removal is an observation, not an error.
    MessageRemoved {
        destination: Destination,
        message_id: MessageId,
    },

    /// Recursive discovery found a new destination; it is now watched and
    /// its entire current content will be reported as new arrivals.
    DestinationAdded {
        destination: Destination,
    },

    /// The broker no longer lists a watched destination; it has been
    /// dropped from the watch set.
    DestinationRemoved {
        destination: Destination,
    },

    /// Browsing one destination failed this tick. Isolated: other
    /// destinations still ticked, and the last-seen state for this one is
    /// retained for the next attempt.
    BrowseFailed {
        destination: Destination,
        error: String,
    },

    /// The recursive discovery scan failed this tick; the current watch
    /// set was polled unchanged.
    RefreshFailed {
        error: String,
    },
}

impl EventKind {
    /// The destination this event concerns, if it is destination-scoped.
    #[must_use]
    pub const fn destination(&self) -> Option<&Destination> {
        match self {
            Self::MessageAdded { destination, .. }
            | Self::MessageRemoved { destination, .. }
            | Self::DestinationAdded { destination }
            | Self::DestinationRemoved { destination }
            | Self::BrowseFailed { destination, .. } => Some(destination),
            Self::RefreshFailed { .. } => None,
        }
    }

    /// Returns true for failure reports.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::BrowseFailed { .. } | Self::RefreshFailed { .. })
    }
}

/// A monitoring event emitted by a poll tick.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub event_id: Uuid,
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

impl MonitorEvent {
    pub(crate) fn new(session_id: SessionId, kind: EventKind) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            session_id,
            timestamp: Utc::now(),
            kind,
        }
    }
}
