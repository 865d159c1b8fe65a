//! The monitor session state machine.
//!
//! A [`MonitorSession`] owns the watch set and per-destination `last_seen`
//! id sets, and advances one atomic poll tick at a time. `poll_tick` is a
//! plain synchronous method: the production scheduler drives it from a
//! timer thread, and tests drive it directly with synthetic ticks.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::broker::session::BrokerSession;
use crate::destination::Destination;
use crate::error::BrokerError;
use crate::message::MessageId;
use crate::registry::DestinationRegistry;

use super::diff::{diff_snapshot, SnapshotDiff};
use super::events::{EventKind, MonitorEvent, SessionId, SessionStatus};

/// Cloneable handle used to request a stop from outside the tick loop.
///
/// The flag is checked before each destination's browse within a tick, so
/// a stop takes effect within at most one in-flight browse latency.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Requests a stop. Idempotent and non-blocking.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns true once a stop has been requested.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// One monitoring session over a set of destinations.
///
/// In recursive mode the session re-runs destination discovery at the
/// start of every tick and starts watching whatever appears; a fixed
/// (non-recursive) session never gains or loses destinations after start.
///
/// All state is mutated only by `poll_tick` and `stop`, and the scheduler
/// runs ticks sequentially on one thread, so no locking is needed beyond
/// the stop flag.
pub struct MonitorSession {
    id: SessionId,
    recursive: bool,
    watched: BTreeSet<Destination>,
    last_seen: HashMap<Destination, HashSet<MessageId>>,
    registry: DestinationRegistry,
    status: SessionStatus,
    stop: Arc<AtomicBool>,
}

impl MonitorSession {
    /// Creates a running session watching the given destinations.
    ///
    /// Every destination starts with an empty `last_seen` set, so its
    /// first successful browse reports the entire current content as new
    /// arrivals. That is the documented semantics: monitoring begins at
    /// the moment of first observation.
    #[must_use]
    pub fn new(destinations: impl IntoIterator<Item = Destination>, recursive: bool) -> Self {
        let watched: BTreeSet<Destination> = destinations.into_iter().collect();
        Self {
            id: SessionId::new(),
            recursive,
            registry: DestinationRegistry::with_known(watched.iter().cloned()),
            watched,
            last_seen: HashMap::new(),
            status: SessionStatus::Running,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns true for recursive-discovery sessions.
    #[must_use]
    pub const fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// The destinations currently being watched.
    #[must_use]
    pub const fn watched(&self) -> &BTreeSet<Destination> {
        &self.watched
    }

    /// The ids seen in the last successful browse of a destination.
    #[must_use]
    pub fn last_seen(&self, destination: &Destination) -> Option<&HashSet<MessageId>> {
        self.last_seen.get(destination)
    }

    /// A handle that can stop this session from another thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop),
        }
    }

    /// Stops the session. Terminal: no further tick produces events.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.status = SessionStatus::Stopped;
    }

    /// Executes one poll tick and returns its ordered event list.
    ///
    /// Per destination: browse, diff against `last_seen`, emit removals
    /// first (sorted by id) then additions in browse order, then commit
    /// the new id set. A browse failure yields one `BrowseFailed` event
    /// and leaves that destination's `last_seen` untouched, so the next
    /// good tick diffs against last-known-good state instead of flooding
    /// with false "new" events.
    ///
    /// If a stop is requested mid-tick the tick's results are discarded:
    /// callers never observe a partial tick.
    ///
    /// Losing the connection (`NotConnected`) is terminal: the failure is
    /// reported and the session transitions to `Stopped`. Per-destination
    /// broker failures are not.
    pub fn poll_tick(&mut self, broker: &dyn BrokerSession) -> Vec<MonitorEvent> {
        if self.stop.load(Ordering::Acquire) {
            self.status = SessionStatus::Stopped;
            return Vec::new();
        }
        if self.status == SessionStatus::Stopped {
            return Vec::new();
        }

        let mut events = Vec::new();

        if self.recursive {
            self.rescan_destinations(broker, &mut events);
            if self.status == SessionStatus::Stopped {
                return events;
            }
        }

        let targets: Vec<Destination> = self.watched.iter().cloned().collect();
        for destination in targets {
            if self.stop.load(Ordering::Acquire) {
                self.status = SessionStatus::Stopped;
                return Vec::new();
            }
            self.tick_destination(broker, &destination, &mut events);
            // Connection loss is terminal, unlike per-destination failures.
            if self.status == SessionStatus::Stopped {
                break;
            }
        }

        events
    }

    fn rescan_destinations(&mut self, broker: &dyn BrokerSession, events: &mut Vec<MonitorEvent>) {
        match self.registry.refresh(broker) {
            Ok(delta) => {
                for destination in delta.added {
                    // Pre-seeded initial destinations are already watched.
                    if self.watched.insert(destination.clone()) {
                        self.last_seen.insert(destination.clone(), HashSet::new());
                        debug!(destination = %destination, "now watching discovered destination");
                        events.push(MonitorEvent::new(
                            self.id,
                            EventKind::DestinationAdded { destination },
                        ));
                    }
                }
                for destination in delta.removed {
                    if self.watched.remove(&destination) {
                        self.last_seen.remove(&destination);
                        debug!(destination = %destination, "destination gone, dropped from watch set");
                        events.push(MonitorEvent::new(
                            self.id,
                            EventKind::DestinationRemoved { destination },
                        ));
                    }
                }
            }
            Err(error) => {
                warn!(error = %error, "destination rescan failed, keeping current watch set");
                let lost_connection = matches!(error, BrokerError::NotConnected);
                events.push(MonitorEvent::new(
                    self.id,
                    EventKind::RefreshFailed {
                        error: error.to_string(),
                    },
                ));
                if lost_connection {
                    warn!(session_id = %self.id, "session lost its connection, stopping");
                    self.stop();
                }
            }
        }
    }

    fn tick_destination(
        &mut self,
        broker: &dyn BrokerSession,
        destination: &Destination,
        events: &mut Vec<MonitorEvent>,
    ) {
        match broker.browse(destination) {
            Ok(current) => {
                let empty = HashSet::new();
                let previous = self.last_seen.get(destination).unwrap_or(&empty);
                let SnapshotDiff {
                    removed,
                    added,
                    current_ids,
                } = diff_snapshot(previous, &current);

                if !removed.is_empty() || !added.is_empty() {
                    debug!(
                        destination = %destination,
                        added = added.len(),
                        removed = removed.len(),
                        "snapshot changed"
                    );
                }

                for message_id in removed {
                    events.push(MonitorEvent::new(
                        self.id,
                        EventKind::MessageRemoved {
                            destination: destination.clone(),
                            message_id,
                        },
                    ));
                }
                for message in added {
                    events.push(MonitorEvent::new(
                        self.id,
                        EventKind::MessageAdded {
                            destination: destination.clone(),
                            message,
                        },
                    ));
                }

                self.last_seen.insert(destination.clone(), current_ids);
            }
            Err(error) => {
                warn!(
                    destination = %destination,
                    error = %error,
                    "browse failed, retaining last-seen state"
                );
                let lost_connection = matches!(error, BrokerError::NotConnected);
                events.push(MonitorEvent::new(
                    self.id,
                    EventKind::BrowseFailed {
                        destination: destination.clone(),
                        error: error.to_string(),
                    },
                ));
                if lost_connection {
                    warn!(session_id = %self.id, "session lost its connection, stopping");
                    self.stop();
                }
            }
        }
    }
}
