//! Destination registry: the single source of truth for which queues and
//! topics exist on the broker, refreshed on demand.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::broker::session::{BrokerMetadata, BrokerSession};
use crate::destination::Destination;
use crate::error::BrokerError;

/// The delta produced by one discovery scan.
///
/// Both sides are sorted, so two scans over the same broker state produce
/// identical deltas.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DestinationDelta {
    /// Destinations seen for the first time.
    pub added: Vec<Destination>,
    /// Previously known destinations the broker no longer lists.
    pub removed: Vec<Destination>,
}

impl DestinationDelta {
    /// Returns true if the scan found no change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Maintains the set of known destinations for one broker session.
///
/// The known set only ever changes through a successful
/// [`refresh`](Self::refresh): a failed listing leaves it untouched, so
/// transient broker hiccups never silently drop destinations.
pub struct DestinationRegistry {
    known: BTreeSet<Destination>,
    metadata: Option<Arc<dyn BrokerMetadata>>,
}

impl DestinationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            known: BTreeSet::new(),
            metadata: None,
        }
    }

    /// Creates a registry pre-seeded with destinations already known to
    /// the caller. The next refresh reconciles them against the broker.
    #[must_use]
    pub fn with_known(destinations: impl IntoIterator<Item = Destination>) -> Self {
        Self {
            known: destinations.into_iter().collect(),
            metadata: None,
        }
    }

    /// Attaches a read-only metadata provider. Purely additive: no core
    /// algorithm depends on it.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Arc<dyn BrokerMetadata>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The currently known destinations, sorted.
    #[must_use]
    pub const fn known(&self) -> &BTreeSet<Destination> {
        &self.known
    }

    /// Returns true if the destination was seen by the last successful
    /// refresh (or was pre-seeded).
    #[must_use]
    pub fn is_known(&self, destination: &Destination) -> bool {
        self.known.contains(destination)
    }

    /// Number of known destinations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Returns true if no destinations are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Runs one discovery scan and returns the delta against the previous
    /// known set. Idempotent: with no broker-side change, a second call
    /// returns an empty delta.
    ///
    /// # Errors
    ///
    /// Propagates the listing failure; the known set is left unchanged so
    /// the next successful scan diffs against real state.
    pub fn refresh(
        &mut self,
        session: &dyn BrokerSession,
    ) -> Result<DestinationDelta, BrokerError> {
        let listed = session.list_destinations()?;
        let current: BTreeSet<Destination> = listed.into_iter().collect();

        let added: Vec<Destination> = current.difference(&self.known).cloned().collect();
        let removed: Vec<Destination> = self.known.difference(&current).cloned().collect();
        self.known = current;

        if !added.is_empty() || !removed.is_empty() {
            debug!(
                added = added.len(),
                removed = removed.len(),
                known = self.known.len(),
                "destination scan found changes"
            );
        }

        Ok(DestinationDelta { added, removed })
    }

    /// Message count for a destination via the metadata side channel.
    /// `Ok(None)` when no provider is attached or the broker does not
    /// report a count.
    pub fn message_count(&self, destination: &Destination) -> Result<Option<u64>, BrokerError> {
        match &self.metadata {
            Some(provider) => provider.message_count(destination),
            None => Ok(None),
        }
    }
}

impl Default for DestinationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::InMemoryBroker;
    use crate::broker::session::ConnectParams;

    fn broker_with(destinations: &[Destination]) -> InMemoryBroker {
        let broker = InMemoryBroker::new();
        for d in destinations {
            broker.create_destination(d.clone()).unwrap();
        }
        broker
    }

    #[test]
    fn test_first_refresh_reports_everything_added() {
        let dests = [Destination::queue("orders"), Destination::topic("alerts")];
        let broker = broker_with(&dests);
        let session = broker.connect(&ConnectParams::default()).unwrap();

        let mut registry = DestinationRegistry::new();
        let delta = registry.refresh(&session).unwrap();

        assert_eq!(delta.added.len(), 2);
        assert!(delta.removed.is_empty());
        assert!(registry.is_known(&dests[0]));
        assert!(registry.is_known(&dests[1]));
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let broker = broker_with(&[Destination::queue("orders")]);
        let session = broker.connect(&ConnectParams::default()).unwrap();

        let mut registry = DestinationRegistry::new();
        let first = registry.refresh(&session).unwrap();
        assert!(!first.is_empty());

        let second = registry.refresh(&session).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn test_refresh_reports_removals() {
        let orders = Destination::queue("orders");
        let broker = broker_with(&[orders.clone()]);
        let session = broker.connect(&ConnectParams::default()).unwrap();

        let mut registry = DestinationRegistry::new();
        registry.refresh(&session).unwrap();

        broker.remove_destination(&orders).unwrap();
        let delta = registry.refresh(&session).unwrap();
        assert!(delta.added.is_empty());
        assert_eq!(delta.removed, vec![orders.clone()]);
        assert!(!registry.is_known(&orders));
    }

    #[test]
    fn test_failed_listing_leaves_known_set_unchanged() {
        let orders = Destination::queue("orders");
        let broker = broker_with(&[orders.clone()]);
        let session = broker.connect(&ConnectParams::default()).unwrap();

        let mut registry = DestinationRegistry::new();
        registry.refresh(&session).unwrap();

        broker.set_available(false).unwrap();
        assert!(registry.refresh(&session).is_err());
        assert!(registry.is_known(&orders));

        // Recovery diffs against last-known-good state, not empty.
        broker.set_available(true).unwrap();
        assert!(registry.refresh(&session).unwrap().is_empty());
    }

    #[test]
    fn test_queue_and_topic_with_same_name_are_distinct() {
        let broker = broker_with(&[
            Destination::queue("events"),
            Destination::topic("events"),
        ]);
        let session = broker.connect(&ConnectParams::default()).unwrap();

        let mut registry = DestinationRegistry::new();
        let delta = registry.refresh(&session).unwrap();
        assert_eq!(delta.added.len(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_preseeded_registry_reconciles() {
        let stale = Destination::queue("stale");
        let live = Destination::queue("live");
        let broker = broker_with(&[live.clone()]);
        let session = broker.connect(&ConnectParams::default()).unwrap();

        let mut registry = DestinationRegistry::with_known([stale.clone()]);
        let delta = registry.refresh(&session).unwrap();
        assert_eq!(delta.added, vec![live]);
        assert_eq!(delta.removed, vec![stale]);
    }

    #[test]
    fn test_message_count_without_provider() {
        let registry = DestinationRegistry::new();
        assert_eq!(
            registry.message_count(&Destination::queue("orders")).unwrap(),
            None
        );
    }

    #[test]
    fn test_message_count_with_provider() {
        let orders = Destination::queue("orders");
        let broker = broker_with(&[orders.clone()]);
        broker
            .publish(
                &orders,
                crate::message::MessageBody::from("m"),
                crate::properties::PropertyMap::new(),
            )
            .unwrap();
        let session = Arc::new(broker.connect(&ConnectParams::default()).unwrap());

        let registry = DestinationRegistry::new().with_metadata(session);
        assert_eq!(registry.message_count(&orders).unwrap(), Some(1));
    }
}
