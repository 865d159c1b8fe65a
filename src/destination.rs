//! Destination types: named queues and topics on the broker.

use serde::{Deserialize, Serialize};

/// The delivery model of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    /// Point-to-point destination.
    Queue,
    /// Publish-subscribe destination.
    Topic,
}

impl std::fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queue => write!(f, "queue"),
            Self::Topic => write!(f, "topic"),
        }
    }
}

/// A named queue or topic on the broker.
///
/// Identity is the `(name, kind)` pair: a queue and a topic sharing a name
/// are distinct destinations. Destinations are created when discovered and
/// never mutated; the registry drops one only when a discovery scan no
/// longer lists it.
///
/// # Examples
///
/// ```
/// use queuescope::{Destination, DestinationKind};
///
/// let q = Destination::queue("orders");
/// let t = Destination::topic("orders");
///
/// assert_ne!(q, t);
/// assert_eq!(q.kind, DestinationKind::Queue);
/// assert_eq!(format!("{q}"), "queue://orders");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Destination {
    /// Broker-side destination name.
    pub name: String,
    /// Queue or topic.
    pub kind: DestinationKind,
}

impl Destination {
    /// Creates a queue destination.
    #[must_use]
    pub fn queue(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DestinationKind::Queue,
        }
    }

    /// Creates a topic destination.
    #[must_use]
    pub fn topic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DestinationKind::Topic,
        }
    }

    /// Returns true for queue destinations.
    #[must_use]
    pub const fn is_queue(&self) -> bool {
        matches!(self.kind, DestinationKind::Queue)
    }

    /// Returns true for topic destinations.
    #[must_use]
    pub const fn is_topic(&self) -> bool {
        matches!(self.kind, DestinationKind::Topic)
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.kind, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_name_and_kind() {
        let q = Destination::queue("events");
        let t = Destination::topic("events");
        assert_ne!(q, t);
        assert_eq!(q, Destination::queue("events"));
    }

    #[test]
    fn test_ordering_is_by_name_then_kind() {
        let mut dests = vec![
            Destination::topic("b"),
            Destination::queue("b"),
            Destination::queue("a"),
        ];
        dests.sort();
        assert_eq!(
            dests,
            vec![
                Destination::queue("a"),
                Destination::queue("b"),
                Destination::topic("b"),
            ]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Destination::queue("orders")), "queue://orders");
        assert_eq!(format!("{}", Destination::topic("alerts")), "topic://alerts");
    }

    #[test]
    fn test_serialization() {
        let dest = Destination::topic("alerts");
        let json = serde_json::to_string(&dest).unwrap();
        assert!(json.contains("\"topic\""));
        let back: Destination = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dest);
    }
}
