//! Observed-message types.
//!
//! An [`ObservedMessage`] is an immutable snapshot taken by a
//! non-destructive browse. A later browse of the same destination produces
//! fresh snapshots; identity across snapshots is the broker-assigned
//! [`MessageId`], never the position in a table or list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::destination::Destination;
use crate::properties::PropertyMap;

/// Broker-assigned message identifier, stable across browses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wraps a broker-assigned identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message body, either text or opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MessageBody {
    /// Text payload.
    Text(String),
    /// Binary payload, not interpreted by the core.
    Bytes(Vec<u8>),
}

impl MessageBody {
    /// Returns true for text bodies.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// The body as text, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Bytes(_) => None,
        }
    }

    /// Payload length in bytes (UTF-8 length for text bodies).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Bytes(b) => b.len(),
        }
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MessageBody {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for MessageBody {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MessageBody {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// An immutable snapshot of one message seen during a browse.
///
/// Browsing never acknowledges or removes the underlying message, and
/// nothing in the core ever mutates a snapshot after it is taken; the
/// edit-and-resend pipeline deep-copies into a draft instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedMessage {
    /// Broker-assigned identifier.
    pub message_id: MessageId,
    /// Where the message was observed.
    pub destination: Destination,
    /// Message payload.
    pub body: MessageBody,
    /// Message headers/properties in broker order.
    pub properties: PropertyMap,
    /// Broker-side enqueue timestamp; the ordering key across snapshots.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_display() {
        let id = MessageId::new("ID:broker-1-42");
        assert_eq!(format!("{id}"), "ID:broker-1-42");
        assert_eq!(id.as_str(), "ID:broker-1-42");
    }

    #[test]
    fn test_body_accessors() {
        let text = MessageBody::from("hello");
        assert!(text.is_text());
        assert_eq!(text.as_text(), Some("hello"));
        assert_eq!(text.len(), 5);

        let bytes = MessageBody::Bytes(vec![0x00, 0xff]);
        assert!(!bytes.is_text());
        assert_eq!(bytes.as_text(), None);
        assert_eq!(bytes.len(), 2);
    }

    #[test]
    fn test_default_body_is_empty_text() {
        let body = MessageBody::default();
        assert!(body.is_text());
        assert!(body.is_empty());
    }

    #[test]
    fn test_observed_message_serialization() {
        let msg = ObservedMessage {
            message_id: MessageId::new("ID:x-1"),
            destination: Destination::queue("orders"),
            body: MessageBody::from("payload"),
            properties: crate::properties::parse("k=v").unwrap(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ObservedMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
