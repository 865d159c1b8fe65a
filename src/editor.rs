//! Message drafting for edit-and-resend.
//!
//! A [`MessageDraft`] is a mutable working copy, detached from the broker:
//! editing it never touches the observed original, and sending it produces
//! a brand-new message with a fresh broker-assigned id. Sending consumes
//! the draft; on failure the draft comes back inside [`SendFailed`] so the
//! caller can correct and resend.

use thiserror::Error;

use crate::broker::session::BrokerSession;
use crate::destination::Destination;
use crate::error::SendError;
use crate::message::{MessageBody, MessageId, ObservedMessage};
use crate::properties::{self, PropertyMap, PropertyParseError};

/// An editable message awaiting send.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    source_message_id: Option<MessageId>,
    destination: Destination,
    body: MessageBody,
    properties: PropertyMap,
}

impl MessageDraft {
    /// Creates an empty draft targeting a destination.
    #[must_use]
    pub fn new(destination: Destination) -> Self {
        Self {
            source_message_id: None,
            destination,
            body: MessageBody::default(),
            properties: PropertyMap::new(),
        }
    }

    /// Creates a draft by deep-copying an observed message.
    ///
    /// The draft records the original's id for provenance only; the send
    /// never reuses it.
    #[must_use]
    pub fn from_observed(message: &ObservedMessage) -> Self {
        Self {
            source_message_id: Some(message.message_id.clone()),
            destination: message.destination.clone(),
            body: message.body.clone(),
            properties: message.properties.clone(),
        }
    }

    /// The id of the observed message this draft was copied from, if any.
    #[must_use]
    pub fn source_message_id(&self) -> Option<&MessageId> {
        self.source_message_id.as_ref()
    }

    /// The target destination.
    #[must_use]
    pub const fn destination(&self) -> &Destination {
        &self.destination
    }

    /// The draft body.
    #[must_use]
    pub const fn body(&self) -> &MessageBody {
        &self.body
    }

    /// The draft properties.
    #[must_use]
    pub const fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Retargets the draft. The original destination is just the default.
    pub fn set_destination(&mut self, destination: Destination) {
        self.destination = destination;
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: MessageBody) {
        self.body = body;
    }

    /// Replaces the body with text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.body = MessageBody::Text(text.into());
    }

    /// Sets or overwrites one property.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key, value);
    }

    /// Replaces all properties from `key=value,key=value` text.
    ///
    /// Parsing is all-or-nothing: on error the draft's properties are left
    /// exactly as they were.
    pub fn set_properties_text(&mut self, text: &str) -> Result<(), PropertyParseError> {
        self.properties = properties::parse(text)?;
        Ok(())
    }

    /// The current properties rendered as `key=value,key=value` text.
    #[must_use]
    pub fn properties_text(&self) -> String {
        properties::serialize(&self.properties)
    }

    /// Sends the draft as a new message, consuming it.
    ///
    /// Returns the broker-assigned id of the new message. On failure the
    /// draft is handed back unmodified inside the error.
    pub fn send(self, session: &dyn BrokerSession) -> Result<MessageId, SendFailed> {
        match session.send(&self.destination, &self.body, &self.properties) {
            Ok(id) => Ok(id),
            Err(error) => Err(SendFailed { draft: self, error }),
        }
    }
}

/// A failed send, carrying the intact draft for correction and resend.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct SendFailed {
    /// The draft exactly as it was at send time.
    pub draft: MessageDraft,
    /// What the broker reported.
    #[source]
    pub error: SendError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::InMemoryBroker;
    use crate::broker::session::ConnectParams;

    fn session(broker: &InMemoryBroker) -> crate::broker::memory::InMemorySession {
        broker.connect(&ConnectParams::default()).unwrap()
    }

    fn observed() -> ObservedMessage {
        let broker = InMemoryBroker::new();
        let dest = Destination::queue("source");
        let mut props = PropertyMap::new();
        props.insert("color", "red");
        broker
            .publish(&dest, MessageBody::Text("hello".to_string()), props)
            .unwrap();
        broker.consume(&dest).unwrap().unwrap()
    }

    #[test]
    fn test_from_observed_is_a_detached_copy() {
        let original = observed();
        let mut draft = MessageDraft::from_observed(&original);

        draft.set_text("edited");
        draft.set_property("color", "blue");
        draft.set_destination(Destination::topic("elsewhere"));

        assert_eq!(original.body.as_text(), Some("hello"));
        assert_eq!(original.properties.get("color"), Some("red"));
        assert_eq!(draft.source_message_id(), Some(&original.message_id));
    }

    #[test]
    fn test_send_assigns_fresh_id() {
        let broker = InMemoryBroker::new();
        let original = observed();
        let draft = MessageDraft::from_observed(&original);

        let new_id = draft.send(&session(&broker)).unwrap();
        assert_ne!(new_id, original.message_id);
    }

    #[test]
    fn test_failed_parse_leaves_properties_unchanged() {
        let mut draft = MessageDraft::new(Destination::queue("q"));
        draft.set_property("keep", "me");

        let err = draft.set_properties_text("a=1,broken").unwrap_err();
        assert!(matches!(err, PropertyParseError::MissingSeparator { .. }));
        assert_eq!(draft.properties().get("keep"), Some("me"));
        assert!(!draft.properties().contains_key("a"));
    }

    #[test]
    fn test_properties_text_round_trip() {
        let mut draft = MessageDraft::new(Destination::queue("q"));
        draft.set_properties_text("a=1, b = two ,c=").unwrap();
        assert_eq!(draft.properties_text(), "a=1,b=two,c=");
    }

    #[test]
    fn test_failed_send_returns_draft() {
        let broker = InMemoryBroker::new();
        let sess = session(&broker);
        broker.set_available(false).unwrap();

        let mut draft = MessageDraft::new(Destination::queue("q"));
        draft.set_text("payload");
        let before = draft.clone();

        let failed = draft.send(&sess).unwrap_err();
        assert_eq!(failed.draft, before);

        // Correct-and-resend path.
        broker.set_available(true).unwrap();
        failed.draft.send(&sess).unwrap();
    }
}
