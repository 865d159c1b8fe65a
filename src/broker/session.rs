//! Connection parameters and the broker-session contract.

use serde::{Deserialize, Serialize};

use crate::destination::Destination;
use crate::error::{BrokerError, SendError};
use crate::message::{MessageBody, MessageId, ObservedMessage};
use crate::properties::PropertyMap;

/// Caller-supplied connection parameters.
///
/// `method` is an opaque transport identifier understood by the concrete
/// broker client (`tcp`, `ssl`, `nio`, ...); the core only uses it to build
/// the display URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectParams {
    /// Transport/protocol identifier.
    pub method: String,
    /// Broker hostname or address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Username, may be empty for anonymous brokers.
    pub username: String,
    /// Password, may be empty.
    pub password: String,
}

impl ConnectParams {
    /// Builds the `method://host:port` connection URL.
    #[must_use]
    pub fn broker_url(&self) -> String {
        format!("{}://{}:{}", self.method, self.host, self.port)
    }
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            method: "tcp".to_string(),
            host: "localhost".to_string(),
            port: 61616,
            username: String::new(),
            password: String::new(),
        }
    }
}

/// One live session against one broker.
///
/// All calls may block on network I/O; the core treats them as synchronous
/// and never issues overlapping calls against the same session (the poll
/// scheduler runs each session's ticks on one sequential thread).
///
/// # Contract
///
/// - `browse` is non-destructive: it must never acknowledge or remove
///   messages, and is safe to call repeatedly.
/// - `send` returns the fresh broker-assigned id of the delivered copy.
pub trait BrokerSession: Send + Sync {
    /// Lists every queue and topic currently known to the broker.
    fn list_destinations(&self) -> Result<Vec<Destination>, BrokerError>;

    /// Takes a snapshot of the destination's messages in broker order.
    fn browse(&self, destination: &Destination) -> Result<Vec<ObservedMessage>, BrokerError>;

    /// Delivers a message, returning the id the broker assigned to it.
    fn send(
        &self,
        destination: &Destination,
        body: &MessageBody,
        properties: &PropertyMap,
    ) -> Result<MessageId, SendError>;

    /// Closes the session. Further calls fail with `NotConnected`.
    fn disconnect(&self);
}

/// Optional read-only metadata side channel.
///
/// Some brokers expose counts and statistics through management
/// instrumentation. The registry may surface them when available, but
/// every core algorithm must function using only [`BrokerSession`]
/// browse/list operations.
pub trait BrokerMetadata: Send + Sync {
    /// Message count for a destination, `None` when the broker does not
    /// report one.
    fn message_count(&self, destination: &Destination) -> Result<Option<u64>, BrokerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure traits are object-safe
    fn _assert_broker_session_object_safe(_: &dyn BrokerSession) {}
    fn _assert_broker_metadata_object_safe(_: &dyn BrokerMetadata) {}

    #[test]
    fn test_broker_url() {
        let params = ConnectParams {
            method: "ssl".to_string(),
            host: "mq.example.net".to_string(),
            port: 61617,
            username: "admin".to_string(),
            password: "admin".to_string(),
        };
        assert_eq!(params.broker_url(), "ssl://mq.example.net:61617");
    }

    #[test]
    fn test_default_params() {
        let params = ConnectParams::default();
        assert_eq!(params.broker_url(), "tcp://localhost:61616");
        assert!(params.username.is_empty());
    }
}
