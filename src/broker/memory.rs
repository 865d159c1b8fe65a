//! In-memory broker backend.
//!
//! A thread-safe, in-process broker used by tests and embedded callers. It
//! honors the [`BrokerSession`] contract exactly: browsing is repeatable
//! and never removes messages, and sends get fresh broker-assigned ids.
//! Administrative hooks let tests make messages arrive, disappear, or make
//! individual browses fail.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::broker::session::{BrokerMetadata, BrokerSession, ConnectParams};
use crate::destination::Destination;
use crate::error::{BrokerError, ConnectionError, SendError};
use crate::message::{MessageBody, MessageId, ObservedMessage};
use crate::properties::PropertyMap;

fn lock_err(operation: &'static str) -> BrokerError {
    BrokerError::Unavailable {
        operation: operation.to_string(),
        message: "poisoned lock".to_string(),
    }
}

#[derive(Debug, Clone)]
struct StoredMessage {
    id: MessageId,
    body: MessageBody,
    properties: PropertyMap,
    timestamp: DateTime<Utc>,
}

impl StoredMessage {
    fn snapshot(&self, destination: &Destination) -> ObservedMessage {
        ObservedMessage {
            message_id: self.id.clone(),
            destination: destination.clone(),
            body: self.body.clone(),
            properties: self.properties.clone(),
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug)]
struct BrokerState {
    destinations: BTreeMap<Destination, Vec<StoredMessage>>,
    next_id: u64,
    available: bool,
    failing_browse: HashSet<Destination>,
}

impl Default for BrokerState {
    fn default() -> Self {
        Self {
            destinations: BTreeMap::new(),
            next_id: 1,
            available: true,
            failing_browse: HashSet::new(),
        }
    }
}

impl BrokerState {
    fn assign_id(&mut self) -> MessageId {
        let id = MessageId::new(format!("ID:queuescope-{}", self.next_id));
        self.next_id += 1;
        id
    }
}

/// An in-process broker holding queues and topics in memory.
///
/// The broker itself is the administrative surface; [`InMemoryBroker::connect`]
/// yields sessions that see the shared state through the
/// [`BrokerSession`] contract.
#[derive(Debug, Default)]
pub struct InMemoryBroker {
    state: Arc<RwLock<BrokerState>>,
    credentials: Option<(String, String)>,
}

impl InMemoryBroker {
    /// Creates a broker that accepts any credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a broker that rejects sessions unless they present the
    /// given username and password.
    #[must_use]
    pub fn with_credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(BrokerState::default())),
            credentials: Some((username.into(), password.into())),
        }
    }

    /// Opens a session against this broker.
    ///
    /// # Errors
    ///
    /// `ConnectFailed` when the broker is unreachable (see
    /// [`set_available`](Self::set_available)), `AuthenticationFailed` on a
    /// credential mismatch.
    pub fn connect(&self, params: &ConnectParams) -> Result<InMemorySession, ConnectionError> {
        let url = params.broker_url();

        let reachable = self
            .state
            .read()
            .map(|s| s.available)
            .unwrap_or(false);
        if !reachable {
            return Err(ConnectionError::ConnectFailed {
                url,
                message: "broker not reachable".to_string(),
            });
        }

        if let Some((user, pass)) = &self.credentials {
            if *user != params.username || *pass != params.password {
                return Err(ConnectionError::AuthenticationFailed {
                    url,
                    username: params.username.clone(),
                });
            }
        }

        info!(url = %url, "connected to in-memory broker");
        Ok(InMemorySession {
            state: Arc::clone(&self.state),
            connected: AtomicBool::new(true),
        })
    }

    /// Creates an empty destination if it does not exist yet.
    pub fn create_destination(&self, destination: Destination) -> Result<(), BrokerError> {
        let mut state = self.state.write().map_err(|_| lock_err("create_destination"))?;
        state.destinations.entry(destination).or_default();
        Ok(())
    }

    /// Removes a destination and all its messages. Subsequent discovery
    /// scans no longer list it.
    pub fn remove_destination(&self, destination: &Destination) -> Result<(), BrokerError> {
        let mut state = self.state.write().map_err(|_| lock_err("remove_destination"))?;
        state.destinations.remove(destination);
        state.failing_browse.remove(destination);
        Ok(())
    }

    /// Enqueues a message as if another producer delivered it, creating
    /// the destination on first use. Returns the broker-assigned id.
    pub fn publish(
        &self,
        destination: &Destination,
        body: MessageBody,
        properties: PropertyMap,
    ) -> Result<MessageId, BrokerError> {
        let mut state = self.state.write().map_err(|_| lock_err("publish"))?;
        let id = state.assign_id();
        let stored = StoredMessage {
            id: id.clone(),
            body,
            properties,
            timestamp: Utc::now(),
        };
        state.destinations.entry(destination.clone()).or_default().push(stored);
        debug!(destination = %destination, message_id = %id, "published message");
        Ok(id)
    }

    /// Destructively removes the oldest message, as if another client
    /// consumed it. Returns `None` when the destination is empty or
    /// unknown.
    pub fn consume(&self, destination: &Destination) -> Result<Option<ObservedMessage>, BrokerError> {
        let mut state = self.state.write().map_err(|_| lock_err("consume"))?;
        let Some(messages) = state.destinations.get_mut(destination) else {
            return Ok(None);
        };
        if messages.is_empty() {
            return Ok(None);
        }
        let taken = messages.remove(0);
        Ok(Some(taken.snapshot(destination)))
    }

    /// Toggles broker reachability. While unavailable, every session call
    /// fails and new connections are refused.
    pub fn set_available(&self, available: bool) -> Result<(), BrokerError> {
        let mut state = self.state.write().map_err(|_| lock_err("set_available"))?;
        state.available = available;
        Ok(())
    }

    /// Makes browses of one destination fail while leaving the rest of the
    /// broker healthy.
    pub fn set_browse_failure(
        &self,
        destination: &Destination,
        failing: bool,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.write().map_err(|_| lock_err("set_browse_failure"))?;
        if failing {
            state.failing_browse.insert(destination.clone());
        } else {
            state.failing_browse.remove(destination);
        }
        Ok(())
    }
}

/// A live session against an [`InMemoryBroker`].
#[derive(Debug)]
pub struct InMemorySession {
    state: Arc<RwLock<BrokerState>>,
    connected: AtomicBool,
}

impl InMemorySession {
    fn ensure_connected(&self) -> Result<(), BrokerError> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(BrokerError::NotConnected)
        }
    }
}

impl BrokerSession for InMemorySession {
    fn list_destinations(&self) -> Result<Vec<Destination>, BrokerError> {
        self.ensure_connected()?;
        let state = self.state.read().map_err(|_| lock_err("list_destinations"))?;
        if !state.available {
            return Err(BrokerError::Unavailable {
                operation: "list_destinations".to_string(),
                message: "broker not reachable".to_string(),
            });
        }
        Ok(state.destinations.keys().cloned().collect())
    }

    fn browse(&self, destination: &Destination) -> Result<Vec<ObservedMessage>, BrokerError> {
        self.ensure_connected()?;
        let state = self.state.read().map_err(|_| lock_err("browse"))?;
        if !state.available {
            return Err(BrokerError::Unavailable {
                operation: "browse".to_string(),
                message: "broker not reachable".to_string(),
            });
        }
        if state.failing_browse.contains(destination) {
            return Err(BrokerError::Unavailable {
                operation: "browse".to_string(),
                message: format!("browse of {destination} failed"),
            });
        }
        let Some(messages) = state.destinations.get(destination) else {
            return Err(BrokerError::UnknownDestination {
                destination: destination.clone(),
            });
        };
        Ok(messages.iter().map(|m| m.snapshot(destination)).collect())
    }

    fn send(
        &self,
        destination: &Destination,
        body: &MessageBody,
        properties: &PropertyMap,
    ) -> Result<MessageId, SendError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(SendError::NotConnected);
        }
        let mut state = self.state.write().map_err(|_| SendError::Rejected {
            destination: destination.clone(),
            message: "poisoned lock".to_string(),
        })?;
        if !state.available {
            return Err(SendError::Rejected {
                destination: destination.clone(),
                message: "broker not reachable".to_string(),
            });
        }
        let id = state.assign_id();
        let stored = StoredMessage {
            id: id.clone(),
            body: body.clone(),
            properties: properties.clone(),
            timestamp: Utc::now(),
        };
        // Sending to a fresh destination creates it, as JMS producers do.
        state.destinations.entry(destination.clone()).or_default().push(stored);
        debug!(destination = %destination, message_id = %id, "sent message");
        Ok(id)
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        info!("disconnected from in-memory broker");
    }
}

impl BrokerMetadata for InMemorySession {
    fn message_count(&self, destination: &Destination) -> Result<Option<u64>, BrokerError> {
        self.ensure_connected()?;
        let state = self.state.read().map_err(|_| lock_err("message_count"))?;
        Ok(state.destinations.get(destination).map(|m| m.len() as u64))
    }
}
