//! Error types for queuescope.
//!
//! All errors are strongly typed using thiserror. The taxonomy separates
//! fatal connection failures from transient broker failures so callers can
//! pattern-match on the recovery path: transient failures retry on the next
//! scheduled tick, connection failures require a fresh connect.

use thiserror::Error;

use crate::destination::Destination;
use crate::properties::PropertyParseError;

/// Errors establishing or maintaining a broker session.
///
/// These are fatal to the session: the core never retries them
/// automatically, and an active monitor session transitions to `Stopped`.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Connection to {url} failed: {message}")]
    ConnectFailed {
        url: String,
        message: String,
    },

    #[error("Authentication rejected for user '{username}' at {url}")]
    AuthenticationFailed {
        url: String,
        username: String,
    },

    #[error("Connection lost: {message}")]
    ConnectionLost {
        message: String,
    },
}

/// Transient failures of listing/browse calls.
///
/// State derived from previous successful calls is always retained; the
/// next scheduled tick retries automatically.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Not connected to broker")]
    NotConnected,

    #[error("Broker unavailable during {operation}: {message}")]
    Unavailable {
        operation: String,
        message: String,
    },

    #[error("Unknown destination: {destination}")]
    UnknownDestination {
        destination: Destination,
    },
}

/// The broker rejected or failed to deliver a send.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Not connected to broker")]
    NotConnected,

    #[error("Send to {destination} rejected: {message}")]
    Rejected {
        destination: Destination,
        message: String,
    },
}

/// Errors receiving from a monitor event stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Event stream disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Timed out after {duration_ms}ms waiting for an event")]
    Timeout {
        duration_ms: u64,
    },
}

/// Top-level error type for queuescope.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),

    #[error("Property error: {0}")]
    Property(#[from] PropertyParseError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ScopeError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a connection-level error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns true if this is a transient broker error.
    #[must_use]
    pub const fn is_broker(&self) -> bool {
        matches!(self, Self::Broker(_))
    }

    /// Returns true if this is a property parse error.
    #[must_use]
    pub const fn is_property(&self) -> bool {
        matches!(self, Self::Property(_))
    }

    /// Returns true if retrying the failed operation may succeed without
    /// operator intervention.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Broker(e) => matches!(e, BrokerError::Unavailable { .. }),
            Self::Stream(e) => matches!(e, StreamError::Timeout { .. }),
            // Parse errors won't change on retry; connection and send
            // failures need a caller decision first.
            Self::Connection(_) | Self::Send(_) | Self::Property(_) | Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for queuescope operations.
pub type ScopeResult<T> = Result<T, ScopeError>;
