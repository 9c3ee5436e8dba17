//! Error types for property-client

use std::fmt;

use property_service::{AreaId, PropertyId, ServiceError, ValueType};
use thiserror::Error;

/// Result type for property reads and writes
pub type Result<T, E = PropertyError> = std::result::Result<T, E>;

/// The property service could not be reached
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectionError {
    #[error("property service unavailable: {0}")]
    Unavailable(String),
}

impl From<ServiceError> for ConnectionError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Unavailable(msg) => ConnectionError::Unavailable(msg),
            other => ConnectionError::Unavailable(other.to_string()),
        }
    }
}

/// Which side of the client a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Set,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Get => f.write_str("get"),
            Operation::Set => f.write_str("set"),
        }
    }
}

/// A get or set against the property service failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    #[error("{operation} {property} in area {area} failed: {source}")]
    Service {
        operation: Operation,
        property: PropertyId,
        area: AreaId,
        #[source]
        source: ServiceError,
    },

    #[error("property {property} expects {expected} values, got {actual}")]
    TypeMismatch {
        property: PropertyId,
        expected: ValueType,
        actual: ValueType,
    },
}

impl PropertyError {
    pub fn property(&self) -> PropertyId {
        match self {
            PropertyError::Service { property, .. } | PropertyError::TypeMismatch { property, .. } => {
                *property
            }
        }
    }

    /// Whether the connection itself is gone rather than this one call
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            PropertyError::Service {
                source: ServiceError::Disconnected(_),
                ..
            }
        )
    }
}

/// Errors from starting or joining a polling session
#[derive(Debug, Error)]
pub enum PollingError {
    #[error("a polling session is already running")]
    AlreadyRunning,

    #[error("polling interval must be greater than zero")]
    InvalidInterval,

    #[error("failed to spawn polling thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("polling thread panicked")]
    Join,
}
