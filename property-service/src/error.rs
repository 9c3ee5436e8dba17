//! Error types for the property service seam

use thiserror::Error;

use crate::types::{AreaId, PropertyId, ValueType};

/// Errors raised by a property service implementation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// The service could not be reached at connect time
    #[error("property service unavailable: {0}")]
    Unavailable(String),

    /// The property/area pair is not known to the service
    #[error("unsupported property {property} in area {area}")]
    UnsupportedProperty { property: PropertyId, area: AreaId },

    /// The caller asked for, or supplied, a value of the wrong type
    #[error("property {property} holds {actual} values, not {expected}")]
    TypeMismatch {
        property: PropertyId,
        expected: ValueType,
        actual: ValueType,
    },

    /// The value was rejected by the service
    #[error("invalid value for {property}: {reason}")]
    InvalidValue { property: PropertyId, reason: String },

    /// The connection dropped after it was established
    #[error("property service disconnected: {0}")]
    Disconnected(String),

    /// Anything else the backend reports
    #[error("internal service error: {0}")]
    Internal(String),
}
