//! Property service seam for vendor VHAL properties
//!
//! This crate defines the minimal contract a vehicle property service has to
//! honour (typed `get`/`set` keyed by property id and area) and the types
//! that cross that boundary. The platform transport lives behind the
//! [`PropertyService`] and [`Connector`] traits; [`InMemoryPropertyService`]
//! is a complete service double used by tests and the demo.
//!
//! ```rust
//! use property_service::{AreaId, InMemoryPropertyService, PropertyId, PropertyService, RawValue};
//!
//! let led = PropertyId::new(0x2140_0104);
//! let service = InMemoryPropertyService::new().with_property(led, AreaId::GLOBAL, RawValue::Int32(0));
//!
//! service.set(led.value_type().unwrap(), led, AreaId::GLOBAL, RawValue::Int32(1)).unwrap();
//! assert_eq!(service.value(led, AreaId::GLOBAL), Some(RawValue::Int32(1)));
//! ```

mod error;
pub mod memory;
mod types;

pub use error::ServiceError;
pub use memory::{CallKind, InMemoryConnector, InMemoryPropertyService, ServiceCall};
pub use types::{AreaId, AreaType, PropertyGroup, PropertyId, RawValue, ValueType};

/// Vendor LED control property (int32, global area)
pub const LED_CONTROL: PropertyId = PropertyId::new(0x2140_0104);

/// Vendor I2C sensor property (int32, global area)
pub const I2C_CONTROL_INT: PropertyId = PropertyId::new(0x2140_0105);

/// Area used by every vendor property in this system
pub const AREA: AreaId = AreaId::GLOBAL;

/// An established connection to a vehicle property service
///
/// Both calls are synchronous and may block for the duration of the
/// underlying IPC. Implementations only need to be `Send`: callers serialize
/// access themselves.
pub trait PropertyService: Send {
    /// Read the current value of `property` in `area`
    fn get(
        &self,
        value_type: ValueType,
        property: PropertyId,
        area: AreaId,
    ) -> Result<RawValue, ServiceError>;

    /// Write `value` to `property` in `area`
    fn set(
        &self,
        value_type: ValueType,
        property: PropertyId,
        area: AreaId,
        value: RawValue,
    ) -> Result<(), ServiceError>;
}

impl<S: PropertyService + Sync + ?Sized> PropertyService for std::sync::Arc<S> {
    fn get(
        &self,
        value_type: ValueType,
        property: PropertyId,
        area: AreaId,
    ) -> Result<RawValue, ServiceError> {
        (**self).get(value_type, property, area)
    }

    fn set(
        &self,
        value_type: ValueType,
        property: PropertyId,
        area: AreaId,
        value: RawValue,
    ) -> Result<(), ServiceError> {
        (**self).set(value_type, property, area, value)
    }
}

/// Something that can open a [`PropertyService`] connection
pub trait Connector {
    fn connect(&self) -> Result<Box<dyn PropertyService>, ServiceError>;
}

impl<F> Connector for F
where
    F: Fn() -> Result<Box<dyn PropertyService>, ServiceError>,
{
    fn connect(&self) -> Result<Box<dyn PropertyService>, ServiceError> {
        self()
    }
}
