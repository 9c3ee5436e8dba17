//! Lock-serialized access to a property service
//!
//! `PropertyClient` is the only thing allowed to talk to the service. Every
//! read and write, from any clone of the client, goes through the same mutex,
//! so service calls from one client never overlap.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use property_service::{AreaId, Connector, PropertyId, PropertyService, RawValue, ValueType};
use serde::{Deserialize, Serialize};

use crate::error::{ConnectionError, Operation, PropertyError, Result};
use crate::value::PropertyValue;

/// A `(property, area)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyTarget {
    pub property: PropertyId,
    #[serde(default)]
    pub area: AreaId,
}

impl PropertyTarget {
    pub const fn new(property: PropertyId, area: AreaId) -> Self {
        Self { property, area }
    }

    /// Target `property` in the global area
    pub const fn global(property: PropertyId) -> Self {
        Self {
            property,
            area: AreaId::GLOBAL,
        }
    }
}

impl fmt::Display for PropertyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.property, self.area)
    }
}

/// Handle to one property service connection
///
/// Cloning is cheap; clones share the connection and its lock.
///
/// # Example
///
/// ```rust
/// use property_client::PropertyClient;
/// use property_service::{InMemoryConnector, InMemoryPropertyService, RawValue, AREA, LED_CONTROL};
///
/// let service = InMemoryPropertyService::new().with_property(LED_CONTROL, AREA, RawValue::Int32(0));
/// let client = PropertyClient::connect(&InMemoryConnector::new(service)).unwrap();
///
/// client.set_property(LED_CONTROL, AREA, 1i32).unwrap();
/// assert_eq!(client.get_property::<i32>(LED_CONTROL, AREA).unwrap(), 1);
/// ```
#[derive(Clone)]
pub struct PropertyClient {
    service: Arc<Mutex<Box<dyn PropertyService>>>,
}

impl PropertyClient {
    /// Open a connection through `connector`
    ///
    /// There is no retry; a failed connect leaves the caller without a client.
    pub fn connect<C: Connector + ?Sized>(connector: &C) -> std::result::Result<Self, ConnectionError> {
        match connector.connect() {
            Ok(service) => {
                tracing::info!("property service connected");
                Ok(Self::from_boxed(service))
            }
            Err(e) => {
                tracing::error!("failed to connect to property service: {}", e);
                Err(e.into())
            }
        }
    }

    /// Wrap an already connected service
    pub fn new<S: PropertyService + 'static>(service: S) -> Self {
        Self::from_boxed(Box::new(service))
    }

    pub fn from_boxed(service: Box<dyn PropertyService>) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
        }
    }

    /// Write a typed value
    pub fn set_property<V: PropertyValue>(
        &self,
        property: PropertyId,
        area: AreaId,
        value: V,
    ) -> Result<()> {
        check_declared_type(property, V::VALUE_TYPE)?;
        self.set_raw(property, area, value.into_raw())
    }

    /// Read a typed value
    pub fn get_property<V: PropertyValue>(&self, property: PropertyId, area: AreaId) -> Result<V> {
        check_declared_type(property, V::VALUE_TYPE)?;
        let raw = self.get_typed_raw(V::VALUE_TYPE, property, area)?;
        convert::<V>(property, raw)
    }

    /// Write an untyped value
    ///
    /// The value must match the type encoded in `property`, if any.
    pub fn set_raw(&self, property: PropertyId, area: AreaId, value: RawValue) -> Result<()> {
        let value_type = value.value_type();
        check_declared_type(property, value_type)?;
        let service = self.service.lock();
        write_locked(&**service, value_type, property, area, value)
    }

    /// Read an untyped value using the type encoded in `property`
    pub fn get_raw(&self, property: PropertyId, area: AreaId) -> Result<RawValue> {
        let value_type = property.value_type().unwrap_or(ValueType::Int32);
        self.get_typed_raw(value_type, property, area)
    }

    /// Read, transform and write back under a single lock acquisition
    ///
    /// Returns the value that was written.
    pub fn update<V, F>(&self, property: PropertyId, area: AreaId, f: F) -> Result<V>
    where
        V: PropertyValue,
        F: FnOnce(V) -> V,
    {
        check_declared_type(property, V::VALUE_TYPE)?;

        let service = self.service.lock();
        let raw = read_locked(&**service, V::VALUE_TYPE, property, area)?;
        let next = f(convert::<V>(property, raw)?);
        write_locked(
            &**service,
            V::VALUE_TYPE,
            property,
            area,
            next.clone().into_raw(),
        )?;
        Ok(next)
    }

    /// Read `target` as `V`
    pub fn read<V: PropertyValue>(&self, target: PropertyTarget) -> Result<V> {
        self.get_property(target.property, target.area)
    }

    /// Write `value` to `target`
    pub fn write<V: PropertyValue>(&self, target: PropertyTarget, value: V) -> Result<()> {
        self.set_property(target.property, target.area, value)
    }

    fn get_typed_raw(&self, value_type: ValueType, property: PropertyId, area: AreaId) -> Result<RawValue> {
        let service = self.service.lock();
        read_locked(&**service, value_type, property, area)
    }
}

impl fmt::Debug for PropertyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyClient")
            .field("handles", &Arc::strong_count(&self.service))
            .finish()
    }
}

fn read_locked(
    service: &dyn PropertyService,
    value_type: ValueType,
    property: PropertyId,
    area: AreaId,
) -> Result<RawValue> {
    match service.get(value_type, property, area) {
        Ok(value) => {
            tracing::debug!(%property, %area, %value, "get property");
            Ok(value)
        }
        Err(source) => {
            tracing::warn!(%property, %area, error = %source, "get property failed");
            Err(PropertyError::Service {
                operation: Operation::Get,
                property,
                area,
                source,
            })
        }
    }
}

fn write_locked(
    service: &dyn PropertyService,
    value_type: ValueType,
    property: PropertyId,
    area: AreaId,
    value: RawValue,
) -> Result<()> {
    let shown = value.to_string();
    match service.set(value_type, property, area, value) {
        Ok(()) => {
            tracing::debug!(%property, %area, value = %shown, "set property");
            Ok(())
        }
        Err(source) => {
            tracing::error!(%property, %area, value = %shown, error = %source, "set property failed");
            Err(PropertyError::Service {
                operation: Operation::Set,
                property,
                area,
                source,
            })
        }
    }
}

fn check_declared_type(property: PropertyId, requested: ValueType) -> Result<()> {
    match property.value_type() {
        Some(declared) if declared != requested => {
            tracing::warn!(%property, %declared, %requested, "property type mismatch");
            Err(PropertyError::TypeMismatch {
                property,
                expected: declared,
                actual: requested,
            })
        }
        _ => Ok(()),
    }
}

fn convert<V: PropertyValue>(property: PropertyId, raw: RawValue) -> Result<V> {
    let actual = raw.value_type();
    V::from_raw(raw).ok_or(PropertyError::TypeMismatch {
        property,
        expected: V::VALUE_TYPE,
        actual,
    })
}
