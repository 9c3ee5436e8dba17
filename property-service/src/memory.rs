//! In-memory property service
//!
//! Holds registered properties in a map and behaves like a real service for
//! the purposes of the client: unknown properties are rejected, values are
//! type checked, and failures can be injected. Every call is recorded in
//! order, and calls that overlap in time are counted so callers can verify
//! their own serialization.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::{AreaId, Connector, PropertyId, PropertyService, RawValue, ServiceError, ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Get,
    Set,
}

/// One recorded call against the service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCall {
    /// Order in which the call entered the service, starting at 0
    pub seq: u64,
    pub kind: CallKind,
    pub property: PropertyId,
    pub area: AreaId,
    /// Value written, for `Set` calls
    pub value: Option<RawValue>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_next_gets: usize,
    fail_all_gets: bool,
    fail_next_sets: usize,
    disconnected: bool,
}

#[derive(Debug, Default)]
struct Inner {
    values: Mutex<HashMap<(PropertyId, AreaId), RawValue>>,
    faults: Mutex<Faults>,
    calls: Mutex<Vec<ServiceCall>>,
    latency: Mutex<Option<Duration>>,
    next_seq: AtomicU64,
    in_call: AtomicBool,
    overlaps: AtomicUsize,
}

/// Service double backed by a `HashMap`
///
/// Clones share state, so a test can keep one handle for inspection while
/// the client owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPropertyService {
    inner: Arc<Inner>,
}

/// Marks the service busy for the lifetime of one call
struct CallGuard<'a> {
    in_call: &'a AtomicBool,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.in_call.store(false, Ordering::SeqCst);
    }
}

impl InMemoryPropertyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_property(self, property: PropertyId, area: AreaId, initial: RawValue) -> Self {
        self.register(property, area, initial);
        self
    }

    /// Make `property` in `area` known to the service with an initial value
    ///
    /// The initial value fixes the property's type.
    pub fn register(&self, property: PropertyId, area: AreaId, initial: RawValue) {
        self.inner.values.lock().insert((property, area), initial);
    }

    /// Current stored value, without recording a call
    pub fn value(&self, property: PropertyId, area: AreaId) -> Option<RawValue> {
        self.inner.values.lock().get(&(property, area)).cloned()
    }

    /// Change a stored value the way hardware would, without recording a call
    ///
    /// Returns `false` if the property is not registered.
    pub fn poke(&self, property: PropertyId, area: AreaId, value: RawValue) -> bool {
        match self.inner.values.lock().get_mut(&(property, area)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn fail_next_gets(&self, count: usize) {
        self.inner.faults.lock().fail_next_gets = count;
    }

    pub fn fail_all_gets(&self, fail: bool) {
        self.inner.faults.lock().fail_all_gets = fail;
    }

    pub fn fail_next_sets(&self, count: usize) {
        self.inner.faults.lock().fail_next_sets = count;
    }

    /// Every subsequent call fails with [`ServiceError::Disconnected`]
    pub fn disconnect(&self) {
        self.inner.faults.lock().disconnected = true;
    }

    pub fn reconnect(&self) {
        self.inner.faults.lock().disconnected = false;
    }

    /// Time each call spends inside the service
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.inner.latency.lock() = latency;
    }

    /// All calls so far, in the order they entered the service
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.inner.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().clear();
    }

    pub fn get_count(&self) -> usize {
        self.count(CallKind::Get)
    }

    pub fn set_count(&self) -> usize {
        self.count(CallKind::Set)
    }

    /// Number of calls that started while another call was still inside
    pub fn overlap_count(&self) -> usize {
        self.inner.overlaps.load(Ordering::SeqCst)
    }

    fn count(&self, kind: CallKind) -> usize {
        self.inner
            .calls
            .lock()
            .iter()
            .filter(|call| call.kind == kind)
            .count()
    }

    fn enter(
        &self,
        kind: CallKind,
        property: PropertyId,
        area: AreaId,
        value: Option<RawValue>,
    ) -> CallGuard<'_> {
        if self.inner.in_call.swap(true, Ordering::SeqCst) {
            self.inner.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);
        self.inner.calls.lock().push(ServiceCall {
            seq,
            kind,
            property,
            area,
            value,
        });

        let latency = *self.inner.latency.lock();
        if let Some(latency) = latency {
            thread::sleep(latency);
        }

        CallGuard {
            in_call: &self.inner.in_call,
        }
    }
}

impl PropertyService for InMemoryPropertyService {
    fn get(
        &self,
        value_type: ValueType,
        property: PropertyId,
        area: AreaId,
    ) -> Result<RawValue, ServiceError> {
        let _guard = self.enter(CallKind::Get, property, area, None);

        {
            let mut faults = self.inner.faults.lock();
            if faults.disconnected {
                return Err(ServiceError::Disconnected("in-memory service closed".into()));
            }
            if faults.fail_all_gets {
                return Err(ServiceError::Internal("injected read failure".into()));
            }
            if faults.fail_next_gets > 0 {
                faults.fail_next_gets -= 1;
                return Err(ServiceError::Internal("injected read failure".into()));
            }
        }

        let value = self
            .inner
            .values
            .lock()
            .get(&(property, area))
            .cloned()
            .ok_or(ServiceError::UnsupportedProperty { property, area })?;

        if value.value_type() != value_type {
            return Err(ServiceError::TypeMismatch {
                property,
                expected: value_type,
                actual: value.value_type(),
            });
        }

        tracing::trace!(%property, %area, %value, "in-memory get");
        Ok(value)
    }

    fn set(
        &self,
        value_type: ValueType,
        property: PropertyId,
        area: AreaId,
        value: RawValue,
    ) -> Result<(), ServiceError> {
        let _guard = self.enter(CallKind::Set, property, area, Some(value.clone()));

        {
            let mut faults = self.inner.faults.lock();
            if faults.disconnected {
                return Err(ServiceError::Disconnected("in-memory service closed".into()));
            }
            if faults.fail_next_sets > 0 {
                faults.fail_next_sets -= 1;
                return Err(ServiceError::Internal("injected write failure".into()));
            }
        }

        if value.value_type() != value_type {
            return Err(ServiceError::InvalidValue {
                property,
                reason: format!("declared {value_type} but got {}", value.value_type()),
            });
        }

        let mut values = self.inner.values.lock();
        let slot = values
            .get_mut(&(property, area))
            .ok_or(ServiceError::UnsupportedProperty { property, area })?;

        if slot.value_type() != value_type {
            return Err(ServiceError::TypeMismatch {
                property,
                expected: slot.value_type(),
                actual: value_type,
            });
        }

        tracing::trace!(%property, %area, %value, "in-memory set");
        *slot = value;
        Ok(())
    }
}

/// Connector handing out clones of one [`InMemoryPropertyService`]
#[derive(Debug, Clone)]
pub struct InMemoryConnector {
    service: InMemoryPropertyService,
    available: Arc<AtomicBool>,
}

impl InMemoryConnector {
    pub fn new(service: InMemoryPropertyService) -> Self {
        Self {
            service,
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// A connector whose service is not reachable
    pub fn unavailable() -> Self {
        let connector = Self::new(InMemoryPropertyService::new());
        connector.set_available(false);
        connector
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn service(&self) -> &InMemoryPropertyService {
        &self.service
    }
}

impl Connector for InMemoryConnector {
    fn connect(&self) -> Result<Box<dyn PropertyService>, ServiceError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable("in-memory service offline".into()));
        }
        Ok(Box::new(self.service.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AREA, I2C_CONTROL_INT, LED_CONTROL};

    fn service() -> InMemoryPropertyService {
        InMemoryPropertyService::new()
            .with_property(LED_CONTROL, AREA, RawValue::Int32(0))
            .with_property(I2C_CONTROL_INT, AREA, RawValue::Int32(33))
    }

    #[test]
    fn test_get_returns_registered_value() {
        let service = service();

        let value = service.get(ValueType::Int32, I2C_CONTROL_INT, AREA).unwrap();
        assert_eq!(value, RawValue::Int32(33));
    }

    #[test]
    fn test_set_then_get() {
        let service = service();

        service
            .set(ValueType::Int32, LED_CONTROL, AREA, RawValue::Int32(1))
            .unwrap();
        let value = service.get(ValueType::Int32, LED_CONTROL, AREA).unwrap();
        assert_eq!(value, RawValue::Int32(1));
    }

    #[test]
    fn test_unknown_property_is_unsupported() {
        let service = service();
        let unknown = PropertyId::new(0x2140_0199);

        let err = service.get(ValueType::Int32, unknown, AREA).unwrap_err();
        assert_eq!(err, ServiceError::UnsupportedProperty { property: unknown, area: AREA });

        let err = service
            .set(ValueType::Int32, LED_CONTROL, AreaId::new(4), RawValue::Int32(1))
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedProperty { .. }));
    }

    #[test]
    fn test_type_checks() {
        let service = service();

        let err = service.get(ValueType::Float, LED_CONTROL, AREA).unwrap_err();
        assert!(matches!(err, ServiceError::TypeMismatch { .. }));

        let err = service
            .set(ValueType::Int32, LED_CONTROL, AREA, RawValue::Boolean(true))
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidValue { .. }));

        let err = service
            .set(ValueType::Boolean, LED_CONTROL, AREA, RawValue::Boolean(true))
            .unwrap_err();
        assert!(matches!(err, ServiceError::TypeMismatch { .. }));
        assert_eq!(service.value(LED_CONTROL, AREA), Some(RawValue::Int32(0)));
    }

    #[test]
    fn test_injected_get_failures() {
        let service = service();
        service.fail_next_gets(2);

        assert!(service.get(ValueType::Int32, I2C_CONTROL_INT, AREA).is_err());
        assert!(service.get(ValueType::Int32, I2C_CONTROL_INT, AREA).is_err());
        assert!(service.get(ValueType::Int32, I2C_CONTROL_INT, AREA).is_ok());

        service.fail_all_gets(true);
        assert!(service.get(ValueType::Int32, I2C_CONTROL_INT, AREA).is_err());
        service.fail_all_gets(false);
        assert!(service.get(ValueType::Int32, I2C_CONTROL_INT, AREA).is_ok());
    }

    #[test]
    fn test_injected_set_failure() {
        let service = service();
        service.fail_next_sets(1);

        assert!(service
            .set(ValueType::Int32, LED_CONTROL, AREA, RawValue::Int32(1))
            .is_err());
        assert_eq!(service.value(LED_CONTROL, AREA), Some(RawValue::Int32(0)));
        assert!(service
            .set(ValueType::Int32, LED_CONTROL, AREA, RawValue::Int32(1))
            .is_ok());
    }

    #[test]
    fn test_disconnect_fails_everything() {
        let service = service();
        service.disconnect();

        assert!(matches!(
            service.get(ValueType::Int32, LED_CONTROL, AREA),
            Err(ServiceError::Disconnected(_))
        ));
        assert!(matches!(
            service.set(ValueType::Int32, LED_CONTROL, AREA, RawValue::Int32(1)),
            Err(ServiceError::Disconnected(_))
        ));

        service.reconnect();
        assert!(service.get(ValueType::Int32, LED_CONTROL, AREA).is_ok());
    }

    #[test]
    fn test_calls_are_recorded_in_order() {
        let service = service();

        service
            .set(ValueType::Int32, LED_CONTROL, AREA, RawValue::Int32(1))
            .unwrap();
        let _ = service.get(ValueType::Int32, I2C_CONTROL_INT, AREA);

        let calls = service.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].seq, 0);
        assert_eq!(calls[0].kind, CallKind::Set);
        assert_eq!(calls[0].value, Some(RawValue::Int32(1)));
        assert_eq!(calls[1].kind, CallKind::Get);
        assert_eq!(calls[1].property, I2C_CONTROL_INT);
        assert_eq!(service.set_count(), 1);
        assert_eq!(service.get_count(), 1);

        service.clear_calls();
        assert!(service.calls().is_empty());
    }

    #[test]
    fn test_poke_does_not_record() {
        let service = service();

        assert!(service.poke(I2C_CONTROL_INT, AREA, RawValue::Int32(66)));
        assert!(!service.poke(PropertyId::new(1), AREA, RawValue::Int32(66)));
        assert!(service.calls().is_empty());
        assert_eq!(service.value(I2C_CONTROL_INT, AREA), Some(RawValue::Int32(66)));
    }

    #[test]
    fn test_overlapping_calls_are_detected() {
        let service = service();
        service.set_latency(Some(Duration::from_millis(100)));

        let a = service.clone();
        let b = service.clone();
        let t1 = thread::spawn(move || a.get(ValueType::Int32, LED_CONTROL, AREA));
        let t2 = thread::spawn(move || b.get(ValueType::Int32, LED_CONTROL, AREA));
        t1.join().unwrap().unwrap();
        t2.join().unwrap().unwrap();

        assert!(service.overlap_count() >= 1);
    }

    #[test]
    fn test_connector_availability() {
        let connector = InMemoryConnector::new(service());
        assert!(connector.connect().is_ok());

        connector.set_available(false);
        assert!(matches!(connector.connect(), Err(ServiceError::Unavailable(_))));

        assert!(InMemoryConnector::unavailable().connect().is_err());
    }

    #[test]
    fn test_connected_service_shares_state() {
        let connector = InMemoryConnector::new(service());
        let connected = connector.connect().unwrap();

        connected
            .set(ValueType::Int32, LED_CONTROL, AREA, RawValue::Int32(1))
            .unwrap();
        assert_eq!(connector.service().value(LED_CONTROL, AREA), Some(RawValue::Int32(1)));
    }
}
