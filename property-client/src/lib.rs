//! Client side of the vendor property bridge
//!
//! Wraps a [`property_service::PropertyService`] connection with typed,
//! lock-serialized access and a cancellable polling loop.
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use property_client::prelude::*;
//! use property_service::{InMemoryConnector, InMemoryPropertyService, RawValue, AREA, I2C_CONTROL_INT, LED_CONTROL};
//!
//! let service = InMemoryPropertyService::new()
//!     .with_property(LED_CONTROL, AREA, RawValue::Int32(0))
//!     .with_property(I2C_CONTROL_INT, AREA, RawValue::Int32(66));
//! let client = PropertyClient::connect(&InMemoryConnector::new(service)).unwrap();
//!
//! // Write the LED
//! client.set_property(LED_CONTROL, AREA, 1i32).unwrap();
//!
//! // Poll the sensor and deliver on this thread
//! let dispatcher = Dispatcher::new();
//! let poller = PollingLoop::new();
//! poller
//!     .start(
//!         &client,
//!         PropertyTarget::new(I2C_CONTROL_INT, AREA),
//!         Duration::from_millis(20),
//!         scale_to_percent,
//!         Dispatched::new(dispatcher.handle(), |percent: i32| assert_eq!(percent, 100)),
//!     )
//!     .unwrap();
//!
//! assert!(dispatcher.run_next_timeout(Duration::from_secs(1)));
//! poller.shutdown().unwrap();
//! ```
//!
//! # Architecture
//!
//! ```text
//! PollingLoop ──▶ PollingSession (thread)
//!                     │ read every interval
//!                     ▼
//! PropertyClient ── Mutex<Box<dyn PropertyService>>
//!                     │ transform
//!                     ▼
//!                 Delivery ──▶ inline closure | Dispatcher queue
//! ```

pub mod client;
pub mod delivery;
pub mod error;
pub mod logging;
pub mod polling;
pub mod transform;
pub mod value;

pub use client::{PropertyClient, PropertyTarget};
pub use delivery::{DispatchHandle, Dispatched, Dispatcher, Delivery};
pub use error::{ConnectionError, Operation, PollingError, PropertyError, Result};
pub use polling::{
    PollState, PollingLoop, PollingSession, PollingStats, SessionId, SessionToken, DEFAULT_POLL_INTERVAL,
};
pub use transform::{scale_to_percent, LinearScale, Rounding, SENSOR_FULL_SCALE};
pub use value::PropertyValue;

pub mod prelude {
    pub use crate::{
        scale_to_percent, Delivery, Dispatched, Dispatcher, PollingLoop, PropertyClient, PropertyTarget,
        PropertyValue,
    };
}
