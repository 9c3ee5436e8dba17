//! Vendor property bridge
//!
//! Turns the vendor LED on and off and, optionally, polls the vendor I2C
//! sensor and reports it as a 0-100 gauge.
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use vendor_bridge::{BridgeConfig, Dispatched, Dispatcher, GaugeReading, VendorBridge};
//! use property_service::{InMemoryConnector, InMemoryPropertyService, RawValue, AREA, I2C_CONTROL_INT, LED_CONTROL};
//!
//! let service = InMemoryPropertyService::new()
//!     .with_property(LED_CONTROL, AREA, RawValue::Int32(0))
//!     .with_property(I2C_CONTROL_INT, AREA, RawValue::Int32(33));
//!
//! let config = BridgeConfig::default().with_poll_interval(Duration::from_millis(20));
//! let bridge = VendorBridge::connect(&InMemoryConnector::new(service), config);
//! bridge.led_on().unwrap();
//!
//! // Readings arrive on whichever thread drains the dispatcher
//! let ui = Dispatcher::new();
//! bridge
//!     .start_gauge(Dispatched::new(ui.handle(), |reading: GaugeReading| {
//!         assert_eq!(reading.percent, 50);
//!     }))
//!     .unwrap();
//!
//! assert!(ui.run_next_timeout(Duration::from_secs(1)));
//! bridge.shutdown_gauge().unwrap();
//! ```
//!
//! # Configuration
//!
//! See [`BridgeConfig`]. `VHAL_POLL_INTERVAL_MS` and `VHAL_GAUGE` override
//! the loaded values via [`BridgeConfig::with_env_overrides`].

mod bridge;
pub mod config;
mod error;
mod gauge;
mod led;

pub use bridge::VendorBridge;
pub use config::{BridgeConfig, GaugeConfig};
pub use error::{BridgeError, ConfigError, Result};
pub use gauge::{GaugeReading, GaugeStatus};
pub use led::LedState;

// Delivery types callers need to build gauge observers
pub use property_client::{Delivery, DispatchHandle, Dispatched, Dispatcher, SessionId, SessionToken};
