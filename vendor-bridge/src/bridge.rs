//! The vendor bridge: LED control plus an optional polled gauge

use property_client::{Delivery, PollingLoop, PropertyClient, SessionId};
use property_service::Connector;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::gauge::{GaugeReading, GaugeStatus};
use crate::led::LedState;

/// Drives the vendor LED and, when enabled, the I2C gauge
///
/// A bridge whose connection failed still exists: every LED call returns
/// [`BridgeError::Disconnected`] until [`reconnect`](Self::reconnect)
/// succeeds. Dropping the bridge stops the gauge.
///
/// # Example
///
/// ```rust
/// use vendor_bridge::{BridgeConfig, LedState, VendorBridge};
/// use property_service::{InMemoryConnector, InMemoryPropertyService, RawValue, AREA, LED_CONTROL};
///
/// let service = InMemoryPropertyService::new().with_property(LED_CONTROL, AREA, RawValue::Int32(0));
/// let bridge = VendorBridge::connect(&InMemoryConnector::new(service.clone()), BridgeConfig::led_only());
///
/// bridge.led_on().unwrap();
/// assert_eq!(service.value(LED_CONTROL, AREA), Some(RawValue::Int32(1)));
/// assert_eq!(bridge.toggle_led().unwrap(), LedState::Off);
/// ```
#[derive(Debug)]
pub struct VendorBridge {
    config: BridgeConfig,
    client: Option<PropertyClient>,
    gauge: PollingLoop,
}

impl VendorBridge {
    /// Connect through `connector`
    ///
    /// A failed connection is logged and leaves the bridge disabled.
    pub fn connect<C: Connector + ?Sized>(connector: &C, config: BridgeConfig) -> Self {
        let client = match PropertyClient::connect(connector) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::error!(error = %e, "vendor bridge disabled");
                None
            }
        };

        Self {
            config,
            client,
            gauge: PollingLoop::new(),
        }
    }

    /// Build a bridge on an existing client
    pub fn with_client(client: PropertyClient, config: BridgeConfig) -> Self {
        Self {
            config,
            client: Some(client),
            gauge: PollingLoop::new(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Try to connect again
    ///
    /// Any running gauge is shut down first, since it holds the old
    /// connection. On failure the bridge is left disabled.
    pub fn reconnect<C: Connector + ?Sized>(&mut self, connector: &C) -> Result<()> {
        self.gauge.shutdown()?;
        self.client = None;

        let client = PropertyClient::connect(connector)?;
        tracing::info!("vendor bridge reconnected");
        self.client = Some(client);
        Ok(())
    }

    pub fn set_led(&self, state: LedState) -> Result<()> {
        self.client()?.write(self.config.led, state)?;
        tracing::info!(led = %state, "LED set");
        Ok(())
    }

    pub fn led_on(&self) -> Result<()> {
        self.set_led(LedState::On)
    }

    pub fn led_off(&self) -> Result<()> {
        self.set_led(LedState::Off)
    }

    /// Flip the LED and return its new state
    pub fn toggle_led(&self) -> Result<LedState> {
        let led = self.config.led;
        let state = self
            .client()?
            .update::<LedState, _>(led.property, led.area, LedState::toggled)?;
        tracing::info!(led = %state, "LED toggled");
        Ok(state)
    }

    pub fn led_state(&self) -> Result<LedState> {
        Ok(self.client()?.read(self.config.led)?)
    }

    /// Start polling the gauge sensor, delivering each reading to `observer`
    pub fn start_gauge<D>(&self, observer: D) -> Result<SessionId>
    where
        D: Delivery<GaugeReading>,
    {
        if !self.config.gauge.enabled {
            return Err(BridgeError::GaugeDisabled);
        }
        let client = self.client()?;
        let scale = self.config.gauge.scale();

        let session = self.gauge.start(
            client,
            self.config.gauge.target,
            self.config.gauge.interval(),
            move |raw: i32| GaugeReading::new(raw, scale),
            observer,
        )?;
        Ok(session)
    }

    /// Ask the gauge to stop without waiting for its thread
    pub fn stop_gauge(&self) {
        self.gauge.stop();
    }

    /// Stop the gauge and wait for its thread to exit
    pub fn shutdown_gauge(&self) -> Result<()> {
        Ok(self.gauge.shutdown()?)
    }

    pub fn gauge_status(&self) -> GaugeStatus {
        GaugeStatus::from_stats(self.gauge.stats())
    }

    fn client(&self) -> Result<&PropertyClient> {
        self.client.as_ref().ok_or(BridgeError::Disconnected)
    }
}
