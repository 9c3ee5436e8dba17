//! Configuration for [`VendorBridge`](crate::VendorBridge)
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```json
//! {
//!   "led": { "property": "0x21400104", "area": 0 },
//!   "gauge": {
//!     "enabled": true,
//!     "target": { "property": "0x21400105" },
//!     "interval_ms": 500,
//!     "full_scale": 66,
//!     "rounding": "toward_zero"
//!   }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use property_client::{LinearScale, PropertyTarget, Rounding, DEFAULT_POLL_INTERVAL, SENSOR_FULL_SCALE};
use property_service::{AREA, I2C_CONTROL_INT, LED_CONTROL};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const POLL_INTERVAL_ENV: &str = "VHAL_POLL_INTERVAL_MS";
pub const GAUGE_ENV: &str = "VHAL_GAUGE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// LED property written by `set_led`
    /// Default: LED_CONTROL in the global area
    pub led: PropertyTarget,

    pub gauge: GaugeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaugeConfig {
    /// Poll the sensor at all
    /// Default: true
    pub enabled: bool,

    /// Sensor property
    /// Default: I2C_CONTROL_INT in the global area
    pub target: PropertyTarget,

    /// Default: 500
    pub interval_ms: u64,

    /// Raw reading that maps to 100%
    /// Default: 66
    pub full_scale: i32,

    /// Default: toward_zero
    pub rounding: Rounding,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            led: PropertyTarget::new(LED_CONTROL, AREA),
            gauge: GaugeConfig::default(),
        }
    }
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target: PropertyTarget::new(I2C_CONTROL_INT, AREA),
            interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            full_scale: SENSOR_FULL_SCALE,
            rounding: Rounding::TowardZero,
        }
    }
}

impl GaugeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn scale(&self) -> LinearScale {
        LinearScale::new(self.full_scale, self.rounding)
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// LED control only, no sensor polling
    pub fn led_only() -> Self {
        let mut config = Self::default();
        config.gauge.enabled = false;
        config
    }

    /// Set the gauge poll interval, rounded up to whole milliseconds
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        let millis = interval.as_nanos().div_ceil(1_000_000);
        self.gauge.interval_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    pub fn with_gauge(mut self, enabled: bool) -> Self {
        self.gauge.enabled = enabled;
        self
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading bridge config");
        Self::from_json_str(&json)
    }

    /// Apply `VHAL_POLL_INTERVAL_MS` and `VHAL_GAUGE` from the environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from any variable source
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(POLL_INTERVAL_ENV) {
            self.gauge.interval_ms = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: POLL_INTERVAL_ENV,
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup(GAUGE_ENV) {
            let normalized = value.trim().to_ascii_lowercase();
            self.gauge.enabled = match normalized.as_str() {
                "on" | "true" | "1" => true,
                "off" | "false" | "0" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: GAUGE_ENV,
                        value,
                    })
                }
            };
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gauge.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "gauge.interval_ms must be greater than zero".into(),
            ));
        }
        if self.gauge.full_scale <= 0 {
            return Err(ConfigError::Invalid(format!(
                "gauge.full_scale must be positive, got {}",
                self.gauge.full_scale
            )));
        }
        Ok(())
    }
}
