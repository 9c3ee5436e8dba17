//! Linear rescaling of raw sensor readings onto a 0-100 display range
//!
//! The I2C sensor reports `0..=66` over its travel; the display wants a
//! percentage. `(raw * 100) / 66` is computed in `i64` and saturated back
//! into `i32`, so extreme readings never overflow.

use serde::{Deserialize, Serialize};

/// Native full-scale reading of the I2C sensor
pub const SENSOR_FULL_SCALE: i32 = 66;

/// How integer division rounds negative quotients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Truncate toward zero: `-1 * 100 / 66 == -1`
    #[default]
    TowardZero,
    /// Round toward negative infinity: `-1 * 100 / 66 == -2`
    Floor,
}

/// `mapped = raw * 100 / full_scale`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearScale {
    pub full_scale: i32,
    #[serde(default)]
    pub rounding: Rounding,
}

impl LinearScale {
    pub const fn new(full_scale: i32, rounding: Rounding) -> Self {
        Self {
            full_scale,
            rounding,
        }
    }

    /// Scale for the vendor I2C sensor
    pub const fn sensor() -> Self {
        Self::new(SENSOR_FULL_SCALE, Rounding::TowardZero)
    }

    /// Rescale one reading
    ///
    /// A non-positive `full_scale` has no meaningful mapping and yields 0.
    pub fn apply(&self, raw: i32) -> i32 {
        if self.full_scale <= 0 {
            return 0;
        }

        let numerator = i64::from(raw) * 100;
        let divisor = i64::from(self.full_scale);
        let mapped = match self.rounding {
            Rounding::TowardZero => numerator / divisor,
            Rounding::Floor => numerator.div_euclid(divisor),
        };

        i32::try_from(mapped).unwrap_or(if mapped < 0 { i32::MIN } else { i32::MAX })
    }

    /// Clamp a mapped value onto a progress indicator's `0..=100`
    pub fn display_percent(mapped: i32) -> u8 {
        mapped.clamp(0, 100) as u8
    }
}

impl Default for LinearScale {
    fn default() -> Self {
        Self::sensor()
    }
}

/// `(raw * 100) / 66`, truncating toward zero
pub fn scale_to_percent(raw: i32) -> i32 {
    LinearScale::sensor().apply(raw)
}
