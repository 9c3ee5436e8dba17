use std::fmt;

use property_client::PropertyValue;
use property_service::{RawValue, ValueType};

/// State of the vendor LED
///
/// Written as `0`/`1`; any non-zero reading counts as on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LedState {
    #[default]
    Off,
    On,
}

impl LedState {
    pub fn is_on(self) -> bool {
        self == LedState::On
    }

    pub fn toggled(self) -> Self {
        match self {
            LedState::Off => LedState::On,
            LedState::On => LedState::Off,
        }
    }
}

impl From<bool> for LedState {
    fn from(on: bool) -> Self {
        if on {
            LedState::On
        } else {
            LedState::Off
        }
    }
}

impl fmt::Display for LedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedState::Off => f.write_str("off"),
            LedState::On => f.write_str("on"),
        }
    }
}

impl PropertyValue for LedState {
    const VALUE_TYPE: ValueType = ValueType::Int32;

    fn into_raw(self) -> RawValue {
        match self {
            LedState::Off => RawValue::Int32(0),
            LedState::On => RawValue::Int32(1),
        }
    }

    fn from_raw(raw: RawValue) -> Option<Self> {
        match raw {
            RawValue::Int32(v) => Some(LedState::from(v != 0)),
            _ => None,
        }
    }
}
