//! Typed property values
//!
//! The `PropertyValue` trait ties a Rust type to the raw representation the
//! property service speaks, so reads and writes are checked against the
//! value type encoded in the property id.
//!
//! # Example
//!
//! ```rust
//! use property_client::PropertyValue;
//! use property_service::{RawValue, ValueType};
//!
//! #[derive(Clone, Copy, Debug, PartialEq)]
//! struct Brightness(u8);
//!
//! impl PropertyValue for Brightness {
//!     const VALUE_TYPE: ValueType = ValueType::Int32;
//!
//!     fn into_raw(self) -> RawValue {
//!         RawValue::Int32(self.0 as i32)
//!     }
//!
//!     fn from_raw(raw: RawValue) -> Option<Self> {
//!         match raw {
//!             RawValue::Int32(v) => u8::try_from(v).ok().map(Brightness),
//!             _ => None,
//!         }
//!     }
//! }
//! ```

use property_service::{RawValue, ValueType};

/// A Rust type that can be read from and written to a property
///
/// Values must be:
/// - Clone + Send + 'static: so the polling thread can own and hand them on
/// - convertible both ways to a `RawValue` of `VALUE_TYPE`
pub trait PropertyValue: Clone + Send + 'static {
    /// Wire type this value is carried as
    const VALUE_TYPE: ValueType;

    fn into_raw(self) -> RawValue;

    /// Convert back from the wire, `None` if `raw` is not representable
    fn from_raw(raw: RawValue) -> Option<Self>;
}

impl PropertyValue for i32 {
    const VALUE_TYPE: ValueType = ValueType::Int32;

    fn into_raw(self) -> RawValue {
        RawValue::Int32(self)
    }

    fn from_raw(raw: RawValue) -> Option<Self> {
        match raw {
            RawValue::Int32(v) => Some(v),
            _ => None,
        }
    }
}

impl PropertyValue for i64 {
    const VALUE_TYPE: ValueType = ValueType::Int64;

    fn into_raw(self) -> RawValue {
        RawValue::Int64(self)
    }

    fn from_raw(raw: RawValue) -> Option<Self> {
        match raw {
            RawValue::Int64(v) => Some(v),
            _ => None,
        }
    }
}

impl PropertyValue for f32 {
    const VALUE_TYPE: ValueType = ValueType::Float;

    fn into_raw(self) -> RawValue {
        RawValue::Float(self)
    }

    fn from_raw(raw: RawValue) -> Option<Self> {
        match raw {
            RawValue::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl PropertyValue for bool {
    const VALUE_TYPE: ValueType = ValueType::Boolean;

    fn into_raw(self) -> RawValue {
        RawValue::Boolean(self)
    }

    fn from_raw(raw: RawValue) -> Option<Self> {
        match raw {
            RawValue::Boolean(v) => Some(v),
            _ => None,
        }
    }
}

impl PropertyValue for String {
    const VALUE_TYPE: ValueType = ValueType::String;

    fn into_raw(self) -> RawValue {
        RawValue::String(self)
    }

    fn from_raw(raw: RawValue) -> Option<Self> {
        match raw {
            RawValue::String(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int32_round_trip() {
        assert_eq!(i32::from_raw(42i32.into_raw()), Some(42));
        assert_eq!(i32::VALUE_TYPE, ValueType::Int32);
    }

    #[test]
    fn test_wrong_raw_type_is_rejected() {
        assert_eq!(i32::from_raw(RawValue::Boolean(true)), None);
        assert_eq!(bool::from_raw(RawValue::Int32(1)), None);
        assert_eq!(String::from_raw(RawValue::Float(0.5)), None);
    }

    #[test]
    fn test_value_types_match_raw() {
        assert_eq!(7i64.into_raw().value_type(), i64::VALUE_TYPE);
        assert_eq!(0.5f32.into_raw().value_type(), f32::VALUE_TYPE);
        assert_eq!(true.into_raw().value_type(), bool::VALUE_TYPE);
        assert_eq!("on".to_string().into_raw().value_type(), String::VALUE_TYPE);
    }
}
