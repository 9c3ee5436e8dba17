//! Identifier and value types shared by every property service
//!
//! A VHAL property id is a packed integer: the top nibble carries the
//! property group, the next nibble the area type and the following byte the
//! value type. The low 16 bits are the property's own index.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const GROUP_MASK: i32 = 0xf000_0000_u32 as i32;
const AREA_TYPE_MASK: i32 = 0x0f00_0000;
const VALUE_TYPE_MASK: i32 = 0x00ff_0000;

/// Identifier of a hardware property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "IdRepr", into = "i32")]
pub struct PropertyId(i32);

impl PropertyId {
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Value type encoded in the id, if the bits name a known type
    pub fn value_type(self) -> Option<ValueType> {
        ValueType::from_bits(self.0 & VALUE_TYPE_MASK)
    }

    pub fn area_type(self) -> Option<AreaType> {
        AreaType::from_bits(self.0 & AREA_TYPE_MASK)
    }

    pub fn group(self) -> Option<PropertyGroup> {
        PropertyGroup::from_bits(self.0 & GROUP_MASK)
    }

    pub fn is_vendor(self) -> bool {
        self.group() == Some(PropertyGroup::Vendor)
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<PropertyId> for i32 {
    fn from(id: PropertyId) -> Self {
        id.0
    }
}

impl FromStr for PropertyId {
    type Err = std::num::ParseIntError;

    /// Accepts decimal or `0x`-prefixed hexadecimal
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let raw = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16)? as i32,
            None => s.parse::<i32>()?,
        };
        Ok(Self(raw))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Int(i32),
    Text(String),
}

impl TryFrom<IdRepr> for PropertyId {
    type Error = String;

    fn try_from(repr: IdRepr) -> Result<Self, Self::Error> {
        match repr {
            IdRepr::Int(raw) => Ok(Self(raw)),
            IdRepr::Text(text) => text
                .parse()
                .map_err(|e| format!("invalid property id {text:?}: {e}")),
        }
    }
}

/// Zone a property applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId(i32);

impl AreaId {
    /// The single zone used by global properties
    pub const GLOBAL: AreaId = AreaId(0);

    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl Default for AreaId {
    fn default() -> Self {
        Self::GLOBAL
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Boolean,
    Int32,
    Int64,
    Float,
}

impl ValueType {
    fn from_bits(bits: i32) -> Option<Self> {
        match bits {
            0x0010_0000 => Some(Self::String),
            0x0020_0000 => Some(Self::Boolean),
            0x0040_0000 => Some(Self::Int32),
            0x0050_0000 => Some(Self::Int64),
            0x0060_0000 => Some(Self::Float),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AreaType {
    Global,
    Window,
    Mirror,
    Seat,
    Door,
    Wheel,
}

impl AreaType {
    fn from_bits(bits: i32) -> Option<Self> {
        match bits {
            0x0100_0000 => Some(Self::Global),
            0x0300_0000 => Some(Self::Window),
            0x0400_0000 => Some(Self::Mirror),
            0x0500_0000 => Some(Self::Seat),
            0x0600_0000 => Some(Self::Door),
            0x0700_0000 => Some(Self::Wheel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyGroup {
    System,
    Vendor,
}

impl PropertyGroup {
    fn from_bits(bits: i32) -> Option<Self> {
        match bits {
            0x1000_0000 => Some(Self::System),
            0x2000_0000 => Some(Self::Vendor),
            _ => None,
        }
    }
}

/// A property value as it crosses the service boundary
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Int32(i32),
    Int64(i64),
    Float(f32),
    Boolean(bool),
    String(String),
}

impl RawValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Int32(_) => ValueType::Int32,
            Self::Int64(_) => ValueType::Int64,
            Self::Float(_) => ValueType::Float,
            Self::Boolean(_) => ValueType::Boolean,
            Self::String(_) => ValueType::String,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
        }
    }
}
