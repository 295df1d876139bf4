//! Partition type and subtype definitions

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use super::parse::parse_u8;
use crate::error::{MkfwError, Result};

/// Partition types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionType {
    /// Application image (0x00)
    App,
    /// Data region (0x01)
    Data,
    /// Free-form type, 0x40 and above
    Custom(u8),
}

impl PartitionType {
    /// Types reserved for core functions, never accepted
    pub const RESERVED: RangeInclusive<u8> = 0x02..=0x3F;

    /// Numeric value as stored on disk
    pub fn as_u8(self) -> u8 {
        match self {
            Self::App => 0x00,
            Self::Data => 0x01,
            Self::Custom(value) => value,
        }
    }
}

impl TryFrom<u8> for PartitionType {
    type Error = MkfwError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::App),
            0x01 => Ok(Self::Data),
            v if Self::RESERVED.contains(&v) => Err(MkfwError::ReservedType {
                value: format!("{v:#04x}"),
            }),
            v => Ok(Self::Custom(v)),
        }
    }
}

impl FromStr for PartitionType {
    type Err = MkfwError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "app" => Ok(Self::App),
            "data" => Ok(Self::Data),
            _ => {
                let value = parse_u8("partition type", s)?;
                Self::try_from(value).map_err(|_| MkfwError::ReservedType {
                    value: s.to_string(),
                })
            }
        }
    }
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::App => write!(f, "app"),
            Self::Data => write!(f, "data"),
            Self::Custom(value) => write!(f, "{value:#04x}"),
        }
    }
}

/// Partition subtype, interpreted relative to a [`PartitionType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionSubtype(u8);

impl PartitionSubtype {
    /// `factory` app subtype
    pub const APP_FACTORY: Self = Self(0x00);
    /// First OTA app subtype, `ota_0`
    pub const APP_OTA_BASE: u8 = 0x10;
    /// Number of OTA app slots
    pub const APP_OTA_SLOTS: u8 = 16;
    /// `ota` data subtype
    pub const DATA_OTA: Self = Self(0x00);
    /// `phy` data subtype
    pub const DATA_PHY: Self = Self(0x01);
    /// `nvs` data subtype
    pub const DATA_NVS: Self = Self(0x02);

    const APP_HINT: &'static str =
        "app subtypes can only be 'factory' (0x00) or 'ota_0' (0x10) to 'ota_15' (0x1f)";
    const OTA_HINT: &'static str = "should be one of ota_0, ..., ota_15";
    const DATA_HINT: &'static str = "data subtypes can only be 'ota' (0), 'phy' (1) or 'nvs' (2)";

    /// `ota_N` app subtype
    pub fn app_ota(slot: u8) -> Option<Self> {
        (slot < Self::APP_OTA_SLOTS).then(|| Self(Self::APP_OTA_BASE + slot))
    }

    /// Parse a subtype literal for a partition of type `type_`
    ///
    /// Named literals are tried first, then numeric values. App and data
    /// partitions only accept the values their named literals cover; custom
    /// types accept any byte.
    pub fn parse(type_: PartitionType, literal: &str) -> Result<Self> {
        match type_ {
            PartitionType::App => {
                if literal == "factory" {
                    return Ok(Self::APP_FACTORY);
                }
                if let Some(slot) = literal.strip_prefix("ota_") {
                    return parse_ota_slot(slot)
                        .and_then(Self::app_ota)
                        .ok_or_else(|| MkfwError::invalid_subtype(literal, Self::OTA_HINT));
                }
            }
            PartitionType::Data => match literal {
                "ota" => return Ok(Self::DATA_OTA),
                "phy" => return Ok(Self::DATA_PHY),
                "nvs" => return Ok(Self::DATA_NVS),
                _ => {}
            },
            PartitionType::Custom(_) => {}
        }

        let value = parse_u8("partition subtype", literal)?;
        let ota_range = Self::APP_OTA_BASE..Self::APP_OTA_BASE + Self::APP_OTA_SLOTS;
        match type_ {
            PartitionType::App if value != Self::APP_FACTORY.0 && !ota_range.contains(&value) => {
                Err(MkfwError::invalid_subtype(literal, Self::APP_HINT))
            }
            PartitionType::Data if value > Self::DATA_NVS.0 => {
                Err(MkfwError::invalid_subtype(literal, Self::DATA_HINT))
            }
            _ => Ok(Self(value)),
        }
    }

    /// Numeric value as stored on disk
    pub fn as_u8(self) -> u8 {
        self.0
    }

    /// Symbolic name for this subtype under `type_`, if it has one
    pub fn name(self, type_: PartitionType) -> Option<String> {
        match (type_, self.0) {
            (PartitionType::App, 0x00) => Some("factory".into()),
            (PartitionType::App, v) if (0x10..=0x1F).contains(&v) => {
                Some(format!("ota_{}", v - Self::APP_OTA_BASE))
            }
            (PartitionType::Data, 0x00) => Some("ota".into()),
            (PartitionType::Data, 0x01) => Some("phy".into()),
            (PartitionType::Data, 0x02) => Some("nvs".into()),
            _ => None,
        }
    }
}

/// Digits after `ota_`: a single digit, or `10` through `15`
fn parse_ota_slot(digits: &str) -> Option<u8> {
    match digits.as_bytes() {
        [d @ b'0'..=b'9'] => Some(d - b'0'),
        [b'1', d @ b'0'..=b'5'] => Some(10 + d - b'0'),
        _ => None,
    }
}
