//! Partition records
//!
//! Each partition is written as a 28-byte entry, a 4-byte actual length and
//! the raw payload:
//!
//! ```text
//! type(1) | subtype(1) | reserved(2) | label(16) | flags(4) | length(4) | actual length(4) | payload
//! ```
//!
//! All integers are little-endian.

pub mod parse;
pub mod types;

use std::fmt;
use std::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};

pub use parse::{PARTITION_ALIGN, align_up, parse_size};
pub use types::{PartitionSubtype, PartitionType};

use crate::error::{MkfwError, Result};
use crate::header::fixed_field;
use crate::payload::PayloadSource;

/// Maximum label length in bytes
pub const LABEL_SIZE: usize = 16;

/// Size of the on-disk partition entry
pub const ENTRY_SIZE: usize = 28;

/// Entry plus the actual-length field that follows it
pub const RECORD_HEADER_SIZE: usize = ENTRY_SIZE + 4;

/// Declared partition length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthSpec {
    /// Derived from the payload size, rounded up to [`PARTITION_ALIGN`]
    Auto,
    /// Explicit length, already validated as aligned
    Fixed(u32),
}

impl LengthSpec {
    /// Declared length for a payload of `actual` bytes
    ///
    /// Fails with [`MkfwError::PayloadTooLarge`] if the payload does not fit.
    pub fn resolve(self, actual: u64) -> Result<u32> {
        let declared = match self {
            Self::Fixed(length) => length,
            Self::Auto => align_up(actual).ok_or(MkfwError::PayloadTooLarge {
                actual,
                declared: u64::from(u32::MAX),
            })?,
        };

        if actual > u64::from(declared) {
            return Err(MkfwError::PayloadTooLarge {
                actual,
                declared: u64::from(declared),
            });
        }

        Ok(declared)
    }
}

impl FromStr for LengthSpec {
    type Err = MkfwError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Self::Auto),
            _ => parse_size(s).map(Self::Fixed),
        }
    }
}

/// Caller-supplied partition arguments, not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    pub type_: String,
    pub subtype: String,
    pub length: String,
    pub label: String,
    pub payload: PayloadSource,
}

impl PartitionSpec {
    /// Create a partition spec from its literal arguments
    pub fn new(
        type_: impl Into<String>,
        subtype: impl Into<String>,
        length: impl Into<String>,
        label: impl Into<String>,
        payload: impl Into<PayloadSource>,
    ) -> Self {
        Self {
            type_: type_.into(),
            subtype: subtype.into(),
            length: length.into(),
            label: label.into(),
            payload: payload.into(),
        }
    }

    /// Validate type, subtype, length and label, in that order
    pub fn resolve(&self) -> Result<PartitionDef> {
        let type_: PartitionType = self.type_.parse()?;
        let subtype = PartitionSubtype::parse(type_, &self.subtype)?;
        let length: LengthSpec = self.length.parse()?;

        Ok(PartitionDef {
            type_,
            subtype,
            length,
            label: fixed_field(&self.label),
        })
    }
}

/// Validated partition arguments, waiting for the payload size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionDef {
    pub type_: PartitionType,
    pub subtype: PartitionSubtype,
    pub length: LengthSpec,
    pub label: [u8; LABEL_SIZE],
}

impl PartitionDef {
    /// Build the entry for a payload of `actual` bytes
    pub fn finalize(&self, actual: u64) -> Result<PartitionEntry> {
        let length = self.length.resolve(actual)?;
        // resolve() guarantees actual <= length <= u32::MAX
        let actual_length = actual as u32;

        Ok(PartitionEntry {
            type_: self.type_,
            subtype: self.subtype,
            label: self.label,
            flags: 0,
            length,
            actual_length,
        })
    }
}

/// A partition entry ready to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionEntry {
    pub type_: PartitionType,
    pub subtype: PartitionSubtype,
    pub label: [u8; LABEL_SIZE],
    /// Reserved, always zero
    pub flags: u32,
    /// Declared length, a multiple of [`PARTITION_ALIGN`]
    pub length: u32,
    /// Real payload length, never more than `length`
    pub actual_length: u32,
}

impl PartitionEntry {
    /// Serialize the entry followed by the actual-length field
    pub fn encode(&self) -> [u8; RECORD_HEADER_SIZE] {
        let mut buf = [0u8; RECORD_HEADER_SIZE];
        buf[0] = self.type_.as_u8();
        buf[1] = self.subtype.as_u8();
        // bytes 2 and 3 are reserved
        buf[4..20].copy_from_slice(&self.label);
        LittleEndian::write_u32(&mut buf[20..24], self.flags);
        LittleEndian::write_u32(&mut buf[24..28], self.length);
        LittleEndian::write_u32(&mut buf[28..32], self.actual_length);
        buf
    }

    /// Label as text, up to the first zero byte
    pub fn label_str(&self) -> String {
        let end = self
            .label
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(LABEL_SIZE);
        String::from_utf8_lossy(&self.label[..end]).into_owned()
    }
}

impl fmt::Display for PartitionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subtype = self
            .subtype
            .name(self.type_)
            .unwrap_or_else(|| format!("{:#04x}", self.subtype.as_u8()));
        write!(
            f,
            "type={}, subtype={}, length={}, actual={}, label={:<16}",
            self.type_,
            subtype,
            self.length,
            self.actual_length,
            self.label_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(type_: &str, subtype: &str, length: &str, label: &str) -> PartitionSpec {
        PartitionSpec::new(type_, subtype, length, label, Vec::new())
    }

    #[test]
    fn test_resolve_app_factory() {
        let def = spec("app", "factory", "auto", "app").resolve().unwrap();
        assert_eq!(def.type_, PartitionType::App);
        assert_eq!(def.subtype, PartitionSubtype::APP_FACTORY);
        assert_eq!(def.length, LengthSpec::Auto);
        assert_eq!(&def.label[..4], b"app\0");
    }

    #[test]
    fn test_validation_order() {
        // type is checked before subtype and length
        let err = spec("0x05", "ota_16", "100000", "x").resolve().unwrap_err();
        assert!(matches!(err, MkfwError::ReservedType { .. }));

        // subtype before length
        let err = spec("app", "ota_16", "100000", "x").resolve().unwrap_err();
        assert!(matches!(err, MkfwError::InvalidSubtype { .. }));

        let err = spec("app", "ota_1", "100000", "x").resolve().unwrap_err();
        assert!(matches!(err, MkfwError::UnalignedSize { .. }));
    }

    #[test]
    fn test_long_label_is_truncated() {
        let def = spec("data", "nvs", "64K", "a_very_long_partition_label")
            .resolve()
            .unwrap();
        assert_eq!(&def.label, b"a_very_long_part");
    }

    #[test]
    fn test_auto_length() {
        assert_eq!(LengthSpec::Auto.resolve(0).unwrap(), 0);
        assert_eq!(LengthSpec::Auto.resolve(1).unwrap(), 65536);
        assert_eq!(LengthSpec::Auto.resolve(65536).unwrap(), 65536);
        assert_eq!(LengthSpec::Auto.resolve(65537).unwrap(), 131072);
        assert!(matches!(
            LengthSpec::Auto.resolve(u64::from(u32::MAX)),
            Err(MkfwError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_fixed_length_too_small() {
        assert_eq!(LengthSpec::Fixed(65536).resolve(65536).unwrap(), 65536);
        let err = LengthSpec::Fixed(65536).resolve(65537).unwrap_err();
        assert!(matches!(
            err,
            MkfwError::PayloadTooLarge {
                actual: 65537,
                declared: 65536
            }
        ));
    }

    #[test]
    fn test_encode_layout() {
        let def = spec("app", "ota_2", "128k", "firmware").resolve().unwrap();
        let entry = def.finalize(70000).unwrap();
        let bytes = entry.encode();

        assert_eq!(bytes.len(), RECORD_HEADER_SIZE);
        assert_eq!(bytes[0], 0x00);
        assert_eq!(bytes[1], 0x12);
        assert_eq!(&bytes[2..4], &[0, 0]);
        assert_eq!(&bytes[4..12], b"firmware");
        assert!(bytes[12..20].iter().all(|&b| b == 0));
        assert_eq!(&bytes[20..24], &[0, 0, 0, 0]);
        assert_eq!(&bytes[24..28], &0x20000u32.to_le_bytes());
        assert_eq!(&bytes[28..32], &70000u32.to_le_bytes());
    }

    #[test]
    fn test_entry_display() {
        let entry = spec("data", "phy", "auto", "phy_init")
            .resolve()
            .unwrap()
            .finalize(10)
            .unwrap();
        let line = entry.to_string();
        assert!(line.starts_with(
            "type=data, subtype=phy, length=65536, actual=10, label=phy_init"
        ));

        let entry = spec("0x40", "0x07", "auto", "")
            .resolve()
            .unwrap()
            .finalize(0)
            .unwrap();
        assert!(entry.to_string().starts_with("type=0x40, subtype=0x07, length=0"));
    }
}
