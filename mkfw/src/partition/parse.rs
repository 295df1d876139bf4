//! Integer and size literal parsing for partition arguments

use crate::error::{MkfwError, Result};

/// Partition lengths must be a multiple of this value
pub const PARTITION_ALIGN: u32 = 0x10000;

/// Parse an unsigned integer written in decimal or as `0x`/`0X` hex
pub fn parse_integer(field: &'static str, literal: &str) -> Result<u64> {
    let (radix, digits) = match literal
        .strip_prefix("0x")
        .or_else(|| literal.strip_prefix("0X"))
    {
        Some(hex) => (16, hex),
        None => (10, literal),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(MkfwError::parse(field, literal));
    }

    // Only overflow is left once the digits are known to be valid
    u64::from_str_radix(digits, radix).map_err(|_| MkfwError::range(field, literal))
}

/// Parse an integer that must fit in one byte
pub fn parse_u8(field: &'static str, literal: &str) -> Result<u8> {
    let value = parse_integer(field, literal)?;
    u8::try_from(value).map_err(|_| MkfwError::range(field, literal))
}

/// Parse a partition size with an optional `k`/`K` or `m`/`M` multiplier
///
/// The result must fit in 32 bits and be aligned to [`PARTITION_ALIGN`].
pub fn parse_size(literal: &str) -> Result<u32> {
    const FIELD: &str = "partition size";

    let (body, multiplier) = match literal.as_bytes().last() {
        Some(b'k' | b'K') => (&literal[..literal.len() - 1], 1024),
        Some(b'm' | b'M') => (&literal[..literal.len() - 1], 1024 * 1024),
        _ => (literal, 1),
    };

    let value = parse_integer(FIELD, body).map_err(|err| match err {
        MkfwError::Parse { .. } => MkfwError::parse(FIELD, literal),
        _ => MkfwError::range(FIELD, literal),
    })?;
    let value = value
        .checked_mul(multiplier)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| MkfwError::range(FIELD, literal))?;

    if value % PARTITION_ALIGN != 0 {
        return Err(MkfwError::UnalignedSize {
            value: literal.to_string(),
        });
    }

    Ok(value)
}

/// Round a payload length up to the next partition boundary
///
/// Already aligned lengths are returned unchanged. Returns `None` when the
/// rounded length does not fit in 32 bits.
pub fn align_up(len: u64) -> Option<u32> {
    let mask = u64::from(PARTITION_ALIGN) - 1;
    let aligned = len.checked_add(mask)? & !mask;
    u32::try_from(aligned).ok()
}
