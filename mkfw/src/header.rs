//! Fixed-size text fields at the front of the firmware image

use crate::{DESCRIPTION_SIZE, HEADER_SIZE};

/// Copy `text` into a zero-padded array of `N` bytes, truncating if longer
pub fn fixed_field<const N: usize>(text: &str) -> [u8; N] {
    let mut field = [0u8; N];
    let bytes = text.as_bytes();
    let len = bytes.len().min(N);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

/// Header tag and description, the first 64 bytes of every image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareHeader {
    tag: [u8; HEADER_SIZE],
    description: [u8; DESCRIPTION_SIZE],
}

impl FirmwareHeader {
    /// Create a header from the tag and description text
    pub fn new(tag: &str, description: &str) -> Self {
        Self {
            tag: fixed_field(tag),
            description: fixed_field(description),
        }
    }

    /// Raw header tag bytes
    pub fn tag(&self) -> &[u8; HEADER_SIZE] {
        &self.tag
    }

    /// Raw description bytes
    pub fn description(&self) -> &[u8; DESCRIPTION_SIZE] {
        &self.description
    }

    /// Header tag as text, up to the first zero byte
    pub fn tag_str(&self) -> String {
        field_to_string(&self.tag)
    }

    /// Description as text, up to the first zero byte
    pub fn description_str(&self) -> String {
        field_to_string(&self.description)
    }
}

fn field_to_string(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_field_is_zero_padded() {
        let field: [u8; 8] = fixed_field("abc");
        assert_eq!(&field, b"abc\0\0\0\0\0");
    }

    #[test]
    fn test_long_field_is_truncated() {
        let field: [u8; 4] = fixed_field("abcdefgh");
        assert_eq!(&field, b"abcd");
    }

    #[test]
    fn test_exact_field_has_no_terminator() {
        let field: [u8; 4] = fixed_field("abcd");
        assert_eq!(&field, b"abcd");
    }

    #[test]
    fn test_header_fields() {
        let header = FirmwareHeader::new("MYFW", "test");
        assert_eq!(header.tag().len(), HEADER_SIZE);
        assert_eq!(header.description().len(), DESCRIPTION_SIZE);
        assert_eq!(&header.tag()[..4], b"MYFW");
        assert!(header.tag()[4..].iter().all(|&b| b == 0));
        assert_eq!(header.tag_str(), "MYFW");
        assert_eq!(header.description_str(), "test");
    }

    #[test]
    fn test_default_tag_fills_header() {
        let header = FirmwareHeader::new(crate::DEFAULT_HEADER, "");
        assert_eq!(header.tag(), crate::DEFAULT_HEADER.as_bytes());
        assert!(header.description().iter().all(|&b| b == 0));
    }
}
