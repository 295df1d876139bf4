//! Error types for firmware assembly

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for mkfw operations
pub type Result<T> = std::result::Result<T, MkfwError>;

/// Coarse grouping of errors, used to pick the process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Arguments or input contents are invalid
    InvalidParams,
    /// An input file could not be read
    Read,
    /// The output could not be written
    Write,
}

impl ErrorCategory {
    /// Exit status reported by the `mkfw` binary
    pub fn exit_code(self) -> i32 {
        match self {
            Self::InvalidParams => -1,
            Self::Read => -2,
            Self::Write => -3,
        }
    }
}

/// Errors that can occur while assembling a firmware image
#[derive(Error, Debug)]
pub enum MkfwError {
    #[error("could not parse {field}: {value}")]
    Parse { field: &'static str, value: String },

    #[error("{field} is too large: {value}")]
    Range { field: &'static str, value: String },

    #[error("partition type {value} is reserved, use app (0), data (1) or a type >= 0x40")]
    ReservedType { value: String },

    #[error("invalid subtype {value}: {reason}")]
    InvalidSubtype { value: String, reason: &'static str },

    #[error("partition size is not aligned to 64K: {value}")]
    UnalignedSize { value: String },

    #[error("actual partition size {actual} is larger than the declared size {declared}")]
    PayloadTooLarge { actual: u64, declared: u64 },

    #[error("invalid tile dimensions: expected {expected_width}x{expected_height}, got {width}x{height}")]
    InvalidDimensions {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("unsupported tile pixel format: {color} with {bit_depth}-bit samples")]
    UnsupportedFormat { color: String, bit_depth: u8 },

    #[error("tile is {actual} bytes, expected exactly {expected} bytes")]
    TileSize { expected: usize, actual: u64 },

    #[error("could not decode PNG tile: {0}")]
    Decode(#[from] png::DecodingError),

    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not write firmware: {0}")]
    Write(#[source] io::Error),

    #[error("invalid manifest {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing {0}")]
    MissingArgument(String),

    #[error("partition {index}: {source}")]
    Partition {
        index: usize,
        #[source]
        source: Box<MkfwError>,
    },
}

impl MkfwError {
    /// Create a parse error for a malformed literal
    pub fn parse(field: &'static str, value: impl Into<String>) -> Self {
        Self::Parse {
            field,
            value: value.into(),
        }
    }

    /// Create a range error for a value that does not fit its field
    pub fn range(field: &'static str, value: impl Into<String>) -> Self {
        Self::Range {
            field,
            value: value.into(),
        }
    }

    /// Create an invalid subtype error
    pub fn invalid_subtype(value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidSubtype {
            value: value.into(),
            reason,
        }
    }

    /// Create a read error for the given input path
    pub fn read(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Read {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Attach a partition index to an error
    pub fn in_partition(self, index: usize) -> Self {
        match self {
            already @ Self::Partition { .. } => already,
            other => Self::Partition {
                index,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping partition context
    pub fn root(&self) -> &MkfwError {
        match self {
            Self::Partition { source, .. } => source.root(),
            other => other,
        }
    }

    /// Category used to select the exit status
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Partition { source, .. } => source.category(),
            Self::Decode(_) | Self::Read { .. } => ErrorCategory::Read,
            Self::Write(_) => ErrorCategory::Write,
            _ => ErrorCategory::InvalidParams,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ErrorCategory::InvalidParams.exit_code(), -1);
        assert_eq!(ErrorCategory::Read.exit_code(), -2);
        assert_eq!(ErrorCategory::Write.exit_code(), -3);
    }

    #[test]
    fn test_partition_context_keeps_category() {
        let err = MkfwError::read("missing.bin", io::Error::from(io::ErrorKind::NotFound))
            .in_partition(3);
        assert_eq!(err.category(), ErrorCategory::Read);
        assert!(err.to_string().starts_with("partition 3: could not read missing.bin"));

        let err = MkfwError::UnalignedSize {
            value: "100000".into(),
        }
        .in_partition(0)
        .in_partition(7);
        assert_eq!(err.category(), ErrorCategory::InvalidParams);
        assert!(matches!(err, MkfwError::Partition { index: 0, .. }));
        assert!(matches!(err.root(), MkfwError::UnalignedSize { .. }));
    }

    #[test]
    fn test_write_category() {
        let err = MkfwError::Write(io::Error::from(io::ErrorKind::WriteZero));
        assert_eq!(err.category(), ErrorCategory::Write);
    }
}
