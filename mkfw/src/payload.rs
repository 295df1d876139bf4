//! Partition payload sources

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::crc::CrcWriter;
use crate::error::{MkfwError, Result};

/// Size of the buffer used to stream payloads into the image
pub const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Where a partition's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSource {
    /// Contents of a file, streamed in chunks
    File(PathBuf),
    /// Bytes already in memory
    Bytes(Vec<u8>),
}

impl PayloadSource {
    /// Open the payload and measure its length
    pub fn open(&self) -> Result<OpenPayload<'_>> {
        match self {
            Self::File(path) => {
                let file = File::open(path).map_err(|e| MkfwError::read(path, e))?;
                let len = file.metadata().map_err(|e| MkfwError::read(path, e))?.len();
                Ok(OpenPayload {
                    len,
                    origin: path.clone(),
                    reader: Box::new(file),
                })
            }
            Self::Bytes(bytes) => Ok(OpenPayload {
                len: bytes.len() as u64,
                origin: PathBuf::from("<memory>"),
                reader: Box::new(bytes.as_slice()),
            }),
        }
    }

    /// Human readable origin, used in reports
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

impl From<PathBuf> for PayloadSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for PayloadSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<Vec<u8>> for PayloadSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// An opened payload with a known length
pub struct OpenPayload<'a> {
    len: u64,
    origin: PathBuf,
    reader: Box<dyn Read + 'a>,
}

impl OpenPayload<'_> {
    /// Length measured when the payload was opened
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stream exactly the measured length into `out`, `chunk` bytes at a time
    ///
    /// A source that ends early or still has bytes after the measured length
    /// is reported as a read error.
    pub fn copy_to<W: Write>(self, out: &mut CrcWriter<W>, chunk: &mut [u8]) -> Result<u64> {
        let Self {
            len,
            origin,
            reader,
        } = self;
        let mut reader = reader.take(len);
        let mut copied = 0u64;

        loop {
            let n = match reader.read(chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(MkfwError::read(&origin, e)),
            };
            out.write_tracked(&chunk[..n])?;
            copied += n as u64;
            debug!("copied {copied}/{len} bytes from {}", origin.display());
        }

        if copied != len {
            return Err(MkfwError::read(
                &origin,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("expected {len} bytes, file ended after {copied}"),
                ),
            ));
        }

        let mut rest = reader.into_inner();
        let mut extra = [0u8; 1];
        loop {
            match rest.read(&mut extra) {
                Ok(0) => break,
                Ok(_) => {
                    return Err(MkfwError::read(
                        &origin,
                        io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("file grew while copying, expected {len} bytes"),
                        ),
                    ));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(MkfwError::read(&origin, e)),
            }
        }

        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_bytes_payload() {
        let source = PayloadSource::from(vec![1u8, 2, 3]);
        let payload = source.open().unwrap();
        assert_eq!(payload.len(), 3);

        let mut out = CrcWriter::new(Vec::new());
        let mut chunk = [0u8; 2];
        assert_eq!(payload.copy_to(&mut out, &mut chunk).unwrap(), 3);
        assert_eq!(out.bytes_written(), 3);
        assert_eq!(source.describe(), "<3 bytes in memory>");
    }

    #[test]
    fn test_file_payload_streams_in_chunks() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let source = PayloadSource::from(file.path());
        let payload = source.open().unwrap();
        assert_eq!(payload.len(), data.len() as u64);

        let mut out = CrcWriter::new(Vec::new());
        let mut chunk = vec![0u8; 1024];
        payload.copy_to(&mut out, &mut chunk).unwrap();
        let (_, written) = out.finish().unwrap();
        assert_eq!(&written[..data.len()], data.as_slice());
    }

    #[test]
    fn test_missing_file() {
        let source = PayloadSource::File(PathBuf::from("/nonexistent/payload.bin"));
        assert!(matches!(source.open(), Err(MkfwError::Read { .. })));
    }

    #[test]
    fn test_short_source_is_read_error() {
        let payload = OpenPayload {
            len: 8,
            origin: PathBuf::from("short.bin"),
            reader: Box::new(&b"abc"[..]),
        };
        let mut out = CrcWriter::new(Vec::new());
        let mut chunk = [0u8; 4];
        let err = payload.copy_to(&mut out, &mut chunk).unwrap_err();
        assert!(matches!(err, MkfwError::Read { .. }));
    }

    #[test]
    fn test_long_source_is_read_error() {
        let payload = OpenPayload {
            len: 2,
            origin: PathBuf::from("long.bin"),
            reader: Box::new(&b"abcdef"[..]),
        };
        let mut out = CrcWriter::new(Vec::new());
        let mut chunk = [0u8; 4];
        let err = payload.copy_to(&mut out, &mut chunk).unwrap_err();
        assert!(matches!(err, MkfwError::Read { .. }));
        assert!(err.to_string().contains("file grew"));
        assert_eq!(out.bytes_written(), 2);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_file_larger_than_metadata_is_read_error() {
        // procfs reports a zero length but has content
        let source = PayloadSource::from(Path::new("/proc/self/status"));
        let payload = source.open().unwrap();
        assert_eq!(payload.len(), 0);

        let mut out = CrcWriter::new(Vec::new());
        let mut chunk = vec![0u8; COPY_CHUNK_SIZE];
        let err = payload.copy_to(&mut out, &mut chunk).unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::Read);
    }
}
