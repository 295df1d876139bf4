//! CRC32 checksum calculation
//!
//! The firmware checksum is the standard CRC-32 (IEEE, reflected) of every
//! byte written before it. [`CrcWriter`] accumulates it while the image is
//! streamed so the output never has to be buffered as a whole.

use crate::error::{MkfwError, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use crc32fast::Hasher;
use std::io::{self, Write};

/// Calculate the CRC32 of a byte slice
pub fn calculate_crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Writer adapter that forwards bytes to a sink and folds them into a running CRC32
///
/// Only bytes the sink actually accepted are folded in, so a short or failed
/// write leaves the checksum consistent with what reached the output.
pub struct CrcWriter<W> {
    inner: W,
    hasher: Hasher,
    written: u64,
}

impl<W: Write> CrcWriter<W> {
    /// Wrap a sink, starting from an empty checksum
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
            written: 0,
        }
    }

    /// Write all bytes to the sink and update the checksum
    pub fn write_tracked(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes).map_err(MkfwError::Write)
    }

    /// Checksum of all bytes written so far
    pub fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Number of bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Append the checksum (little-endian, not itself checksummed) and flush
    ///
    /// Returns the checksum and the underlying sink.
    pub fn finish(mut self) -> Result<(u32, W)> {
        let checksum = self.checksum();
        self.inner
            .write_u32::<LittleEndian>(checksum)
            .map_err(MkfwError::Write)?;
        self.inner.flush().map_err(MkfwError::Write)?;
        Ok((checksum, self.inner))
    }
}

impl<W: Write> Write for CrcWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that accepts a fixed number of bytes and then fails
    struct LimitedSink {
        data: Vec<u8>,
        limit: usize,
    }

    impl Write for LimitedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.limit - self.data.len();
            if room == 0 {
                return Err(io::Error::new(io::ErrorKind::StorageFull, "sink full"));
            }
            let n = room.min(buf.len());
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_crc32_known_value() {
        assert_eq!(calculate_crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(calculate_crc32(b""), 0);
    }

    #[test]
    fn test_incremental_matches_whole() {
        let mut writer = CrcWriter::new(Vec::new());
        writer.write_tracked(b"1234").unwrap();
        writer.write_tracked(b"").unwrap();
        writer.write_tracked(b"56789").unwrap();

        assert_eq!(writer.checksum(), 0xCBF4_3926);
        assert_eq!(writer.bytes_written(), 9);
    }

    #[test]
    fn test_finish_appends_checksum() {
        let mut writer = CrcWriter::new(Vec::new());
        writer.write_tracked(b"firmware").unwrap();
        let (checksum, out) = writer.finish().unwrap();

        assert_eq!(out.len(), 12);
        assert_eq!(&out[8..], &checksum.to_le_bytes());
        assert_eq!(checksum, calculate_crc32(b"firmware"));
    }

    #[test]
    fn test_partial_write_only_tracks_accepted_bytes() {
        let sink = LimitedSink {
            data: Vec::new(),
            limit: 5,
        };
        let mut writer = CrcWriter::new(sink);
        let err = writer.write_tracked(b"0123456789").unwrap_err();

        assert!(matches!(err, MkfwError::Write(_)));
        assert_eq!(writer.bytes_written(), 5);
        assert_eq!(writer.checksum(), calculate_crc32(b"01234"));
    }
}
