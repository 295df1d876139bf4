//! Firmware image assembly
//!
//! [`assemble`] streams the whole image in one pass through a [`CrcWriter`]:
//! header, description, tile, every partition in order, then the checksum.
//! Any failure aborts the pass; nothing already written is rolled back.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::DEFAULT_HEADER;
use crate::crc::CrcWriter;
use crate::error::{MkfwError, Result};
use crate::header::FirmwareHeader;
use crate::partition::{PartitionEntry, PartitionSpec};
use crate::payload::COPY_CHUNK_SIZE;
use crate::tile::TileSource;

/// One written partition, as reported after assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSummary {
    pub index: usize,
    pub entry: PartitionEntry,
    /// File name or description of the payload
    pub source: String,
}

impl fmt::Display for PartitionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}, data={}", self.index, self.entry, self.source)
    }
}

/// Outcome of a successful assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReport {
    pub header: FirmwareHeader,
    pub tile_bytes: usize,
    pub partitions: Vec<PartitionSummary>,
    /// CRC32 stored at the end of the image
    pub checksum: u32,
    /// Total image size including the checksum
    pub total_size: u64,
}

/// Write a complete firmware image to `sink`
///
/// Partitions are validated one at a time, right before they are written,
/// so a bad partition fails before any of its bytes reach the sink. Errors
/// raised for a partition carry its index.
pub fn assemble<W: Write>(
    header: &str,
    description: &str,
    tile: &TileSource,
    partitions: &[PartitionSpec],
    sink: W,
) -> Result<AssemblyReport> {
    let fields = FirmwareHeader::new(header, description);
    let mut out = CrcWriter::new(sink);

    out.write_tracked(fields.tag())?;
    info!("Header: '{}'", fields.tag_str());

    out.write_tracked(fields.description())?;
    info!("Firmware Description: '{}'", fields.description_str());

    let tile = tile.resolve()?;
    out.write_tracked(tile.as_bytes())?;
    info!("Tile: wrote {} bytes", tile.as_bytes().len());

    let mut chunk = vec![0u8; COPY_CHUNK_SIZE];
    let mut summaries = Vec::with_capacity(partitions.len());
    for (index, spec) in partitions.iter().enumerate() {
        let entry = write_partition(&mut out, spec, &mut chunk)
            .map_err(|err| err.in_partition(index))?;
        let summary = PartitionSummary {
            index,
            entry,
            source: spec.payload.describe(),
        };
        info!("{}", summary);
        summaries.push(summary);
    }

    let total_size = out.bytes_written() + 4;
    let (checksum, _) = out.finish()?;
    info!("checksum: {:#010x}", checksum);

    Ok(AssemblyReport {
        header: fields,
        tile_bytes: tile.as_bytes().len(),
        partitions: summaries,
        checksum,
        total_size,
    })
}

fn write_partition<W: Write>(
    out: &mut CrcWriter<W>,
    spec: &PartitionSpec,
    chunk: &mut [u8],
) -> Result<PartitionEntry> {
    let def = spec.resolve()?;
    let payload = spec.payload.open()?;
    let entry = def.finalize(payload.len())?;

    out.write_tracked(&entry.encode())?;
    payload.copy_to(out, chunk)?;

    Ok(entry)
}

/// Builder for firmware images
///
/// Collects the header, description, tile and partitions, then writes the
/// image with [`assemble`].
#[derive(Debug, Clone)]
pub struct FirmwareBuilder {
    header: String,
    description: String,
    tile: Option<TileSource>,
    partitions: Vec<PartitionSpec>,
}

impl FirmwareBuilder {
    /// Create a builder with the default header and an empty description
    pub fn new() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            description: String::new(),
            tile: None,
            partitions: Vec::new(),
        }
    }

    /// Set the header tag, truncated to 24 bytes when written
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Set the description, truncated to 40 bytes when written
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the tile source
    pub fn tile(mut self, tile: TileSource) -> Self {
        self.tile = Some(tile);
        self
    }

    /// Load the tile from a raw or PNG file
    pub fn tile_from_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let tile = TileSource::from_file(path)?;
        Ok(self.tile(tile))
    }

    /// Append a partition
    pub fn partition(mut self, partition: PartitionSpec) -> Self {
        self.partitions.push(partition);
        self
    }

    /// Append several partitions, keeping their order
    pub fn partitions(mut self, partitions: impl IntoIterator<Item = PartitionSpec>) -> Self {
        self.partitions.extend(partitions);
        self
    }

    /// Partitions added so far
    pub fn get_partitions(&self) -> &[PartitionSpec] {
        &self.partitions
    }

    /// Build the image and write it to a writer
    pub fn build_to_writer<W: Write>(&self, writer: W) -> Result<AssemblyReport> {
        let tile = self
            .tile
            .as_ref()
            .ok_or_else(|| MkfwError::MissingArgument("tile".into()))?;
        assemble(
            &self.header,
            &self.description,
            tile,
            &self.partitions,
            writer,
        )
    }

    /// Build the complete image in memory
    pub fn build(&self) -> Result<(Vec<u8>, AssemblyReport)> {
        let mut image = Vec::new();
        let report = self.build_to_writer(&mut image)?;
        Ok((image, report))
    }

    /// Build the image and write it to a file
    ///
    /// A partially written file is removed when assembly fails.
    pub fn build_to_file<P: AsRef<Path>>(&self, path: P) -> Result<AssemblyReport> {
        let path = path.as_ref();
        let file = File::create(path).map_err(MkfwError::Write)?;

        let result = self.build_to_writer(BufWriter::new(file));
        if result.is_err() {
            if let Err(e) = fs::remove_file(path) {
                warn!("could not remove partial firmware {}: {}", path.display(), e);
            }
        }
        result
    }
}

impl Default for FirmwareBuilder {
    fn default() -> Self {
        Self::new()
    }
}
