//! # mkfw
//!
//! Assembles partitioned firmware images: a 24-byte header tag, a 40-byte
//! description, an 86x48 RGB565 tile and a list of partition records, closed
//! by a CRC32 of everything before it.
//!
//! ```text
//! offset  size   field
//! 0       24     header tag (zero padded)
//! 24      40     description (zero padded)
//! 64      8256   tile (86x48, RGB565 little-endian, row-major)
//! 8320    32+N   partition entry, actual length, payload (repeated)
//! end     4      CRC32 of all preceding bytes, little-endian
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use mkfw::{FirmwareBuilder, PartitionSpec, TileSource, TILE_SIZE};
//!
//! let report = FirmwareBuilder::new()
//!     .description("my firmware")
//!     .tile(TileSource::Raw(vec![0; TILE_SIZE]))
//!     .partition(PartitionSpec::new("app", "factory", "auto", "app", vec![0u8; 1024]))
//!     .build_to_file("firmware.fw")?;
//!
//! println!("checksum: {:#010x}", report.checksum);
//! # Ok::<(), mkfw::MkfwError>(())
//! ```

#[macro_use]
extern crate log;

pub mod builder;
pub mod cli;
pub mod config;
pub mod crc;
pub mod error;
pub mod header;
pub mod partition;
pub mod payload;
pub mod tile;

pub use builder::{AssemblyReport, FirmwareBuilder, PartitionSummary, assemble};
pub use crc::{CrcWriter, calculate_crc32};
pub use error::{ErrorCategory, MkfwError, Result};
pub use header::FirmwareHeader;
pub use partition::{LengthSpec, PartitionEntry, PartitionSpec, PartitionSubtype, PartitionType};
pub use payload::PayloadSource;
pub use tile::{ColorModel, DecodedImage, Tile, TileSource};

/// Current version of mkfw
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Size of the header tag
pub const HEADER_SIZE: usize = 24;

/// Size of the firmware description
pub const DESCRIPTION_SIZE: usize = 40;

/// Tile width in pixels
pub const TILE_WIDTH: u32 = 86;

/// Tile height in pixels
pub const TILE_HEIGHT: u32 = 48;

/// Tile size in bytes, 2 bytes per pixel
pub const TILE_SIZE: usize = (TILE_WIDTH * TILE_HEIGHT * 2) as usize;

/// Offset of the first partition record
pub const PARTITIONS_OFFSET: usize = HEADER_SIZE + DESCRIPTION_SIZE + TILE_SIZE;

/// Header tag used when none is given
pub const DEFAULT_HEADER: &str = "ODROIDGO_FIRMWARE_V00_01";

/// Output file name used when none is given
pub const DEFAULT_FIRMWARE_NAME: &str = "firmware.fw";
