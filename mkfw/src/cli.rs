//! Command line interface for mkfw

use std::path::PathBuf;

use byte_unit::Byte;
use clap::Parser;
use colored::Colorize;

use crate::builder::{AssemblyReport, FirmwareBuilder};
use crate::config::Manifest;
use crate::error::{MkfwError, Result};
use crate::partition::PartitionSpec;
use crate::tile::TileSource;
use crate::{DEFAULT_FIRMWARE_NAME, DEFAULT_HEADER, VERSION};

const PARTITION_HELP: &str = "\
Partitions are given as tuples of 5 parameters: type subtype length label binary

  type      app (0), data (1) or a custom type in the range 0x40 - 0xff;
            types 0x02 - 0x3f are reserved
  subtype   app partitions:    factory (0x00), ota_0 (0x10) ... ota_15 (0x1f)
            data partitions:   ota (0), phy (1), nvs (2)
            custom partitions: any number between 0x00 and 0xff
  length    auto, or a decimal/0x-prefixed hex number with an optional
            k/K (1024) or m/M (1024 * 1024) suffix; must be a multiple of 64K
  label     partition label, truncated to 16 bytes
  binary    file that contains the partition data

Numbers are decimal or hexadecimal starting with 0x/0X.

Exit status:
   0   no error occurred
  -1   invalid argument(s)
  -2   error reading from a file
  -3   error writing to the output file";

/// Command line arguments for mkfw
#[derive(Parser, Debug)]
#[command(name = "mkfw")]
#[command(version = VERSION)]
#[command(about = "Assemble a partitioned firmware image", long_about = None)]
#[command(after_help = PARTITION_HELP)]
pub struct Args {
    /// Use the specified header instead of the default one (truncated to 24 bytes)
    #[arg(short = 'H', long)]
    pub header: Option<String>,

    /// Output firmware file [default: firmware.fw]
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Quiet operation, only report errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Read settings and partitions from a TOML manifest
    #[arg(short, long, value_name = "MANIFEST")]
    pub config: Option<PathBuf>,

    /// Firmware description (truncated to 40 bytes)
    pub description: Option<String>,

    /// 86x48 tile: raw RGB565 pixmap (8256 bytes) or PNG image
    pub tile: Option<PathBuf>,

    /// Partition tuples: type subtype length label binary
    #[arg(value_name = "PARTITION", trailing_var_arg = true, allow_hyphen_values = true)]
    pub partitions: Vec<String>,
}

/// Group flat partition arguments into 5-tuples
pub fn parse_partition_args(args: &[String]) -> Result<Vec<PartitionSpec>> {
    const FIELDS: [&str; 5] = ["type", "subtype", "size", "label", "file name"];

    args.chunks(FIELDS.len())
        .enumerate()
        .map(|(index, tuple)| match tuple {
            [type_, subtype, length, label, file] => Ok(PartitionSpec::new(
                type_.as_str(),
                subtype.as_str(),
                length.as_str(),
                label.as_str(),
                PathBuf::from(file),
            )),
            partial => Err(MkfwError::MissingArgument(format!(
                "partition {} {}",
                index,
                FIELDS[partial.len()]
            ))),
        })
        .collect()
}

/// Main CLI handler
pub fn run_cli(args: Args) -> Result<()> {
    let manifest = match &args.config {
        Some(path) => Manifest::from_file(path)?,
        None => Manifest::default(),
    };

    let mut partitions = manifest.partition_specs();
    partitions.extend(parse_partition_args(&args.partitions)?);

    let description = args
        .description
        .or(manifest.description)
        .ok_or_else(|| MkfwError::MissingArgument("firmware description".into()))?;
    let tile_path = args
        .tile
        .or(manifest.tile)
        .ok_or_else(|| MkfwError::MissingArgument("tile file".into()))?;
    let header = args
        .header
        .or(manifest.header)
        .unwrap_or_else(|| DEFAULT_HEADER.to_string());
    let output = args
        .out
        .or(manifest.output)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FIRMWARE_NAME));

    let tile = TileSource::from_file(&tile_path)?;
    if let TileSource::Image(image) = &tile {
        debug!(
            "decoded PNG tile {}: {}x{} {} {}-bit",
            tile_path.display(),
            image.width,
            image.height,
            image.color,
            image.bit_depth
        );
    }

    let report = FirmwareBuilder::new()
        .header(header)
        .description(description)
        .tile(tile)
        .partitions(partitions)
        .build_to_file(&output)?;

    if !args.quiet {
        print_report(&report, &output);
    }

    Ok(())
}

fn print_report(report: &AssemblyReport, output: &std::path::Path) {
    println!("Header: '{}'", report.header.tag_str());
    println!("Firmware Description: '{}'", report.header.description_str());
    println!("Tile: wrote {} bytes.", report.tile_bytes);
    for partition in &report.partitions {
        println!("{}", partition);
    }
    println!("checksum: {:#010x}", report.checksum);
    println!(
        "{}",
        format!(
            "firmware written to {}: {:#}",
            output.display(),
            Byte::from_u64(report.total_size)
        )
        .green()
    );
}
