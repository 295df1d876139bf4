//! TOML firmware manifest
//!
//! ```toml
//! header = "ODROIDGO_FIRMWARE_V00_01"
//! description = "My firmware"
//! tile = "tile.png"
//! output = "firmware.fw"
//!
//! [[partition]]
//! type = "app"
//! subtype = "factory"
//! length = "auto"
//! label = "app"
//! file = "build/app.bin"
//! ```
//!
//! `type`, `subtype` and `length` also accept plain integers. Relative paths
//! are resolved against the manifest's directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MkfwError, Result};
use crate::partition::PartitionSpec;

/// A literal that may be written as a string or an integer
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Literal {
    Text(String),
    Number(u64),
}

impl Literal {
    /// The literal as it would be written on the command line
    pub fn to_arg(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(value) => value.to_string(),
        }
    }
}

fn auto_length() -> Literal {
    Literal::Text("auto".into())
}

/// One `[[partition]]` table
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PartitionConfig {
    #[serde(rename = "type")]
    pub type_: Literal,
    pub subtype: Literal,
    #[serde(default = "auto_length")]
    pub length: Literal,
    #[serde(default)]
    pub label: String,
    pub file: PathBuf,
}

/// Firmware manifest
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub header: Option<String>,
    pub description: Option<String>,
    pub tile: Option<PathBuf>,
    pub output: Option<PathBuf>,
    #[serde(default, rename = "partition")]
    pub partitions: Vec<PartitionConfig>,
}

impl Manifest {
    /// Parse a manifest from TOML text, leaving paths untouched
    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load a manifest and resolve its relative paths
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| MkfwError::read(path, e))?;
        let mut manifest = Self::parse(&text).map_err(|source| MkfwError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(base) = path.parent() {
            manifest.rebase(base);
        }
        debug!(
            "loaded manifest {} with {} partitions",
            path.display(),
            manifest.partitions.len()
        );
        Ok(manifest)
    }

    /// Resolve relative paths against `base`
    pub fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.tile.iter_mut().chain(self.output.iter_mut()).for_each(join);
        self.partitions.iter_mut().for_each(|part| join(&mut part.file));
    }

    /// Partition specs in manifest order
    pub fn partition_specs(&self) -> Vec<PartitionSpec> {
        self.partitions
            .iter()
            .map(|part| {
                PartitionSpec::new(
                    part.type_.to_arg(),
                    part.subtype.to_arg(),
                    part.length.to_arg(),
                    part.label.clone(),
                    part.file.clone(),
                )
            })
            .collect()
    }
}
