//! Tile icon embedded after the description
//!
//! The tile is an 86x48 RGB565 raster. It is either supplied as a raw
//! little-endian buffer or decoded from a PNG and transcoded.

pub mod transcode;

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;

use crate::error::{MkfwError, Result};
use crate::{TILE_HEIGHT, TILE_SIZE, TILE_WIDTH};

pub use transcode::{PixelFormat, transcode};

/// PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Color model of a decoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorModel {
    Grayscale,
    GrayscaleAlpha,
    Rgb,
    Rgba,
    Indexed,
}

impl ColorModel {
    /// Samples per pixel
    pub fn channels(self) -> usize {
        match self {
            Self::Grayscale | Self::Indexed => 1,
            Self::GrayscaleAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

impl From<png::ColorType> for ColorModel {
    fn from(color: png::ColorType) -> Self {
        match color {
            png::ColorType::Grayscale => Self::Grayscale,
            png::ColorType::GrayscaleAlpha => Self::GrayscaleAlpha,
            png::ColorType::Rgb => Self::Rgb,
            png::ColorType::Rgba => Self::Rgba,
            png::ColorType::Indexed => Self::Indexed,
        }
    }
}

impl fmt::Display for ColorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Grayscale => "grayscale",
            Self::GrayscaleAlpha => "grayscale+alpha",
            Self::Rgb => "rgb",
            Self::Rgba => "rgba",
            Self::Indexed => "indexed",
        };
        write!(f, "{}", name)
    }
}

/// Decoded pixel buffer as produced by the PNG decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Bits per sample
    pub bit_depth: u8,
    pub color: ColorModel,
    /// Bytes from the start of one row to the next
    pub stride: usize,
    /// Rows of packed samples, most significant bits first
    pub data: Vec<u8>,
}

impl DecodedImage {
    /// Create an image with tightly packed, byte-aligned rows
    pub fn new(width: u32, height: u32, bit_depth: u8, color: ColorModel, data: Vec<u8>) -> Self {
        let bits = width as usize * color.channels() * bit_depth as usize;
        Self {
            width,
            height,
            bit_depth,
            color,
            stride: bits.div_ceil(8),
            data,
        }
    }

    /// Decode a PNG stream without expanding its samples
    pub fn decode_png<R: Read>(reader: R) -> Result<Self> {
        let mut decoder = png::Decoder::new(reader);
        decoder.set_transformations(png::Transformations::IDENTITY);
        let mut reader = decoder.read_info()?;

        let mut data = vec![0u8; reader.output_buffer_size()];
        let info = reader.next_frame(&mut data)?;
        data.truncate(info.buffer_size());

        Ok(Self {
            width: info.width,
            height: info.height,
            bit_depth: info.bit_depth as u8,
            color: info.color_type.into(),
            stride: info.line_size,
            data,
        })
    }
}

/// Where the tile comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileSource {
    /// Raw RGB565 little-endian pixels, used verbatim
    Raw(Vec<u8>),
    /// Decoded image, transcoded to RGB565
    Image(DecodedImage),
}

impl TileSource {
    /// Load a tile file, decoding it if it starts with the PNG signature
    ///
    /// Raw files are read up to one byte past [`TILE_SIZE`], so an oversized
    /// file is rejected without loading it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let read_err = |e: io::Error| MkfwError::read(path, e);
        let mut file = File::open(path).map_err(read_err)?;

        let mut signature = Vec::with_capacity(PNG_SIGNATURE.len());
        (&mut file)
            .take(PNG_SIGNATURE.len() as u64)
            .read_to_end(&mut signature)
            .map_err(read_err)?;
        file.rewind().map_err(read_err)?;

        if signature == PNG_SIGNATURE {
            let image = DecodedImage::decode_png(BufReader::new(file))?;
            return Ok(Self::Image(image));
        }

        let mut bytes = Vec::with_capacity(TILE_SIZE + 1);
        (&mut file)
            .take(TILE_SIZE as u64 + 1)
            .read_to_end(&mut bytes)
            .map_err(read_err)?;
        if bytes.len() > TILE_SIZE {
            let actual = file.metadata().map_or(bytes.len() as u64, |m| m.len());
            return Err(MkfwError::TileSize {
                expected: TILE_SIZE,
                actual,
            });
        }
        Ok(Self::Raw(bytes))
    }

    /// Classify an in-memory tile file by content
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.starts_with(&PNG_SIGNATURE) {
            Ok(Self::Image(DecodedImage::decode_png(bytes.as_slice())?))
        } else {
            Ok(Self::Raw(bytes))
        }
    }

    /// Produce the fixed-size tile buffer
    pub fn resolve(&self) -> Result<Tile> {
        match self {
            Self::Raw(bytes) => Tile::from_raw(bytes),
            Self::Image(image) => Tile::from_image(image),
        }
    }
}

/// RGB565 tile, exactly [`TILE_SIZE`] bytes
#[derive(Clone, PartialEq, Eq)]
pub struct Tile(Box<[u8; TILE_SIZE]>);

impl Tile {
    /// Use a raw buffer that must be exactly [`TILE_SIZE`] bytes
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        let pixels: [u8; TILE_SIZE] = bytes.try_into().map_err(|_| MkfwError::TileSize {
            expected: TILE_SIZE,
            actual: bytes.len() as u64,
        })?;
        Ok(Self(Box::new(pixels)))
    }

    /// Transcode a decoded image
    pub fn from_image(image: &DecodedImage) -> Result<Self> {
        let mut pixels = Box::new([0u8; TILE_SIZE]);
        transcode(image, &mut pixels)?;
        Ok(Self(pixels))
    }

    /// Tile bytes as written to the image
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// RGB565 value at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<u16> {
        if x >= TILE_WIDTH || y >= TILE_HEIGHT {
            return None;
        }
        let offset = ((y * TILE_WIDTH + x) * 2) as usize;
        Some(u16::from_le_bytes([self.0[offset], self.0[offset + 1]]))
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tile({}x{} rgb565)", TILE_WIDTH, TILE_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(
        width: u32,
        height: u32,
        color: png::ColorType,
        depth: png::BitDepth,
        data: &[u8],
    ) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(color);
            encoder.set_depth(depth);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        out
    }

    #[test]
    fn test_raw_tile_size() {
        assert!(Tile::from_raw(&[0u8; TILE_SIZE]).is_ok());

        let err = Tile::from_raw(&[0u8; TILE_SIZE - 1]).unwrap_err();
        assert!(matches!(
            err,
            MkfwError::TileSize {
                expected: TILE_SIZE,
                actual: 8255
            }
        ));
        assert!(Tile::from_raw(&[0u8; TILE_SIZE + 1]).is_err());
    }

    #[test]
    fn test_raw_tile_pixel_lookup() {
        let mut raw = vec![0u8; TILE_SIZE];
        raw[2] = 0x1F;
        let tile = Tile::from_raw(&raw).unwrap();
        assert_eq!(tile.pixel(1, 0), Some(0x001F));
        assert_eq!(tile.pixel(0, 0), Some(0x0000));
        assert_eq!(tile.pixel(TILE_WIDTH, 0), None);
    }

    #[test]
    fn test_non_png_bytes_are_raw() {
        let source = TileSource::from_bytes(vec![0u8; TILE_SIZE]).unwrap();
        assert!(matches!(source, TileSource::Raw(_)));
        assert_eq!(source.resolve().unwrap().as_bytes(), &[0u8; TILE_SIZE][..]);
    }

    #[test]
    fn test_oversized_raw_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("one_over.raw");
        std::fs::write(&path, vec![0u8; TILE_SIZE + 1]).unwrap();
        let err = TileSource::from_file(&path).unwrap_err();
        assert!(matches!(err, MkfwError::TileSize { actual: 8257, .. }));

        let path = dir.path().join("huge.raw");
        std::fs::write(&path, vec![0u8; 1 << 20]).unwrap();
        let err = TileSource::from_file(&path).unwrap_err();
        assert!(matches!(err, MkfwError::TileSize { actual: 1048576, .. }));
    }

    #[test]
    fn test_raw_file_of_tile_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.raw");
        std::fs::write(&path, vec![0x12u8; TILE_SIZE]).unwrap();

        let source = TileSource::from_file(&path).unwrap();
        assert_eq!(source, TileSource::Raw(vec![0x12; TILE_SIZE]));
    }

    #[test]
    fn test_png_file_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        let pixels = [0u8; (TILE_WIDTH * TILE_HEIGHT) as usize];
        let png = encode_png(
            TILE_WIDTH,
            TILE_HEIGHT,
            png::ColorType::Grayscale,
            png::BitDepth::Eight,
            &pixels,
        );
        std::fs::write(&path, png).unwrap();

        let source = TileSource::from_file(&path).unwrap();
        assert!(matches!(source, TileSource::Image(_)));
    }

    #[test]
    fn test_png_tile_is_decoded_and_transcoded() {
        let pixels = [0u8, 0, 255].repeat((TILE_WIDTH * TILE_HEIGHT) as usize);
        let png = encode_png(
            TILE_WIDTH,
            TILE_HEIGHT,
            png::ColorType::Rgb,
            png::BitDepth::Eight,
            &pixels,
        );

        let source = TileSource::from_bytes(png).unwrap();
        let TileSource::Image(image) = &source else {
            panic!("expected a decoded image");
        };
        assert_eq!(image.color, ColorModel::Rgb);
        assert_eq!(image.bit_depth, 8);

        let tile = source.resolve().unwrap();
        assert_eq!(tile.pixel(0, 0), Some(0x001F));
        assert_eq!(tile.pixel(85, 47), Some(0x001F));
    }

    #[test]
    fn test_png_gray1_keeps_packed_samples() {
        // 11 bytes per row, alternating white/black pixels
        let row = [0b1010_1010u8; 11];
        let png = encode_png(
            TILE_WIDTH,
            TILE_HEIGHT,
            png::ColorType::Grayscale,
            png::BitDepth::One,
            &row.repeat(TILE_HEIGHT as usize),
        );

        let tile = TileSource::from_bytes(png).unwrap().resolve().unwrap();
        assert_eq!(tile.pixel(0, 10), Some(0xFFFF));
        assert_eq!(tile.pixel(1, 10), Some(0x0000));
    }

    #[test]
    fn test_png_wrong_dimensions() {
        let png = encode_png(8, 8, png::ColorType::Grayscale, png::BitDepth::Eight, &[0u8; 64]);
        let err = TileSource::from_bytes(png).unwrap().resolve().unwrap_err();
        assert!(matches!(
            err,
            MkfwError::InvalidDimensions {
                width: 8,
                height: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_corrupt_png_is_decode_error() {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(b"garbage");
        assert!(matches!(
            TileSource::from_bytes(bytes),
            Err(MkfwError::Decode(_))
        ));
    }
}
