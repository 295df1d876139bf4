//! Conversion of decoded pixels to packed RGB565
//!
//! Every supported source layout is one [`PixelFormat`] variant. Each variant
//! turns pixel `x` of a source row into one 5-6-5 value; [`transcode`] walks
//! the rows and stores the values little-endian.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{ColorModel, DecodedImage};
use crate::error::{MkfwError, Result};
use crate::{TILE_HEIGHT, TILE_SIZE, TILE_WIDTH};

/// Four-level ramp used for 2-bit grayscale
pub const GRAY2_RAMP: [u16; 4] = [0x0000, 0x52AA, 0xAD55, 0xFFFF];

/// Source pixel layouts the tile can be produced from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
    Rgb16,
    Rgba16,
    Gray1,
    Gray2,
    Gray4,
    Gray8,
    GrayAlpha1,
    GrayAlpha2,
    GrayAlpha4,
    GrayAlpha8,
}

impl PixelFormat {
    /// Select the format for a color model and bit depth
    pub fn new(color: ColorModel, bit_depth: u8) -> Result<Self> {
        let format = match (color, bit_depth) {
            (ColorModel::Rgb, 8) => Self::Rgb8,
            (ColorModel::Rgba, 8) => Self::Rgba8,
            (ColorModel::Rgb, 16) => Self::Rgb16,
            (ColorModel::Rgba, 16) => Self::Rgba16,
            (ColorModel::Grayscale, 1) => Self::Gray1,
            (ColorModel::Grayscale, 2) => Self::Gray2,
            (ColorModel::Grayscale, 4) => Self::Gray4,
            (ColorModel::Grayscale, 8) => Self::Gray8,
            (ColorModel::GrayscaleAlpha, 1) => Self::GrayAlpha1,
            (ColorModel::GrayscaleAlpha, 2) => Self::GrayAlpha2,
            (ColorModel::GrayscaleAlpha, 4) => Self::GrayAlpha4,
            (ColorModel::GrayscaleAlpha, 8) => Self::GrayAlpha8,
            _ => {
                return Err(MkfwError::UnsupportedFormat {
                    color: color.to_string(),
                    bit_depth,
                });
            }
        };
        Ok(format)
    }

    /// Bits one source pixel occupies
    pub fn bits_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 => 24,
            Self::Rgba8 => 32,
            Self::Rgb16 => 48,
            Self::Rgba16 => 64,
            Self::Gray1 => 1,
            Self::Gray2 => 2,
            Self::Gray4 => 4,
            Self::Gray8 => 8,
            Self::GrayAlpha1 => 2,
            Self::GrayAlpha2 => 4,
            Self::GrayAlpha4 => 8,
            Self::GrayAlpha8 => 16,
        }
    }

    /// Minimum bytes in one source row of `width` pixels
    pub fn row_bytes(self, width: usize) -> usize {
        (width * self.bits_per_pixel()).div_ceil(8)
    }

    /// Convert pixel `x` of `row` to RGB565
    pub fn pixel(self, row: &[u8], x: usize) -> u16 {
        match self {
            Self::Rgb8 => {
                let p = &row[x * 3..x * 3 + 3];
                rgb8(p[0], p[1], p[2], u8::MAX)
            }
            Self::Rgba8 => {
                let p = &row[x * 4..x * 4 + 4];
                rgb8(p[0], p[1], p[2], p[3])
            }
            Self::Rgb16 => {
                let p = &row[x * 6..x * 6 + 6];
                rgb16(
                    BigEndian::read_u16(&p[0..2]),
                    BigEndian::read_u16(&p[2..4]),
                    BigEndian::read_u16(&p[4..6]),
                    u16::MAX,
                )
            }
            Self::Rgba16 => {
                let p = &row[x * 8..x * 8 + 8];
                rgb16(
                    BigEndian::read_u16(&p[0..2]),
                    BigEndian::read_u16(&p[2..4]),
                    BigEndian::read_u16(&p[4..6]),
                    BigEndian::read_u16(&p[6..8]),
                )
            }
            Self::Gray1 => {
                if sample(row, x, 1) != 0 {
                    0xFFFF
                } else {
                    0x0000
                }
            }
            Self::Gray2 => GRAY2_RAMP[sample(row, x, 2) as usize],
            Self::Gray4 => gray4(sample(row, x, 4)),
            // Reuses the 4-bit expansion on the full 8-bit sample. Existing
            // images depend on this output, keep it.
            Self::Gray8 => gray4(row[x]),
            Self::GrayAlpha1 => gray_alpha_threshold(row, x, 1),
            Self::GrayAlpha2 => gray_alpha_threshold(row, x, 2),
            Self::GrayAlpha4 => {
                let value = sample(row, 2 * x, 4);
                let alpha = sample(row, 2 * x + 1, 4);
                gray4(value * alpha / 15)
            }
            Self::GrayAlpha8 => {
                let value = u16::from(row[2 * x]);
                let alpha = u16::from(row[2 * x + 1]);
                let l = value * alpha / 255;
                pack(l >> 3, l >> 2, l >> 3)
            }
        }
    }
}

/// Pack 5-bit red, 6-bit green and 5-bit blue into one value
pub fn pack(r5: u16, g6: u16, b5: u16) -> u16 {
    ((r5 & 0x1F) << 11) | ((g6 & 0x3F) << 5) | (b5 & 0x1F)
}

fn rgb8(r: u8, g: u8, b: u8, a: u8) -> u16 {
    let scale = |c: u8| (u32::from(c) * u32::from(a) / 255) as u16;
    let (r, g, b) = (scale(r), scale(g), scale(b));
    let mut g6 = g >> 2;
    g6 |= g6 >> 5;
    pack(r >> 3, g6, b >> 3)
}

fn rgb16(r: u16, g: u16, b: u16, a: u16) -> u16 {
    let scale = |c: u16| (u32::from(c) * u32::from(a) / 65535) as u16;
    let (r, g, b) = (scale(r), scale(g), scale(b));
    let mut g6 = g >> 10;
    g6 |= g6 >> 5;
    pack(r >> 11, g6, b >> 11)
}

/// Bit-replicating expansion of a 4-bit gray level into 5-6-5
fn gray4(v: u8) -> u16 {
    let v = u16::from(v);
    let c5 = (v << 1) | (v >> 3);
    let g6 = (v << 2) | (v >> 2);
    pack(c5, g6, c5)
}

/// White only where both value and alpha reach half scale
fn gray_alpha_threshold(row: &[u8], x: usize, bits: u32) -> u16 {
    let half = 1 << (bits - 1);
    let value = sample(row, 2 * x, bits);
    let alpha = sample(row, 2 * x + 1, bits);
    if value >= half && alpha >= half {
        0xFFFF
    } else {
        0x0000
    }
}

/// Extract the `index`-th packed sample of `bits` width, most significant first
fn sample(row: &[u8], index: usize, bits: u32) -> u8 {
    let bit = index * bits as usize;
    let shift = 8 - bits - (bit % 8) as u32;
    let mask = ((1u16 << bits) - 1) as u8;
    (row[bit / 8] >> shift) & mask
}

/// Transcode a decoded image into the tile buffer
pub fn transcode(image: &DecodedImage, out: &mut [u8; TILE_SIZE]) -> Result<()> {
    if image.width != TILE_WIDTH || image.height != TILE_HEIGHT {
        return Err(MkfwError::InvalidDimensions {
            expected_width: TILE_WIDTH,
            expected_height: TILE_HEIGHT,
            width: image.width,
            height: image.height,
        });
    }

    let format = PixelFormat::new(image.color, image.bit_depth)?;
    debug!(
        "transcoding {}-bit {} tile as {:?}",
        image.bit_depth, image.color, format
    );

    let width = TILE_WIDTH as usize;
    let height = TILE_HEIGHT as usize;
    let row_bytes = format.row_bytes(width);
    let stride = image.stride;
    let required = stride
        .checked_mul(height - 1)
        .and_then(|n| n.checked_add(row_bytes));
    match required {
        Some(required) if stride >= row_bytes && image.data.len() >= required => {}
        _ => {
            return Err(MkfwError::TileSize {
                expected: stride.max(row_bytes).saturating_mul(height),
                actual: image.data.len() as u64,
            });
        }
    }

    for (y, out_row) in out.chunks_exact_mut(width * 2).enumerate() {
        let row = &image.data[y * stride..y * stride + row_bytes];
        for (x, out_pixel) in out_row.chunks_exact_mut(2).enumerate() {
            LittleEndian::write_u16(out_pixel, format.pixel(row, x));
        }
    }

    Ok(())
}
