use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;
use serde::Serialize;

use crate::error::FormatErrorKind;
use crate::palette::Palette;

pub type Color = rgb::RGBA8;

pub const TRANSPARENT: Color = Color {
    r: 0,
    g: 0,
    b: 0,
    a: 0,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum ColorDepth {
    Rgba,
    Grayscale,
    Indexed,
}

impl ColorDepth {
    pub fn from_bits(bits: u16) -> Result<Self, FormatErrorKind> {
        match bits {
            32 => Ok(ColorDepth::Rgba),
            16 => Ok(ColorDepth::Grayscale),
            8 => Ok(ColorDepth::Indexed),
            other => Err(FormatErrorKind::ColorDepth(other)),
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ColorDepth::Rgba => 4,
            ColorDepth::Grayscale => 2,
            ColorDepth::Indexed => 1,
        }
    }
}

/// Inflates a zlib stream that must produce exactly `expected` bytes.
pub(crate) fn inflate(data: &[u8], expected: usize) -> Result<Vec<u8>, FormatErrorKind> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .take(expected as u64 + 1)
        .read_to_end(&mut out)
        .map_err(FormatErrorKind::Decompress)?;
    if out.len() != expected {
        return Err(FormatErrorKind::DecompressedSize {
            expected,
            found: out.len(),
        });
    }
    Ok(out)
}

/// How to turn stored pixel bytes into colors.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PixelFormat<'a> {
    pub depth: ColorDepth,
    pub palette: &'a Palette,
    /// Background layers draw the transparent index with its palette color.
    pub opaque_index: bool,
}

impl PixelFormat<'_> {
    /// Converts `raw` to RGBA. `raw` must hold whole pixels.
    pub fn decode(&self, raw: &[u8]) -> Result<Vec<Color>, FormatErrorKind> {
        match self.depth {
            ColorDepth::Rgba => Ok(bytemuck::cast_slice::<u8, [u8; 4]>(raw)
                .iter()
                .map(|&[r, g, b, a]| Color::new(r, g, b, a))
                .collect()),
            ColorDepth::Grayscale => Ok(bytemuck::cast_slice::<u8, [u8; 2]>(raw)
                .iter()
                .map(|&[v, a]| Color::new(v, v, v, a))
                .collect()),
            ColorDepth::Indexed => raw
                .iter()
                .map(|&index| {
                    if index == self.palette.transparent_index() && !self.opaque_index {
                        return Ok(TRANSPARENT);
                    }
                    self.palette
                        .colors()
                        .get(index as usize)
                        .copied()
                        .ok_or(FormatErrorKind::PaletteIndex {
                            index: index as usize,
                            len: self.palette.len(),
                        })
                })
                .collect(),
        }
    }
}

pub(crate) fn bytes_per_tile(bits_per_tile: u16) -> Result<usize, FormatErrorKind> {
    match bits_per_tile {
        8 => Ok(1),
        16 => Ok(2),
        32 => Ok(4),
        other => Err(FormatErrorKind::BitsPerTile(other)),
    }
}

/// Reads `count` little-endian tile values of `bits_per_tile` bits each.
pub(crate) fn decode_tile_values(
    raw: &[u8],
    bits_per_tile: u16,
    count: usize,
) -> Result<Vec<u32>, FormatErrorKind> {
    let bytes_per_tile = bytes_per_tile(bits_per_tile)?;
    if raw.len() != count * bytes_per_tile {
        return Err(FormatErrorKind::DecompressedSize {
            expected: count * bytes_per_tile,
            found: raw.len(),
        });
    }
    Ok(raw
        .chunks_exact(bytes_per_tile)
        .map(|b| match bytes_per_tile {
            1 => u32::from(b[0]),
            2 => u32::from(LittleEndian::read_u16(b)),
            _ => LittleEndian::read_u32(b),
        })
        .collect())
}
