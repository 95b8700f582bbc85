use serde::Serialize;

use crate::ase_file::{OldPaletteChunk, PaletteChunk};
use crate::error::{Error, FormatErrorKind, Result};
use crate::pixel::Color;

/// The sprite palette. Only grows as palette chunks are applied.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct Palette {
    colors: Vec<Color>,
    names: Vec<Option<String>>,
    transparent_index: u8,
}

impl Palette {
    pub fn from_colors(colors: Vec<Color>, transparent_index: u8) -> Self {
        Self {
            names: vec![None; colors.len()],
            colors,
            transparent_index,
        }
    }

    pub(crate) fn with_transparent_index(transparent_index: u8) -> Self {
        Self {
            transparent_index,
            ..Self::default()
        }
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Only meaningful for indexed sprites.
    pub fn transparent_index(&self) -> u8 {
        self.transparent_index
    }

    pub fn color(&self, index: usize) -> Result<Color> {
        self.colors
            .get(index)
            .copied()
            .ok_or_else(|| Error::range("palette", index as i64, self.colors.len()))
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).and_then(|n| n.as_deref())
    }

    fn grow(&mut self, len: usize) {
        if len > self.colors.len() {
            self.colors.resize(len, Color::new(0, 0, 0, 255));
            self.names.resize(len, None);
        }
    }

    pub(crate) fn apply(&mut self, chunk: &PaletteChunk) -> std::result::Result<(), FormatErrorKind> {
        if chunk.last < chunk.first || chunk.last >= 0x1_0000 {
            return Err(FormatErrorKind::PaletteRange {
                first: chunk.first,
                last: chunk.last,
            });
        }
        self.grow((chunk.new_size as usize).min(0x1_0000));
        self.grow(chunk.last as usize + 1);
        for (i, entry) in chunk.entries.iter().enumerate() {
            let index = chunk.first as usize + i;
            let [r, g, b, a] = entry.rgba;
            self.colors[index] = Color::new(r, g, b, a);
            self.names[index] = entry.name.clone();
        }
        Ok(())
    }

    pub(crate) fn apply_old(&mut self, chunk: &OldPaletteChunk<'_>) {
        let mut index = 0;
        for packet in &chunk.packets {
            index += packet.num_skip as usize;
            let colors = packet.colors;
            self.grow(index + colors.len() / 3);
            for rgb in colors.chunks_exact(3) {
                self.colors[index] = Color::new(rgb[0], rgb[1], rgb[2], 255);
                index += 1;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ase_file::{OldPalettePacket, PaletteEntry};

    fn entry(rgba: [u8; 4]) -> PaletteEntry {
        PaletteEntry {
            flags: 0,
            rgba,
            name: None,
        }
    }

    #[test]
    fn new_palette_only_grows() {
        let mut palette = Palette::default();
        palette
            .apply(&PaletteChunk {
                new_size: 4,
                first: 0,
                last: 1,
                entries: vec![entry([1, 1, 1, 10]), entry([2, 2, 2, 20])],
            })
            .unwrap();
        assert_eq!(palette.len(), 4);
        assert_eq!(palette.color(1).unwrap(), Color::new(2, 2, 2, 20));

        palette
            .apply(&PaletteChunk {
                new_size: 2,
                first: 1,
                last: 1,
                entries: vec![entry([9, 9, 9, 90])],
            })
            .unwrap();
        assert_eq!(palette.len(), 4);
        assert_eq!(palette.color(0).unwrap(), Color::new(1, 1, 1, 10));
        assert_eq!(palette.color(1).unwrap(), Color::new(9, 9, 9, 90));
        assert!(matches!(
            palette.color(4),
            Err(Error::Range { index: 4, len: 4, .. })
        ));
    }

    #[test]
    fn old_palette_skips_and_is_opaque() {
        let colors = [1, 2, 3, 4, 5, 6];
        let chunk = OldPaletteChunk {
            packets: vec![OldPalettePacket {
                num_skip: 2,
                colors: &colors,
            }],
        };
        let mut palette = Palette::default();
        palette.apply_old(&chunk);
        assert_eq!(palette.len(), 4);
        assert_eq!(palette.color(2).unwrap(), Color::new(1, 2, 3, 255));
        assert_eq!(palette.color(3).unwrap(), Color::new(4, 5, 6, 255));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut palette = Palette::default();
        let err = palette
            .apply(&PaletteChunk {
                new_size: 0,
                first: 3,
                last: 1,
                entries: vec![],
            })
            .unwrap_err();
        assert!(matches!(
            err,
            FormatErrorKind::PaletteRange { first: 3, last: 1 }
        ));
    }
}
