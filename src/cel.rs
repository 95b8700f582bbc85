use serde::Serialize;

use crate::pixel::{Color, TRANSPARENT};
use crate::tileset::Tileset;
use crate::user_data::UserData;

/// A row-major RGBA image.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub pixels: Vec<Color>,
}

impl Image {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![TRANSPARENT; width as usize * height as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// The pixels as `[r, g, b, a, r, g, ...]`.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|c| [c.r, c.g, c.b, c.a])
            .collect()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub struct Tile {
    pub id: u32,
    pub x_flip: bool,
    pub y_flip: bool,
    pub diagonal_flip: bool,
}

/// A grid of tiles, sized in tiles.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Tilemap {
    pub width: u16,
    pub height: u16,
    pub tiles: Vec<Tile>,
}

impl Tilemap {
    pub fn tile(&self, column: u16, row: u16) -> Option<&Tile> {
        if column >= self.width || row >= self.height {
            return None;
        }
        self.tiles
            .get(row as usize * self.width as usize + column as usize)
    }

    /// Expands the grid into pixels using `tileset`.
    ///
    /// Flip flags are ignored. Tiles missing from the tileset stay transparent.
    pub fn render(&self, tileset: &Tileset) -> Image {
        let tile_w = tileset.tile_width as usize;
        let tile_h = tileset.tile_height as usize;
        let width = self.width as usize * tile_w;
        let mut image = Image::new(width as u32, (self.height as usize * tile_h) as u32);
        if image.pixels.is_empty() {
            return image;
        }
        for (i, tile) in self.tiles.iter().enumerate() {
            let Ok(pixels) = tileset.tile(i64::from(tile.id)) else {
                log::trace!("tile {} missing from tileset {}", tile.id, tileset.id);
                continue;
            };
            let left = (i % self.width as usize) * tile_w;
            let top = (i / self.width as usize) * tile_h;
            for (row, line) in pixels.chunks_exact(tile_w).enumerate() {
                let start = (top + row) * width + left;
                image.pixels[start..start + tile_w].copy_from_slice(line);
            }
        }
        image
    }
}

/// Where a linked cel's content lives.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct CelRef {
    pub frame: usize,
    /// Index into that frame's cels
    pub cel: usize,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub enum CelContent {
    Image(Image),
    Tilemap(Tilemap),
    Linked {
        /// Frame named in the file
        frame: usize,
        /// Always a non-linked cel
        target: CelRef,
    },
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Cel {
    pub layer: usize,
    pub x: i32,
    pub y: i32,
    pub opacity: u8,
    /// Stored but not used for ordering
    pub z_index: i16,
    pub content: CelContent,
    pub user_data: UserData,
}

impl Cel {
    pub fn is_linked(&self) -> bool {
        matches!(self.content, CelContent::Linked { .. })
    }
}
