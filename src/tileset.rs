use serde::Serialize;

use crate::ase_file::{ExternalTileset, TilesetFlags};
use crate::error::{Error, Result};
use crate::pixel::Color;
use crate::user_data::UserData;

/// Tiles of one size stored as a vertical strip, tile 0 at the top.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Tileset {
    pub id: u32,
    pub flags: TilesetFlags,
    pub name: String,
    pub tile_count: u32,
    pub tile_width: u16,
    pub tile_height: u16,
    /// Index shown to the user for tile 1
    pub base_index: i16,
    pub external: Option<ExternalTileset>,
    #[serde(skip)]
    pub pixels: Vec<Color>,
    pub user_data: UserData,
    /// Per tile, filled by the user data chunks following the tileset's own
    pub tile_user_data: Vec<UserData>,
}

impl Tileset {
    pub fn tile_area(&self) -> usize {
        self.tile_width as usize * self.tile_height as usize
    }

    pub fn has_embedded_tiles(&self) -> bool {
        self.flags.contains(TilesetFlags::EMBEDDED)
    }

    /// Pixels of tile `index`, row major.
    pub fn tile(&self, index: i64) -> Result<&[Color]> {
        let out_of_range = || Error::range("tile", index, self.tile_count as usize);
        let i = usize::try_from(index).map_err(|_| out_of_range())?;
        if i >= self.tile_count as usize {
            return Err(out_of_range());
        }
        let area = self.tile_area();
        self.pixels
            .get(i * area..(i + 1) * area)
            .ok_or_else(out_of_range)
    }
}
