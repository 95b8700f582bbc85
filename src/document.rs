use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::ase_file::{FileHeader, HeaderFlags};
use crate::cel::{Cel, CelContent, Image};
use crate::error::{Error, FormatErrorKind, Result};
use crate::flatten::{flatten, FlattenOptions};
use crate::layer::Layer;
use crate::palette::Palette;
use crate::pixel::ColorDepth;
use crate::slice::Slice;
use crate::tag::Tag;
use crate::tileset::Tileset;
use crate::user_data::UserData;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct Grid {
    pub x: i16,
    pub y: i16,
    /// 0 if there is no grid
    pub width: u16,
    pub height: u16,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Header {
    pub width: u16,
    pub height: u16,
    pub num_frames: u16,
    pub color_depth: ColorDepth,
    pub flags: HeaderFlags,
    pub transparent_index: u8,
    pub num_colors: u16,
    /// Pixel width:height, 1:1 when the file leaves it unset
    pub pixel_ratio: (u8, u8),
    pub grid: Grid,
}

impl Header {
    pub(crate) fn from_raw(raw: &FileHeader) -> std::result::Result<Self, FormatErrorKind> {
        let pixel_ratio = if raw.pix_width == 0 || raw.pix_height == 0 {
            (1, 1)
        } else {
            (raw.pix_width, raw.pix_height)
        };
        Ok(Self {
            width: raw.width,
            height: raw.height,
            num_frames: raw.num_frames,
            color_depth: ColorDepth::from_bits(raw.color_depth)?,
            flags: HeaderFlags::from_bits_retain(raw.flags),
            transparent_index: raw.transparent_index,
            num_colors: if raw.color_num == 0 { 256 } else { raw.color_num },
            pixel_ratio,
            grid: Grid {
                x: raw.grid_x_pos,
                y: raw.grid_y_pos,
                width: raw.grid_width,
                height: raw.grid_height,
            },
        })
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Frame {
    pub duration_ms: u16,
    /// In file order, which is the order they are composited in
    pub cels: Vec<Cel>,
}

/// A decoded sprite. Built once by [`Document::from_bytes`] and never modified.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Document {
    pub header: Header,
    pub frames: Vec<Frame>,
    /// Depth first, bottom to top
    pub layers: Vec<Layer>,
    pub tags: Vec<Tag>,
    pub slices: Vec<Slice>,
    pub tilesets: Vec<Tileset>,
    pub palette: Palette,
    pub user_data: UserData,
}

impl Document {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        crate::decoder::decode(data)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_bytes(&data)
    }

    pub fn width(&self) -> u32 {
        self.header.width.into()
    }

    pub fn height(&self) -> u32 {
        self.header.height.into()
    }

    pub fn frame(&self, index: usize) -> Result<&Frame> {
        self.frames
            .get(index)
            .ok_or_else(|| Error::range("frame", index as i64, self.frames.len()))
    }

    pub fn layer(&self, index: usize) -> Result<&Layer> {
        self.layers
            .get(index)
            .ok_or_else(|| Error::range("layer", index as i64, self.layers.len()))
    }

    pub fn layer_by_name(&self, name: &str) -> Result<&Layer> {
        self.layers
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| Error::not_found("layer", name))
    }

    pub fn tag(&self, index: usize) -> Result<&Tag> {
        self.tags
            .get(index)
            .ok_or_else(|| Error::range("tag", index as i64, self.tags.len()))
    }

    pub fn tag_by_name(&self, name: &str) -> Result<&Tag> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::not_found("tag", name))
    }

    pub fn slice_by_name(&self, name: &str) -> Result<&Slice> {
        self.slices
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::not_found("slice", name))
    }

    pub fn tileset_by_id(&self, id: u32) -> Option<&Tileset> {
        self.tilesets.iter().find(|t| t.id == id)
    }

    pub fn tileset_for_layer(&self, layer: &Layer) -> Option<&Tileset> {
        layer.tileset_id().and_then(|id| self.tileset_by_id(id))
    }

    /// Follows a linked cel to the cel holding its content.
    pub fn resolve_cel<'d>(&'d self, cel: &'d Cel) -> &'d Cel {
        match cel.content {
            CelContent::Linked { target, .. } => self
                .frames
                .get(target.frame)
                .and_then(|f| f.cels.get(target.cel))
                .unwrap_or(cel),
            _ => cel,
        }
    }

    /// Whether the layer and every group containing it are visible.
    pub fn is_layer_visible(&self, index: usize) -> bool {
        let mut current = Some(index);
        // bounded in case of a malformed parent chain
        for _ in 0..=self.layers.len() {
            let Some(i) = current else {
                return true;
            };
            match self.layers.get(i) {
                Some(layer) if layer.is_visible() => current = layer.parent,
                _ => return false,
            }
        }
        false
    }

    pub fn flatten_frame(&self, index: usize, options: &FlattenOptions) -> Result<Image> {
        Ok(flatten(self, self.frame(index)?, options))
    }

    /// Flattens every frame, in parallel.
    pub fn flatten_all_frames(&self, options: &FlattenOptions) -> Vec<Image> {
        self.frames
            .par_iter()
            .map(|frame| flatten(self, frame, options))
            .collect()
    }
}
