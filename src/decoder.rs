//! Reads the frames of an aseprite file chunk by chunk into a [`Document`].

use log::{debug, trace, warn};
use parsing::{ReadBytes, Reader};

use crate::ase_file::{
    CelChunk, ChunkHeader, FileHeader, FrameHeader, HeaderFlags, ImageSize, LayerChunk,
    OldPaletteChunk, PaletteChunk, Point, Rect, SliceChunk, SliceFlags, SliceKeyHeader,
    TagsChunk, TilemapHeader, TilesetChunk, TilesetFlags, UserDataChunk, UserDataFlags,
    CHUNK_HEADER_SIZE,
};
use crate::blend::BlendMode;
use crate::cel::{Cel, CelContent, CelRef, Image, Tile, Tilemap};
use crate::document::{Document, Frame, Header};
use crate::error::{At, FormatErrorKind, Location, Result};
use crate::layer::{self, Layer, LayerFlags, LayerKind};
use crate::palette::Palette;
use crate::pixel::{self, Color, ColorDepth, PixelFormat};
use crate::slice::{Slice, SliceKey};
use crate::tag::Tag;
use crate::tileset::Tileset;
use crate::user_data::UserData;

type ChunkResult<T = ()> = std::result::Result<T, FormatErrorKind>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChunkType {
    OldPalette,
    OldPaletteB,
    Layer,
    Cel,
    CelExtra,
    ColorProfile,
    ExternalFiles,
    Mask,
    Path,
    Tags,
    Palette,
    UserData,
    Slice,
    Tileset,
}

impl ChunkType {
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0x0004 => ChunkType::OldPalette,
            0x0011 => ChunkType::OldPaletteB,
            0x2004 => ChunkType::Layer,
            0x2005 => ChunkType::Cel,
            0x2006 => ChunkType::CelExtra,
            0x2007 => ChunkType::ColorProfile,
            0x2008 => ChunkType::ExternalFiles,
            0x2016 => ChunkType::Mask,
            0x2017 => ChunkType::Path,
            0x2018 => ChunkType::Tags,
            0x2019 => ChunkType::Palette,
            0x2020 => ChunkType::UserData,
            0x2022 => ChunkType::Slice,
            0x2023 => ChunkType::Tileset,
            _ => return None,
        })
    }

    /// Chunks that are skipped without looking at their contents.
    pub fn is_ignored(self) -> bool {
        matches!(
            self,
            ChunkType::OldPaletteB
                | ChunkType::CelExtra
                | ChunkType::ColorProfile
                | ChunkType::ExternalFiles
                | ChunkType::Mask
                | ChunkType::Path
        )
    }
}

/// What the next user data chunk describes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum UserDataTarget {
    None,
    Sprite,
    Layer(usize),
    /// Index into the current frame's cels
    Cel(usize),
    /// Tags of the last tags chunk that have no user data yet
    Tags { next: usize, end: usize },
    Slice(usize),
    /// The tileset itself, then each of its tiles in turn
    Tileset { index: usize, next_tile: Option<usize> },
}

struct FrameState {
    index: usize,
    cels: Vec<Cel>,
    target: UserDataTarget,
    seen_new_palette: bool,
}

struct Decoder<'a> {
    reader: Reader<'a>,
    header: Header,
    frames: Vec<Frame>,
    layers: Vec<Layer>,
    tags: Vec<Tag>,
    slices: Vec<Slice>,
    tilesets: Vec<Tileset>,
    palette: Palette,
    user_data: UserData,
}

pub(crate) fn decode(data: &[u8]) -> Result<Document> {
    let mut reader = Reader::new(data);
    let raw: FileHeader = reader.read_type().at(Location::Header)?;
    let header = Header::from_raw(&raw).at(Location::Header)?;
    debug!(
        "{}x{} sprite, {:?}, {} frames",
        header.width, header.height, header.color_depth, header.num_frames
    );

    let mut decoder = Decoder {
        reader,
        palette: Palette::with_transparent_index(header.transparent_index),
        frames: Vec::with_capacity(header.num_frames as usize),
        header,
        layers: Vec::new(),
        tags: Vec::new(),
        slices: Vec::new(),
        tilesets: Vec::new(),
        user_data: UserData::default(),
    };
    for index in 0..decoder.header.num_frames as usize {
        decoder.frame(index)?;
    }
    decoder.finish()
}

impl<'a> Decoder<'a> {
    fn frame(&mut self, index: usize) -> Result<()> {
        let location = Location::Frame { frame: index };
        let raw: FrameHeader = self.reader.read_type().at(location)?;
        debug!(
            "frame {index}: {} chunks, {}ms",
            raw.num_chunks(),
            raw.duration_ms
        );
        let mut state = FrameState {
            index,
            cels: Vec::new(),
            target: UserDataTarget::None,
            seen_new_palette: false,
        };
        for _ in 0..raw.num_chunks() {
            self.chunk(&mut state)?;
        }
        self.frames.push(Frame {
            duration_ms: raw.duration_ms,
            cels: state.cels,
        });
        Ok(())
    }

    fn chunk(&mut self, state: &mut FrameState) -> Result<()> {
        let offset = self.reader.position();
        let header: ChunkHeader = self
            .reader
            .read_type()
            .at(Location::Frame { frame: state.index })?;
        let location = Location::Chunk {
            frame: state.index,
            chunk_type: header.chunk_type,
            offset,
        };
        let body_len = (header.size as usize)
            .checked_sub(CHUNK_HEADER_SIZE)
            .ok_or(FormatErrorKind::ChunkTooSmall(header.size))
            .at(location)?;
        let mut body = self.reader.limit(body_len).at(location)?;
        let chunk_type = ChunkType::from_u16(header.chunk_type)
            .ok_or(FormatErrorKind::UnknownChunk)
            .at(location)?;
        debug!("{chunk_type:?} chunk of {} bytes at {offset}", header.size);

        self.dispatch(chunk_type, state, &mut body).at(location)?;
        if !body.is_empty() {
            return Err(FormatErrorKind::ChunkSizeMismatch {
                chunk_end: body.position() + body.remaining(),
                position: body.position(),
            })
            .at(location);
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        chunk_type: ChunkType,
        state: &mut FrameState,
        body: &mut Reader<'a>,
    ) -> ChunkResult {
        if chunk_type.is_ignored() {
            debug!("ignoring {chunk_type:?} chunk");
            body.read_rest();
            return Ok(());
        }
        match chunk_type {
            ChunkType::Layer => self.layer(state, body),
            ChunkType::Cel => self.cel(state, body),
            ChunkType::Tags => self.tags(state, body),
            ChunkType::Palette => self.palette(state, body),
            ChunkType::OldPalette => self.old_palette(state, body),
            ChunkType::UserData => self.user_data(state, body),
            ChunkType::Slice => self.slice(state, body),
            ChunkType::Tileset => self.tileset(state, body),
            _ => {
                body.read_rest();
                Ok(())
            }
        }
    }

    fn layer(&mut self, state: &mut FrameState, body: &mut Reader<'a>) -> ChunkResult {
        let raw: LayerChunk = body.read_type()?;
        let uuid = if self.header.flags.contains(HeaderFlags::LAYER_UUIDS) {
            Some(body.read_type::<[u8; 16]>()?)
        } else {
            None
        };
        let kind = LayerKind::from_raw(raw.layer_type, raw.tileset_index)?;
        if let LayerKind::Tilemap { tileset_id } = kind {
            if !self.tilesets.iter().any(|t| t.id == tileset_id) {
                return Err(FormatErrorKind::UnresolvedTileset(tileset_id));
            }
        }
        let mut blend_mode = BlendMode::from_u16(raw.blend_mode)?;
        let mut opacity = if self.header.flags.contains(HeaderFlags::LAYER_OPACITY_VALID) {
            raw.opacity
        } else {
            255
        };
        if matches!(kind, LayerKind::Group { .. })
            && !self.header.flags.contains(HeaderFlags::GROUP_BLEND_VALID)
        {
            blend_mode = BlendMode::Normal;
            opacity = 255;
        }

        trace!("layer {} {:?}: {kind:?}", self.layers.len(), raw.name);
        self.layers.push(Layer {
            name: raw.name,
            flags: LayerFlags::from_bits_retain(raw.flags),
            kind,
            blend_mode,
            opacity,
            child_level: raw.child_level,
            parent: None,
            uuid,
            user_data: UserData::default(),
        });
        state.target = UserDataTarget::Layer(self.layers.len() - 1);
        Ok(())
    }

    fn cel(&mut self, state: &mut FrameState, body: &mut Reader<'a>) -> ChunkResult {
        let raw: CelChunk = body.read_type()?;
        let layer_index = raw.layer_index as usize;
        let layer = self
            .layers
            .get(layer_index)
            .ok_or(FormatErrorKind::LayerIndex {
                index: layer_index,
                len: self.layers.len(),
            })?;
        let format = PixelFormat {
            depth: self.header.color_depth,
            palette: &self.palette,
            opaque_index: layer.is_background(),
        };

        let content = match raw.cel_type {
            0 => {
                let size: ImageSize = body.read_type()?;
                let bytes = body.read_bytes(image_len(size, format))?;
                CelContent::Image(image(size, format.decode(bytes)?))
            }
            1 => {
                let frame: u16 = body.read_type()?;
                let frame = frame as usize;
                CelContent::Linked {
                    frame,
                    target: self.resolve_link(state.index, frame, layer_index)?,
                }
            }
            2 => {
                let size: ImageSize = body.read_type()?;
                let bytes = pixel::inflate(body.read_rest(), image_len(size, format))?;
                CelContent::Image(image(size, format.decode(&bytes)?))
            }
            3 => {
                let tileset_id = layer
                    .tileset_id()
                    .ok_or(FormatErrorKind::TilesOnNonTilemapLayer(layer_index))?;
                let tileset = self
                    .tilesets
                    .iter()
                    .find(|t| t.id == tileset_id)
                    .ok_or(FormatErrorKind::UnresolvedTileset(tileset_id))?;
                let header: TilemapHeader = body.read_type()?;
                CelContent::Tilemap(tilemap(&header, body.read_rest(), tileset)?)
            }
            other => return Err(FormatErrorKind::CelType(other)),
        };

        trace!(
            "cel on layer {layer_index} at ({}, {}), opacity {}",
            raw.x,
            raw.y,
            raw.opacity
        );
        state.cels.push(Cel {
            layer: layer_index,
            x: raw.x.into(),
            y: raw.y.into(),
            opacity: raw.opacity,
            z_index: raw.z_index,
            content,
            user_data: UserData::default(),
        });
        state.target = UserDataTarget::Cel(state.cels.len() - 1);
        Ok(())
    }

    /// Finds the cel on `layer` in an earlier `frame`, skipping through links.
    fn resolve_link(&self, current: usize, frame: usize, layer: usize) -> ChunkResult<CelRef> {
        let unresolved = FormatErrorKind::UnresolvedLink { frame, layer };
        if frame >= current {
            return Err(unresolved);
        }
        let cels = &self.frames.get(frame).ok_or(unresolved)?.cels;
        let Some(cel) = cels.iter().position(|c| c.layer == layer) else {
            return Err(FormatErrorKind::UnresolvedLink { frame, layer });
        };
        match cels[cel].content {
            CelContent::Linked { target, .. } => Ok(target),
            _ => Ok(CelRef { frame, cel }),
        }
    }

    fn tags(&mut self, state: &mut FrameState, body: &mut Reader<'a>) -> ChunkResult {
        let raw: TagsChunk = body.read_type()?;
        let start = self.tags.len();
        for record in raw.tags {
            let tag = Tag::from_record(record, self.header.num_frames as usize)?;
            trace!("tag {:?} {}..={} {:?}", tag.name, tag.from, tag.to, tag.direction);
            self.tags.push(tag);
        }
        state.target = UserDataTarget::Tags {
            next: start,
            end: self.tags.len(),
        };
        Ok(())
    }

    fn palette(&mut self, state: &mut FrameState, body: &mut Reader<'a>) -> ChunkResult {
        let raw: PaletteChunk = body.read_type()?;
        self.palette.apply(&raw)?;
        state.seen_new_palette = true;
        state.target = UserDataTarget::Sprite;
        Ok(())
    }

    fn old_palette(&mut self, state: &mut FrameState, body: &mut Reader<'a>) -> ChunkResult {
        if state.seen_new_palette {
            debug!("skipping old palette, frame {} has a new one", state.index);
            body.read_rest();
            return Ok(());
        }
        let raw: OldPaletteChunk = body.read_type()?;
        self.palette.apply_old(&raw);
        state.target = UserDataTarget::Sprite;
        Ok(())
    }

    fn user_data(&mut self, state: &mut FrameState, body: &mut Reader<'a>) -> ChunkResult {
        let raw: UserDataChunk = body.read_type()?;
        if raw.flags & UserDataFlags::HAS_PROPERTIES.bits() != 0 {
            warn!("skipping user data properties in frame {}", state.index);
            body.read_rest();
        }
        let data = UserData::from(raw);

        let target = state.target;
        match target {
            UserDataTarget::None => return Err(FormatErrorKind::OrphanUserData),
            UserDataTarget::Sprite => self.user_data = data,
            UserDataTarget::Layer(i) => self.layers[i].user_data = data,
            UserDataTarget::Cel(i) => state.cels[i].user_data = data,
            UserDataTarget::Slice(i) => self.slices[i].user_data = data,
            UserDataTarget::Tags { next, end } => {
                if next >= end {
                    return Err(FormatErrorKind::OrphanUserData);
                }
                self.tags[next].user_data = data;
                state.target = UserDataTarget::Tags {
                    next: next + 1,
                    end,
                };
            }
            UserDataTarget::Tileset { index, next_tile } => {
                let tileset = &mut self.tilesets[index];
                let tile = match next_tile {
                    None => {
                        tileset.user_data = data;
                        0
                    }
                    Some(tile) => {
                        if tileset.tile_user_data.len() <= tile {
                            tileset.tile_user_data.resize(tile + 1, UserData::default());
                        }
                        tileset.tile_user_data[tile] = data;
                        tile + 1
                    }
                };
                state.target = if tile < tileset.tile_count as usize {
                    UserDataTarget::Tileset {
                        index,
                        next_tile: Some(tile),
                    }
                } else {
                    UserDataTarget::None
                };
            }
        }
        Ok(())
    }

    fn slice(&mut self, state: &mut FrameState, body: &mut Reader<'a>) -> ChunkResult {
        let raw: SliceChunk = body.read_type()?;
        let flags = SliceFlags::from_bits_retain(raw.flags);
        let mut keys = Vec::new();
        for _ in 0..raw.num_keys {
            let key: SliceKeyHeader = body.read_type()?;
            let center = if flags.contains(SliceFlags::NINE_PATCH) {
                Some(body.read_type::<Rect>()?)
            } else {
                None
            };
            let pivot = if flags.contains(SliceFlags::HAS_PIVOT) {
                Some(body.read_type::<Point>()?)
            } else {
                None
            };
            keys.push(SliceKey {
                frame: key.frame,
                bounds: key.bounds,
                center,
                pivot,
            });
        }
        trace!("slice {:?} with {} keys", raw.name, keys.len());
        self.slices.push(Slice {
            name: raw.name,
            flags,
            keys,
            user_data: UserData::default(),
        });
        state.target = UserDataTarget::Slice(self.slices.len() - 1);
        Ok(())
    }

    fn tileset(&mut self, state: &mut FrameState, body: &mut Reader<'a>) -> ChunkResult {
        let raw: TilesetChunk = body.read_type()?;
        let flags = TilesetFlags::from_bits_retain(raw.flags);
        let pixels = match raw.compressed_len {
            Some(len) => {
                let data = body.read_bytes(len as usize)?;
                let format = PixelFormat {
                    depth: self.header.color_depth,
                    palette: &self.palette,
                    opaque_index: false,
                };
                let expected = tileset_len(&raw, format.depth)?;
                format.decode(&pixel::inflate(data, expected)?)?
            }
            None => {
                warn!("tileset {} {:?} has no embedded tiles", raw.id, raw.name);
                Vec::new()
            }
        };
        trace!("tileset {} {:?} of {} tiles", raw.id, raw.name, raw.num_tiles);
        self.tilesets.push(Tileset {
            id: raw.id,
            flags,
            name: raw.name,
            tile_count: raw.num_tiles,
            tile_width: raw.tile_width,
            tile_height: raw.tile_height,
            base_index: raw.base_index,
            external: raw.external,
            pixels,
            user_data: UserData::default(),
            tile_user_data: Vec::new(),
        });
        state.target = UserDataTarget::Tileset {
            index: self.tilesets.len() - 1,
            next_tile: None,
        };
        Ok(())
    }

    fn finish(mut self) -> Result<Document> {
        layer::link_hierarchy(&mut self.layers).at(Location::Document)?;
        Ok(Document {
            header: self.header,
            frames: self.frames,
            layers: self.layers,
            tags: self.tags,
            slices: self.slices,
            tilesets: self.tilesets,
            palette: self.palette,
            user_data: self.user_data,
        })
    }
}

fn image_len(size: ImageSize, format: PixelFormat<'_>) -> usize {
    size.width as usize * size.height as usize * format.depth.bytes_per_pixel()
}

fn tileset_len(raw: &TilesetChunk, depth: ColorDepth) -> ChunkResult<usize> {
    (raw.tile_width as usize)
        .checked_mul(raw.tile_height as usize)
        .and_then(|area| area.checked_mul(raw.num_tiles as usize))
        .and_then(|len| len.checked_mul(depth.bytes_per_pixel()))
        .ok_or(FormatErrorKind::TilesetSize {
            tile_width: raw.tile_width,
            tile_height: raw.tile_height,
            tiles: raw.num_tiles,
        })
}

fn image(size: ImageSize, pixels: Vec<Color>) -> Image {
    Image {
        width: size.width.into(),
        height: size.height.into(),
        pixels,
    }
}

fn tilemap(header: &TilemapHeader, data: &[u8], tileset: &Tileset) -> ChunkResult<Tilemap> {
    let count = header.width as usize * header.height as usize;
    let expected = count * pixel::bytes_per_tile(header.bits_per_tile)?;
    let values = pixel::decode_tile_values(
        &pixel::inflate(data, expected)?,
        header.bits_per_tile,
        count,
    )?;
    let tiles = values
        .into_iter()
        .map(|v| {
            let id = v & header.tile_id_mask;
            if id >= tileset.tile_count {
                return Err(FormatErrorKind::TileId {
                    id,
                    len: tileset.tile_count as usize,
                });
            }
            Ok(Tile {
                id,
                x_flip: v & header.x_flip_mask != 0,
                y_flip: v & header.y_flip_mask != 0,
                diagonal_flip: v & header.diagonal_flip_mask != 0,
            })
        })
        .collect::<ChunkResult<Vec<_>>>()?;
    Ok(Tilemap {
        width: header.width,
        height: header.height,
        tiles,
    })
}
