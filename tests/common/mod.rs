//! Writes small aseprite files in memory for the integration tests.

#![allow(dead_code)]

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};

pub const LAYER: u16 = 0x2004;
pub const CEL: u16 = 0x2005;
pub const COLOR_PROFILE: u16 = 0x2007;
pub const TAGS: u16 = 0x2018;
pub const PALETTE: u16 = 0x2019;
pub const OLD_PALETTE: u16 = 0x0004;
pub const USER_DATA: u16 = 0x2020;
pub const SLICE: u16 = 0x2022;
pub const TILESET: u16 = 0x2023;

pub const VISIBLE: u16 = 1;
pub const BACKGROUND: u16 = 8;
pub const REFERENCE: u16 = 64;

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Little-endian byte writer.
#[derive(Default, Clone)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn u8(mut self, v: u8) -> Self {
        self.0.push(v);
        self
    }
    pub fn u16(mut self, v: u16) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    pub fn i16(mut self, v: i16) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    pub fn u32(mut self, v: u32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    pub fn i32(mut self, v: i32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    pub fn zeros(mut self, n: usize) -> Self {
        self.0.extend(std::iter::repeat(0).take(n));
        self
    }
    pub fn bytes(mut self, b: &[u8]) -> Self {
        self.0.extend_from_slice(b);
        self
    }
    pub fn string(self, s: &str) -> Self {
        self.u16(s.len() as u16).bytes(s.as_bytes())
    }
}

pub struct LayerSpec<'a> {
    pub name: &'a str,
    pub flags: u16,
    pub layer_type: u16,
    pub child_level: u16,
    pub blend_mode: u16,
    pub opacity: u8,
    pub tileset: Option<u32>,
}

impl<'a> LayerSpec<'a> {
    pub fn normal(name: &'a str) -> Self {
        Self {
            name,
            flags: VISIBLE,
            layer_type: 0,
            child_level: 0,
            blend_mode: 0,
            opacity: 255,
            tileset: None,
        }
    }

    pub fn group(name: &'a str) -> Self {
        Self {
            layer_type: 1,
            ..Self::normal(name)
        }
    }

    pub fn tilemap(name: &'a str, tileset: u32) -> Self {
        Self {
            layer_type: 2,
            tileset: Some(tileset),
            ..Self::normal(name)
        }
    }

    pub fn flags(self, flags: u16) -> Self {
        Self { flags, ..self }
    }

    pub fn level(self, child_level: u16) -> Self {
        Self {
            child_level,
            ..self
        }
    }

    pub fn blend(self, blend_mode: u16) -> Self {
        Self { blend_mode, ..self }
    }

    pub fn opacity(self, opacity: u8) -> Self {
        Self { opacity, ..self }
    }

    pub fn body(&self) -> Vec<u8> {
        let mut b = Bytes::new()
            .u16(self.flags)
            .u16(self.layer_type)
            .u16(self.child_level)
            .u16(0)
            .u16(0)
            .u16(self.blend_mode)
            .u8(self.opacity)
            .zeros(3)
            .string(self.name);
        if let Some(tileset) = self.tileset {
            b = b.u32(tileset);
        }
        b.0
    }
}

pub struct TagSpec<'a> {
    pub name: &'a str,
    pub from: u16,
    pub to: u16,
    pub direction: u8,
    pub repeat: u16,
    pub color: [u8; 3],
}

fn cel_header(layer: u16, x: i16, y: i16, opacity: u8, cel_type: u16) -> Bytes {
    Bytes::new()
        .u16(layer)
        .i16(x)
        .i16(y)
        .u8(opacity)
        .u16(cel_type)
        .i16(0)
        .zeros(5)
}

#[derive(Default, Clone)]
pub struct FrameBuilder {
    pub duration: u16,
    chunks: Vec<Vec<u8>>,
    old_count_only: bool,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            duration: 100,
            ..Self::default()
        }
    }

    pub fn duration(self, duration: u16) -> Self {
        Self { duration, ..self }
    }

    /// Writes the chunk count only in the old WORD field.
    pub fn old_count_only(self) -> Self {
        Self {
            old_count_only: true,
            ..self
        }
    }

    pub fn chunk(self, chunk_type: u16, body: Vec<u8>) -> Self {
        let size = 6 + body.len() as u32;
        self.raw_chunk(size, chunk_type, body)
    }

    /// A chunk with an arbitrary declared size.
    pub fn raw_chunk(mut self, size: u32, chunk_type: u16, body: Vec<u8>) -> Self {
        let bytes = Bytes::new().u32(size).u16(chunk_type).bytes(&body).0;
        self.chunks.push(bytes);
        self
    }

    pub fn layer(self, spec: LayerSpec) -> Self {
        self.chunk(LAYER, spec.body())
    }

    pub fn raw_cel(self, layer: u16, x: i16, y: i16, opacity: u8, w: u16, h: u16, pixels: &[u8]) -> Self {
        let body = cel_header(layer, x, y, opacity, 0).u16(w).u16(h).bytes(pixels).0;
        self.chunk(CEL, body)
    }

    pub fn compressed_cel(
        self,
        layer: u16,
        x: i16,
        y: i16,
        opacity: u8,
        w: u16,
        h: u16,
        pixels: &[u8],
    ) -> Self {
        let body = cel_header(layer, x, y, opacity, 2)
            .u16(w)
            .u16(h)
            .bytes(&zlib(pixels))
            .0;
        self.chunk(CEL, body)
    }

    pub fn linked_cel(self, layer: u16, frame: u16) -> Self {
        let body = cel_header(layer, 0, 0, 255, 1).u16(frame).0;
        self.chunk(CEL, body)
    }

    /// A 32 bits per tile map with the default masks.
    pub fn tilemap_cel(self, layer: u16, x: i16, y: i16, w: u16, h: u16, tiles: &[u32]) -> Self {
        let raw: Vec<u8> = tiles.iter().flat_map(|t| t.to_le_bytes()).collect();
        let body = cel_header(layer, x, y, 255, 3)
            .u16(w)
            .u16(h)
            .u16(32)
            .u32(0x1fff_ffff)
            .u32(0x2000_0000)
            .u32(0x4000_0000)
            .u32(0x8000_0000)
            .zeros(10)
            .bytes(&zlib(&raw))
            .0;
        self.chunk(CEL, body)
    }

    pub fn tags(self, tags: &[TagSpec]) -> Self {
        let mut b = Bytes::new().u16(tags.len() as u16).zeros(8);
        for t in tags {
            b = b
                .u16(t.from)
                .u16(t.to)
                .u8(t.direction)
                .u16(t.repeat)
                .zeros(6)
                .bytes(&t.color)
                .u8(0)
                .string(t.name);
        }
        self.chunk(TAGS, b.0)
    }

    pub fn palette(self, first: u32, colors: &[[u8; 4]], names: &[Option<&str>]) -> Self {
        let last = first + colors.len() as u32 - 1;
        let mut b = Bytes::new().u32(last + 1).u32(first).u32(last).zeros(8);
        for (i, rgba) in colors.iter().enumerate() {
            match names.get(i).copied().flatten() {
                Some(name) => b = b.u16(1).bytes(rgba).string(name),
                None => b = b.u16(0).bytes(rgba),
            }
        }
        self.chunk(PALETTE, b.0)
    }

    pub fn old_palette(self, packets: &[(u8, &[[u8; 3]])]) -> Self {
        let mut b = Bytes::new().u16(packets.len() as u16);
        for (skip, colors) in packets {
            b = b.u8(*skip).u8(colors.len() as u8);
            for rgb in colors.iter() {
                b = b.bytes(rgb);
            }
        }
        self.chunk(OLD_PALETTE, b.0)
    }

    pub fn user_data(self, text: Option<&str>, color: Option<[u8; 4]>) -> Self {
        self.user_data_with_properties(text, color, None)
    }

    /// `properties` is written verbatim after the text and color.
    pub fn user_data_with_properties(
        self,
        text: Option<&str>,
        color: Option<[u8; 4]>,
        properties: Option<&[u8]>,
    ) -> Self {
        let flags = text.map_or(0, |_| 1) | color.map_or(0, |_| 2) | properties.map_or(0, |_| 4);
        let mut b = Bytes::new().u32(flags);
        if let Some(text) = text {
            b = b.string(text);
        }
        if let Some(color) = color {
            b = b.bytes(&color);
        }
        if let Some(properties) = properties {
            b = b.bytes(properties);
        }
        self.chunk(USER_DATA, b.0)
    }

    /// Keys are (frame, x, y, w, h).
    pub fn slice(
        self,
        name: &str,
        keys: &[(u32, i32, i32, u32, u32)],
        center: Option<(i32, i32, u32, u32)>,
        pivot: Option<(i32, i32)>,
    ) -> Self {
        let flags = center.map_or(0, |_| 1) | pivot.map_or(0, |_| 2);
        let mut b = Bytes::new()
            .u32(keys.len() as u32)
            .u32(flags)
            .u32(0)
            .string(name);
        for &(frame, x, y, w, h) in keys {
            b = b.u32(frame).i32(x).i32(y).u32(w).u32(h);
            if let Some((cx, cy, cw, ch)) = center {
                b = b.i32(cx).i32(cy).u32(cw).u32(ch);
            }
            if let Some((px, py)) = pivot {
                b = b.i32(px).i32(py);
            }
        }
        self.chunk(SLICE, b.0)
    }

    /// `pixels` holds every tile, top to bottom, in the file's color depth.
    pub fn tileset(self, id: u32, count: u32, w: u16, h: u16, name: &str, pixels: &[u8]) -> Self {
        let data = zlib(pixels);
        let body = Bytes::new()
            .u32(id)
            .u32(2 | 4)
            .u32(count)
            .u16(w)
            .u16(h)
            .i16(1)
            .zeros(14)
            .string(name)
            .u32(data.len() as u32)
            .bytes(&data)
            .0;
        self.chunk(TILESET, body)
    }

    fn build(&self) -> Vec<u8> {
        let count = self.chunks.len();
        let body: Vec<u8> = self.chunks.concat();
        Bytes::new()
            .u32(16 + body.len() as u32)
            .u16(0xF1FA)
            .u16(count as u16)
            .u16(self.duration)
            .zeros(2)
            .u32(if self.old_count_only { 0 } else { count as u32 })
            .bytes(&body)
            .0
    }
}

pub struct AseBuilder {
    pub width: u16,
    pub height: u16,
    pub depth: u16,
    pub flags: u32,
    pub transparent_index: u8,
    pub frames: Vec<FrameBuilder>,
}

impl AseBuilder {
    /// An RGBA sprite with valid layer opacity.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            depth: 32,
            flags: 1,
            transparent_index: 0,
            frames: Vec::new(),
        }
    }

    pub fn depth(self, depth: u16) -> Self {
        Self { depth, ..self }
    }

    pub fn flags(self, flags: u32) -> Self {
        Self { flags, ..self }
    }

    pub fn transparent_index(self, transparent_index: u8) -> Self {
        Self {
            transparent_index,
            ..self
        }
    }

    pub fn frame(mut self, frame: FrameBuilder) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let frames: Vec<u8> = self.frames.iter().flat_map(|f| f.build()).collect();
        Bytes::new()
            .u32(128 + frames.len() as u32)
            .u16(0xA5E0)
            .u16(self.frames.len() as u16)
            .u16(self.width)
            .u16(self.height)
            .u16(self.depth)
            .u32(self.flags)
            .u16(100)
            .zeros(8)
            .u8(self.transparent_index)
            .zeros(3)
            .u16(0)
            .u8(1)
            .u8(1)
            .i16(0)
            .i16(0)
            .u16(16)
            .u16(16)
            .zeros(84)
            .bytes(&frames)
            .0
    }
}

/// `n` RGBA pixels of one color.
pub fn fill(n: usize, rgba: [u8; 4]) -> Vec<u8> {
    rgba.iter().copied().cycle().take(n * 4).collect()
}
