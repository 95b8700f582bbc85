//! On-disk records of the aseprite format.
//!
//! Layouts follow <https://github.com/aseprite/aseprite/blob/main/docs/ase-file-specs.md>.
//! These are read straight off the byte stream and converted into the document
//! model by [`crate::decoder`].

use bitflags::bitflags;
use parsing::Parse;
use serde::Serialize;

pub type Byte = u8;
pub type Word = u16;
pub type Short = i16;
pub type Dword = u32;
pub type Long = i32;

pub const FILE_MAGIC: Word = 0xA5E0;
pub const FRAME_MAGIC: Word = 0xF1FA;

pub const HEADER_SIZE: usize = 128;
pub const FRAME_HEADER_SIZE: usize = 16;
pub const CHUNK_HEADER_SIZE: usize = 6;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Parse)]
pub struct Point {
    pub x: Long,
    pub y: Long,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Parse)]
pub struct Rect {
    pub x: Long,
    pub y: Long,
    pub width: Dword,
    pub height: Dword,
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
    pub struct HeaderFlags: u32 {
        const LAYER_OPACITY_VALID = 0x0001;
        const GROUP_BLEND_VALID = 0x0002;
        const LAYER_UUIDS = 0x0004;
    }
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Debug)]
    pub struct FileHeader {
        pub file_size: Dword,
        [[magic: Word = FILE_MAGIC]]
        pub num_frames: Word,
        pub width: Word,
        pub height: Word,
        /// 32=RGBA, 16=Grayscale, 8=Indexed
        pub color_depth: Word,
        pub flags: Dword,
        /// Deprecated, now on each frame
        pub frame_ms_dur: Word,
        [[ignore: Dword]]
        [[ignore: Dword]]
        pub transparent_index: Byte,
        [[padding_bytes = 3]]
        /// 0 means 256 for old sprites
        pub color_num: Word,
        pub pix_width: Byte,
        pub pix_height: Byte,
        pub grid_x_pos: Short,
        pub grid_y_pos: Short,
        pub grid_width: Word,
        pub grid_height: Word,
        [[padding_bytes = 84]]
    }
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Debug)]
    pub struct FrameHeader {
        /// Ignored, chunks are counted instead
        pub frame_size: Dword,
        [[magic: Word = FRAME_MAGIC]]
        old_num_chunks: Word,
        pub duration_ms: Word,
        [[padding_bytes = 2]]
        new_num_chunks: Dword,
    }
}

impl FrameHeader {
    pub fn num_chunks(&self) -> usize {
        if self.new_num_chunks != 0 {
            self.new_num_chunks as usize
        } else {
            self.old_num_chunks as usize
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Parse)]
pub struct ChunkHeader {
    /// Includes the six header bytes
    pub size: Dword,
    pub chunk_type: Word,
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Eq, Debug)]
    pub struct OldPaletteChunk<'a> {
        [[param: Word = num_packets]]
        #[parse(collection: OldPalettePacket = num_packets)]
        pub packets: Vec<OldPalettePacket<'a>>,
    }
}

/// A packet's color count byte uses 0 for 256.
pub fn packet_colors(num_colors: Byte) -> usize {
    if num_colors == 0 {
        256
    } else {
        num_colors as usize
    }
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Eq, Debug)]
    pub struct OldPalettePacket<'a> {
        pub num_skip: Byte,
        [[param: Byte = num_colors]]
        /// RGB triplets
        #[parse(sized_buf = packet_colors(num_colors) * 3)]
        pub colors: &'a [u8],
    }
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Eq, Debug)]
    pub struct LayerChunk {
        pub flags: Word,
        pub layer_type: Word,
        pub child_level: Word,
        [[ignore: Word]]
        [[ignore: Word]]
        pub blend_mode: Word,
        pub opacity: Byte,
        [[padding_bytes = 3]]
        [[param: Word = string_size]]
        #[parse(sized_utf8_string = string_size)]
        pub name: String,
        #[parse(option_if: Dword = layer_type == 2)]
        pub tileset_index: Option<Dword>,
    }
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Eq, Debug)]
    pub struct CelChunk {
        pub layer_index: Word,
        pub x: Short,
        pub y: Short,
        pub opacity: Byte,
        pub cel_type: Word,
        pub z_index: Short,
        [[padding_bytes = 5]]
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Parse)]
pub struct ImageSize {
    pub width: Word,
    pub height: Word,
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Eq, Debug)]
    pub struct TilemapHeader {
        /// In tiles
        pub width: Word,
        pub height: Word,
        pub bits_per_tile: Word,
        pub tile_id_mask: Dword,
        pub x_flip_mask: Dword,
        pub y_flip_mask: Dword,
        pub diagonal_flip_mask: Dword,
        [[padding_bytes = 10]]
    }
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Eq, Debug)]
    pub struct TagsChunk {
        [[param: Word = num_tags]]
        [[padding_bytes = 8]]
        #[parse(collection: TagRecord = num_tags)]
        pub tags: Vec<TagRecord>,
    }
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Eq, Debug)]
    pub struct TagRecord {
        pub from: Word,
        pub to: Word,
        pub direction: Byte,
        pub repeat: Word,
        [[padding_bytes = 6]]
        /// Superseded by the user data color since 1.3
        pub color: [Byte; 3],
        [[padding_bytes = 1]]
        pub name: String,
    }
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Eq, Debug)]
    pub struct PaletteChunk {
        pub new_size: Dword,
        pub first: Dword,
        pub last: Dword,
        [[padding_bytes = 8]]
        #[parse(collection: PaletteEntry = (u64::from(last) + 1).saturating_sub(u64::from(first)))]
        pub entries: Vec<PaletteEntry>,
    }
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Eq, Debug)]
    pub struct PaletteEntry {
        pub flags: Word,
        pub rgba: [Byte; 4],
        #[parse(option_if: String = flags & 1 != 0)]
        pub name: Option<String>,
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct UserDataFlags: u32 {
        const HAS_TEXT = 0x0001;
        const HAS_COLOR = 0x0002;
        const HAS_PROPERTIES = 0x0004;
    }
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Eq, Debug)]
    pub struct UserDataChunk {
        pub flags: Dword,
        #[parse(option_if: String = flags & UserDataFlags::HAS_TEXT.bits() != 0)]
        pub text: Option<String>,
        #[parse(option_if: [Byte; 4] = flags & UserDataFlags::HAS_COLOR.bits() != 0)]
        pub rgba: Option<[Byte; 4]>,
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
    pub struct SliceFlags: u32 {
        const NINE_PATCH = 0x0001;
        const HAS_PIVOT = 0x0002;
    }
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Eq, Debug)]
    pub struct SliceChunk {
        pub num_keys: Dword,
        pub flags: Dword,
        [[ignore: Dword]]
        pub name: String,
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Parse)]
pub struct SliceKeyHeader {
    pub frame: Dword,
    pub bounds: Rect,
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
    pub struct TilesetFlags: u32 {
        const EXTERNAL_FILE = 0x0001;
        const EMBEDDED = 0x0002;
        const EMPTY_TILE_ZERO = 0x0004;
        const MATCH_X_FLIP = 0x0008;
        const MATCH_Y_FLIP = 0x0010;
        const MATCH_D_FLIP = 0x0020;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Parse)]
pub struct ExternalTileset {
    pub file_id: Dword,
    pub tileset_id: Dword,
}

parsing::parsable_struct! {
    #[derive(Clone, PartialEq, Eq, Debug)]
    pub struct TilesetChunk {
        pub id: Dword,
        pub flags: Dword,
        pub num_tiles: Dword,
        pub tile_width: Word,
        pub tile_height: Word,
        pub base_index: Short,
        [[padding_bytes = 14]]
        pub name: String,
        #[parse(option_if: ExternalTileset = flags & TilesetFlags::EXTERNAL_FILE.bits() != 0)]
        pub external: Option<ExternalTileset>,
        #[parse(option_if: Dword = flags & TilesetFlags::EMBEDDED.bits() != 0)]
        pub compressed_len: Option<Dword>,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use parsing::{ReadBytes, Reader};

    fn header_bytes() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&200_u32.to_le_bytes());
        b.extend_from_slice(&FILE_MAGIC.to_le_bytes());
        b.extend_from_slice(&3_u16.to_le_bytes());
        b.extend_from_slice(&32_u16.to_le_bytes());
        b.extend_from_slice(&16_u16.to_le_bytes());
        b.extend_from_slice(&32_u16.to_le_bytes());
        b.extend_from_slice(&1_u32.to_le_bytes());
        b.extend_from_slice(&100_u16.to_le_bytes());
        b.extend_from_slice(&[0; 8]);
        b.push(5);
        b.extend_from_slice(&[0; 3]);
        b.extend_from_slice(&0_u16.to_le_bytes());
        b.extend_from_slice(&[1, 1]);
        b.extend_from_slice(&(-2_i16).to_le_bytes());
        b.extend_from_slice(&0_i16.to_le_bytes());
        b.extend_from_slice(&16_u16.to_le_bytes());
        b.extend_from_slice(&16_u16.to_le_bytes());
        b.extend_from_slice(&[0; 84]);
        b
    }

    #[test]
    fn header_is_128_bytes() {
        let bytes = header_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);
        let mut r = Reader::new(&bytes);
        let h: FileHeader = r.read_type().unwrap();
        assert!(r.is_empty());
        assert_eq!(h.num_frames, 3);
        assert_eq!((h.width, h.height), (32, 16));
        assert_eq!(h.color_depth, 32);
        assert_eq!(h.transparent_index, 5);
        assert_eq!(h.grid_x_pos, -2);
    }

    #[test]
    fn header_magic_is_checked() {
        let mut bytes = header_bytes();
        bytes[4] = 0;
        let err = Reader::new(&bytes).read_type::<FileHeader>().unwrap_err();
        assert!(matches!(
            err,
            parsing::Error::MagicCheckFailed {
                offset: 4,
                expected: 0xA5E0,
                ..
            }
        ));
    }

    #[test]
    fn frame_chunk_count_prefers_new_field() {
        let mut b = Vec::new();
        b.extend_from_slice(&16_u32.to_le_bytes());
        b.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
        b.extend_from_slice(&0xFFFF_u16.to_le_bytes());
        b.extend_from_slice(&120_u16.to_le_bytes());
        b.extend_from_slice(&[0; 2]);
        b.extend_from_slice(&70_000_u32.to_le_bytes());
        let h: FrameHeader = Reader::new(&b).read_type().unwrap();
        assert_eq!(h.num_chunks(), 70_000);
        assert_eq!(h.duration_ms, 120);

        b[12..16].copy_from_slice(&0_u32.to_le_bytes());
        b[6..8].copy_from_slice(&4_u16.to_le_bytes());
        let h: FrameHeader = Reader::new(&b).read_type().unwrap();
        assert_eq!(h.num_chunks(), 4);
    }

    #[test]
    fn old_palette_zero_means_256() {
        let mut b = vec![1, 0, 3, 0];
        b.extend(std::iter::repeat(7).take(256 * 3));
        let chunk: OldPaletteChunk = Reader::new(&b).read_type().unwrap();
        assert_eq!(chunk.packets.len(), 1);
        assert_eq!(chunk.packets[0].num_skip, 3);
        assert_eq!(chunk.packets[0].colors.len(), 768);
    }

    #[test]
    fn palette_entries_with_names() {
        let mut b = Vec::new();
        b.extend_from_slice(&2_u32.to_le_bytes());
        b.extend_from_slice(&0_u32.to_le_bytes());
        b.extend_from_slice(&1_u32.to_le_bytes());
        b.extend_from_slice(&[0; 8]);
        b.extend_from_slice(&[0, 0, 1, 2, 3, 4]);
        b.extend_from_slice(&[1, 0, 5, 6, 7, 8, 3, 0, b'r', b'e', b'd']);
        let mut r = Reader::new(&b);
        let chunk: PaletteChunk = r.read_type().unwrap();
        assert!(r.is_empty());
        assert_eq!(chunk.entries.len(), 2);
        assert_eq!(chunk.entries[0].rgba, [1, 2, 3, 4]);
        assert_eq!(chunk.entries[0].name, None);
        assert_eq!(chunk.entries[1].name.as_deref(), Some("red"));
    }
}
