use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Where in the file a decode failure happened.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Location {
    Header,
    Frame {
        frame: usize,
    },
    Chunk {
        frame: usize,
        chunk_type: u16,
        /// Offset of the chunk's size field
        offset: usize,
    },
    /// Checks run once every frame is read
    Document,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Header => write!(f, "file header"),
            Location::Frame { frame } => write!(f, "header of frame {frame}"),
            Location::Chunk {
                frame,
                chunk_type,
                offset,
            } => write!(
                f,
                "chunk {chunk_type:#06x} at byte {offset} in frame {frame}"
            ),
            Location::Document => write!(f, "document"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FormatErrorKind {
    #[error(transparent)]
    Read(#[from] parsing::Error),
    #[error("unsupported color depth {0}")]
    ColorDepth(u16),
    #[error("unknown layer type {0}")]
    LayerType(u16),
    #[error("unknown blend mode {0}")]
    BlendMode(u16),
    #[error("unknown cel type {0}")]
    CelType(u16),
    #[error("unknown tag direction {0}")]
    TagDirection(u8),
    #[error("unsupported tile size of {0} bits")]
    BitsPerTile(u16),
    #[error("unknown chunk type")]
    UnknownChunk,
    #[error("chunk size {0} is smaller than its header")]
    ChunkTooSmall(u32),
    #[error("chunk ends at byte {chunk_end} but decoding stopped at byte {position}")]
    ChunkSizeMismatch { chunk_end: usize, position: usize },
    #[error("cel refers to layer {index} but only {len} layers exist")]
    LayerIndex { index: usize, len: usize },
    #[error("linked cel points at frame {frame} which has no cel on layer {layer}")]
    UnresolvedLink { frame: usize, layer: usize },
    #[error("tilemap layer refers to unknown tileset {0}")]
    UnresolvedTileset(u32),
    #[error("cel on layer {0} holds tiles but the layer is not a tilemap")]
    TilesOnNonTilemapLayer(usize),
    #[error("tile id {id} is out of range for a tileset of {len} tiles")]
    TileId { id: u32, len: usize },
    #[error("palette index {index} is out of range for a palette of {len} colors")]
    PaletteIndex { index: usize, len: usize },
    #[error("palette range {first}..={last} is invalid")]
    PaletteRange { first: u32, last: u32 },
    #[error("failed to decompress data")]
    Decompress(#[source] std::io::Error),
    #[error("decompressed {found} bytes, expected {expected}")]
    DecompressedSize { expected: usize, found: usize },
    #[error("tileset of {tiles} tiles of {tile_width}x{tile_height} is too large")]
    TilesetSize {
        tile_width: u16,
        tile_height: u16,
        tiles: u32,
    },
    #[error("tag spans frames {from}..={to} but the sprite has {frames} frames")]
    TagRange { from: u16, to: u16, frames: usize },
    #[error("user data chunk has nothing to attach to")]
    OrphanUserData,
    #[error("layer {layer} has child level {level} but only {depth} groups are open")]
    LayerLevel {
        layer: usize,
        level: usize,
        depth: usize,
    },
    #[error("layer {0} is its own ancestor")]
    CyclicLayers(usize),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed aseprite file, {location}: {kind}")]
    Format {
        location: Location,
        #[source]
        kind: FormatErrorKind,
    },
    #[error("{what} index {index} is out of range (length {len})")]
    Range {
        what: &'static str,
        index: i64,
        len: usize,
    },
    #[error("no {what} named {name:?}")]
    NotFound { what: &'static str, name: String },
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn format(location: Location, kind: impl Into<FormatErrorKind>) -> Self {
        Error::Format {
            location,
            kind: kind.into(),
        }
    }

    pub fn range(what: &'static str, index: impl Into<i64>, len: usize) -> Self {
        Error::Range {
            what,
            index: index.into(),
            len,
        }
    }

    pub fn not_found(what: &'static str, name: &str) -> Self {
        Error::NotFound {
            what,
            name: name.to_owned(),
        }
    }

    /// The kind of format error, if this is one.
    pub fn format_kind(&self) -> Option<&FormatErrorKind> {
        match self {
            Error::Format { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attaches a [`Location`] to errors coming out of the reader and pixel decoding.
pub(crate) trait At<T> {
    fn at(self, location: Location) -> Result<T>;
}

impl<T, E: Into<FormatErrorKind>> At<T> for std::result::Result<T, E> {
    fn at(self, location: Location) -> Result<T> {
        self.map_err(|e| Error::format(location, e))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn messages_name_the_chunk() {
        let err = Error::format(
            Location::Chunk {
                frame: 2,
                chunk_type: 0x2005,
                offset: 300,
            },
            FormatErrorKind::UnknownChunk,
        );
        assert_eq!(
            err.to_string(),
            "malformed aseprite file, chunk 0x2005 at byte 300 in frame 2: unknown chunk type"
        );
    }

    #[test]
    fn reader_errors_convert() {
        let res: std::result::Result<(), parsing::Error> = Err(parsing::Error::UnexpectedEof {
            offset: 10,
            wanted: 4,
            remaining: 1,
        });
        let err = res.at(Location::Header).unwrap_err();
        assert!(matches!(
            err.format_kind(),
            Some(FormatErrorKind::Read(parsing::Error::UnexpectedEof { offset: 10, .. }))
        ));
    }

    #[test]
    fn range_error_allows_negative_index() {
        let err = Error::range("tile", -1, 4);
        assert_eq!(err.to_string(), "tile index -1 is out of range (length 4)");
    }
}
