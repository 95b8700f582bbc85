//! Decodes Aseprite `.ase`/`.aseprite` files and flattens their frames.
//!
//! ```no_run
//! use aseprite_flatten::{Document, FlattenOptions};
//!
//! let doc = Document::from_path("sprite.aseprite")?;
//! let walk = doc.tag_by_name("walk")?;
//! for frame in walk.frame_sequence() {
//!     let image = doc.flatten_frame(frame, &FlattenOptions::default())?;
//!     println!("{}x{}", image.width, image.height);
//! }
//! # Ok::<(), aseprite_flatten::Error>(())
//! ```

pub mod ase_file;
pub mod blend;
pub mod cel;
mod decoder;
pub mod document;
pub mod error;
pub mod flatten;
pub mod layer;
pub mod palette;
pub mod pixel;
pub mod slice;
pub mod tag;
pub mod tileset;
pub mod user_data;

pub use blend::{mul_un8, BlendMode};
pub use cel::{Cel, CelContent, CelRef, Image, Tile, Tilemap};
pub use decoder::ChunkType;
pub use document::{Document, Frame, Header};
pub use error::{Error, FormatErrorKind, Location, Result};
pub use flatten::FlattenOptions;
pub use layer::{Layer, LayerFlags, LayerKind};
pub use palette::Palette;
pub use pixel::{Color, ColorDepth};
pub use slice::{Slice, SliceKey};
pub use tag::{AnimationDirection, Tag};
pub use tileset::Tileset;
pub use user_data::UserData;
