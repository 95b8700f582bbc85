use serde::Serialize;

use crate::ase_file::UserDataChunk;
use crate::pixel::Color;

/// Text and color a user attached to a layer, cel, tag, slice, tileset or the sprite.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct UserData {
    pub text: Option<String>,
    pub color: Option<Color>,
}

impl UserData {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.color.is_none()
    }
}

impl From<UserDataChunk> for UserData {
    fn from(chunk: UserDataChunk) -> Self {
        Self {
            text: chunk.text,
            color: chunk.rgba.map(|[r, g, b, a]| Color::new(r, g, b, a)),
        }
    }
}
