use serde::Serialize;

use crate::ase_file::{Point, Rect, SliceFlags};
use crate::user_data::UserData;

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct SliceKey {
    /// First frame this key applies to
    pub frame: u32,
    pub bounds: Rect,
    /// Nine-patch center, relative to `bounds`
    pub center: Option<Rect>,
    /// Relative to `bounds`
    pub pivot: Option<Point>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Slice {
    pub name: String,
    pub flags: SliceFlags,
    /// Sorted by frame as stored in the file
    pub keys: Vec<SliceKey>,
    pub user_data: UserData,
}

impl Slice {
    pub fn is_nine_patch(&self) -> bool {
        self.flags.contains(SliceFlags::NINE_PATCH)
    }

    pub fn has_pivot(&self) -> bool {
        self.flags.contains(SliceFlags::HAS_PIVOT)
    }

    /// The key in effect on `frame`: the last one starting at or before it.
    pub fn key_for_frame(&self, frame: u32) -> Option<&SliceKey> {
        self.keys.iter().take_while(|key| key.frame <= frame).last()
    }
}
