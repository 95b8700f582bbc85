use serde::Serialize;

use crate::ase_file::TagRecord;
use crate::error::FormatErrorKind;
use crate::pixel::Color;
use crate::user_data::UserData;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub enum AnimationDirection {
    #[default]
    Forward,
    Reverse,
    PingPong,
    PingPongReverse,
}

impl AnimationDirection {
    pub fn from_u8(value: u8) -> Result<Self, FormatErrorKind> {
        match value {
            0 => Ok(AnimationDirection::Forward),
            1 => Ok(AnimationDirection::Reverse),
            2 => Ok(AnimationDirection::PingPong),
            3 => Ok(AnimationDirection::PingPongReverse),
            other => Err(FormatErrorKind::TagDirection(other)),
        }
    }
}

/// A named animation over an inclusive range of frames.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Tag {
    pub name: String,
    pub from: u16,
    pub to: u16,
    pub direction: AnimationDirection,
    /// 0 loops forever
    pub repeat: u16,
    /// Color stored in the tag record, used by files older than 1.3
    pub legacy_color: Color,
    pub user_data: UserData,
}

impl Tag {
    pub(crate) fn from_record(record: TagRecord, num_frames: usize) -> Result<Self, FormatErrorKind> {
        if record.from > record.to || record.to as usize >= num_frames {
            return Err(FormatErrorKind::TagRange {
                from: record.from,
                to: record.to,
                frames: num_frames,
            });
        }
        let [r, g, b] = record.color;
        Ok(Self {
            direction: AnimationDirection::from_u8(record.direction)?,
            name: record.name,
            from: record.from,
            to: record.to,
            repeat: record.repeat,
            legacy_color: Color::new(r, g, b, 255),
            user_data: UserData::default(),
        })
    }

    /// The user data color if there is one, else the color from the tag record.
    pub fn color(&self) -> Color {
        self.user_data.color.unwrap_or(self.legacy_color)
    }

    pub fn num_frames(&self) -> usize {
        self.to.saturating_sub(self.from) as usize + 1
    }

    pub fn contains(&self, frame: usize) -> bool {
        (self.from as usize..=self.to as usize).contains(&frame)
    }

    /// Frame indices of one pass through the animation.
    ///
    /// Ping-pong passes do not repeat the turning frames, so a ping-pong over
    /// `2..=4` yields `[2, 3, 4, 3]`.
    pub fn frame_sequence(&self) -> Vec<usize> {
        let forward = self.from as usize..=self.to as usize;
        let inner = self.from as usize + 1..self.to as usize;
        match self.direction {
            AnimationDirection::Forward => forward.collect(),
            AnimationDirection::Reverse => forward.rev().collect(),
            AnimationDirection::PingPong => forward.chain(inner.rev()).collect(),
            AnimationDirection::PingPongReverse => forward.rev().chain(inner).collect(),
        }
    }
}
