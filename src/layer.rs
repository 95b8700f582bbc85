use bitflags::bitflags;
use serde::Serialize;

use crate::blend::BlendMode;
use crate::error::FormatErrorKind;
use crate::user_data::UserData;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
    pub struct LayerFlags: u16 {
        const VISIBLE = 0x0001;
        const EDITABLE = 0x0002;
        const LOCK_MOVEMENT = 0x0004;
        const BACKGROUND = 0x0008;
        const PREFER_LINKED_CELS = 0x0010;
        const COLLAPSED = 0x0020;
        const REFERENCE = 0x0040;
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub enum LayerKind {
    Normal,
    /// Children are indices into the document's layer list, bottom to top.
    Group { children: Vec<usize> },
    Tilemap { tileset_id: u32 },
}

impl LayerKind {
    pub(crate) fn from_raw(layer_type: u16, tileset_index: Option<u32>) -> Result<Self, FormatErrorKind> {
        match (layer_type, tileset_index) {
            (0, _) => Ok(LayerKind::Normal),
            (1, _) => Ok(LayerKind::Group {
                children: Vec::new(),
            }),
            (2, Some(tileset_id)) => Ok(LayerKind::Tilemap { tileset_id }),
            (other, _) => Err(FormatErrorKind::LayerType(other)),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Layer {
    pub name: String,
    pub flags: LayerFlags,
    pub kind: LayerKind,
    pub blend_mode: BlendMode,
    pub opacity: u8,
    /// Nesting depth as stored in the file
    pub child_level: u16,
    /// Enclosing group layer
    pub parent: Option<usize>,
    pub uuid: Option<[u8; 16]>,
    pub user_data: UserData,
}

impl Layer {
    /// The layer's own visibility flag, ignoring enclosing groups.
    /// See [`crate::Document::is_layer_visible`].
    pub fn is_visible(&self) -> bool {
        self.flags.contains(LayerFlags::VISIBLE)
    }

    pub fn is_background(&self) -> bool {
        self.flags.contains(LayerFlags::BACKGROUND)
    }

    pub fn is_reference(&self) -> bool {
        self.flags.contains(LayerFlags::REFERENCE)
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, LayerKind::Group { .. })
    }

    pub fn tileset_id(&self) -> Option<u32> {
        match self.kind {
            LayerKind::Tilemap { tileset_id } => Some(tileset_id),
            _ => None,
        }
    }

    pub fn children(&self) -> &[usize] {
        match &self.kind {
            LayerKind::Group { children } => children,
            _ => &[],
        }
    }
}

/// Fills in `parent` and group children from each layer's child level.
///
/// Layers are stored depth first, so a layer at level `n` belongs to the
/// closest preceding group at level `n - 1`.
pub(crate) fn link_hierarchy(layers: &mut [Layer]) -> Result<(), FormatErrorKind> {
    let mut open_groups: Vec<usize> = Vec::new();
    for index in 0..layers.len() {
        let level = layers[index].child_level as usize;
        if level > open_groups.len() {
            return Err(FormatErrorKind::LayerLevel {
                layer: index,
                level,
                depth: open_groups.len(),
            });
        }
        open_groups.truncate(level);
        let parent = open_groups.last().copied();
        layers[index].parent = parent;
        if let Some(parent) = parent {
            if let LayerKind::Group { children } = &mut layers[parent].kind {
                children.push(index);
            }
        }
        if layers[index].is_group() {
            open_groups.push(index);
        }
    }
    check_acyclic(layers)
}

/// Walks every group's children and fails if a layer is reached twice on one path.
pub(crate) fn check_acyclic(layers: &[Layer]) -> Result<(), FormatErrorKind> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut marks = vec![Mark::New; layers.len()];
    for root in 0..layers.len() {
        if marks[root] != Mark::New {
            continue;
        }
        // (layer, next child to visit)
        let mut stack = vec![(root, 0)];
        marks[root] = Mark::Active;
        while let Some((layer, next)) = stack.pop() {
            let children = layers[layer].children();
            let Some(&child) = children.get(next) else {
                marks[layer] = Mark::Done;
                continue;
            };
            stack.push((layer, next + 1));
            match marks.get(child) {
                Some(Mark::New) => {
                    marks[child] = Mark::Active;
                    stack.push((child, 0));
                }
                Some(Mark::Active) => return Err(FormatErrorKind::CyclicLayers(child)),
                Some(Mark::Done) => {}
                None => {
                    return Err(FormatErrorKind::LayerIndex {
                        index: child,
                        len: layers.len(),
                    })
                }
            }
        }
    }
    Ok(())
}
