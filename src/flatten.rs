use std::borrow::Cow;

use log::{trace, warn};

use crate::blend::{mul_un8, BlendMode};
use crate::cel::{CelContent, Image};
use crate::document::{Document, Frame};
use crate::layer::Layer;

/// Which layers take part in flattening.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FlattenOptions {
    /// Skip hidden layers, including those inside hidden groups
    pub only_visible_layers: bool,
    pub include_background_layer: bool,
    pub include_reference_layers: bool,
    pub include_tilemap_layers: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            only_visible_layers: true,
            include_background_layer: true,
            include_reference_layers: false,
            include_tilemap_layers: true,
        }
    }
}

impl FlattenOptions {
    fn includes(&self, document: &Document, index: usize, layer: &Layer) -> bool {
        if layer.is_group() {
            return false;
        }
        if self.only_visible_layers && !document.is_layer_visible(index) {
            return false;
        }
        if !self.include_background_layer && layer.is_background() {
            return false;
        }
        if !self.include_reference_layers && layer.is_reference() {
            return false;
        }
        self.include_tilemap_layers || layer.tileset_id().is_none()
    }
}

/// Composites the cels of `frame` in order onto a transparent canvas.
pub(crate) fn flatten(document: &Document, frame: &Frame, options: &FlattenOptions) -> Image {
    let mut canvas = Image::new(document.width(), document.height());
    for cel in &frame.cels {
        let Some(layer) = document.layers.get(cel.layer) else {
            continue;
        };
        if !options.includes(document, cel.layer, layer) {
            trace!("skipping cel on layer {:?}", layer.name);
            continue;
        }
        let cel = document.resolve_cel(cel);
        let image = match &cel.content {
            CelContent::Image(image) => Cow::Borrowed(image),
            CelContent::Tilemap(tilemap) => match document.tileset_for_layer(layer) {
                Some(tileset) if tileset.has_embedded_tiles() => Cow::Owned(tilemap.render(tileset)),
                _ => {
                    warn!("no tiles to draw the tilemap on layer {:?}", layer.name);
                    continue;
                }
            },
            CelContent::Linked { .. } => continue,
        };
        let opacity = mul_un8(cel.opacity, layer.opacity);
        trace!(
            "drawing {}x{} at ({}, {}) on layer {:?}, opacity {opacity}",
            image.width,
            image.height,
            cel.x,
            cel.y,
            layer.name
        );
        draw(&mut canvas, &image, cel.x, cel.y, layer.blend_mode, opacity);
    }
    canvas
}

/// Blends `src` onto `dst` with its top left corner at (`x`, `y`).
/// Pixels landing outside `dst` are dropped.
fn draw(dst: &mut Image, src: &Image, x: i32, y: i32, mode: BlendMode, opacity: u8) {
    if src.width == 0 {
        return;
    }
    let (dst_w, dst_h) = (i64::from(dst.width), i64::from(dst.height));
    for (row, line) in src.pixels.chunks_exact(src.width as usize).enumerate() {
        let dy = i64::from(y) + row as i64;
        if dy < 0 || dy >= dst_h {
            continue;
        }
        for (col, &color) in line.iter().enumerate() {
            let dx = i64::from(x) + col as i64;
            if dx < 0 || dx >= dst_w {
                continue;
            }
            let index = (dy * dst_w + dx) as usize;
            dst.pixels[index] = mode.blend(dst.pixels[index], color, opacity);
        }
    }
}
