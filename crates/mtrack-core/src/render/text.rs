//! Object id labels, drawn with the embedded DejaVu Sans font.

use std::sync::OnceLock;

use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

const FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Font height in pixels for one unit of `label_scale`.
const PX_PER_SCALE: f32 = 8.0;

fn font() -> Option<&'static FontRef<'static>> {
    static FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();
    FONT.get_or_init(|| match FontRef::try_from_slice(FONT_DATA) {
        Ok(font) => Some(font),
        Err(e) => {
            log::warn!("label font could not be loaded, ids will not be drawn: {}", e);
            None
        }
    })
    .as_ref()
}

fn label_px_scale(scale: u32) -> PxScale {
    PxScale::from(PX_PER_SCALE * scale.max(1) as f32)
}

/// Draw `text` with its ink box centered on `center`. Clipped at the image edges.
///
/// Glyphs are laid out on a baseline one ascent below `y`, so the vertical
/// offset is taken from the ascent rather than the line height.
pub fn draw_label(
    image: &mut RgbImage,
    text: &str,
    (cx, cy): (f64, f64),
    scale: u32,
    color: Rgb<u8>,
) {
    let Some(font) = font() else {
        return;
    };
    if text.is_empty() {
        return;
    }
    let px = label_px_scale(scale);
    let (w, h) = text_size(px, font, text);
    let ascent = font.as_scaled(px).ascent() as f64;
    let x = (cx - w as f64 / 2.0).round() as i32;
    let y = (cy - ascent + h as f64 / 2.0).round() as i32;
    draw_text_mut(image, color, x, y, px, font, text);
}
