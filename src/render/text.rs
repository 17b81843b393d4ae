use crate::error::{DeckError, Result};
use crate::render::canvas::parse_hex_color;
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use std::path::Path;
use std::sync::OnceLock;
use tiny_skia::Pixmap;

/// System fonts tried in order at first use.
const FONT_SEARCH_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
];

static FONT: OnceLock<FontVec> = OnceLock::new();

/// Resolve the render font, loading it from disk on first use.
///
/// # Errors
/// Returns `DeckError::Font` if no font file exists at any known path or the
/// file is not a parseable TTF.
pub fn font() -> Result<&'static FontVec> {
    if let Some(f) = FONT.get() {
        return Ok(f);
    }

    let path = FONT_SEARCH_PATHS
        .iter()
        .copied()
        .find(|p| Path::new(p).exists())
        .ok_or_else(|| DeckError::Font("no usable system TTF found".into()))?;

    let data = std::fs::read(path)?;
    let parsed = FontVec::try_from_vec(data).map_err(|e| DeckError::Font(e.to_string()))?;
    Ok(FONT.get_or_init(|| parsed))
}

/// Rasterize one horizontally-centered line of text onto a pixmap, with the
/// glyph baseline at `y_baseline`.
pub fn draw_centered_line(
    canvas: &mut Pixmap,
    text: &str,
    color_hex: &str,
    font_size: f32,
    y_baseline: f32,
) -> Result<()> {
    let font = font()?;

    let color = parse_hex_color(color_hex)?;
    let r = (color.red() * 255.0) as u8;
    let g = (color.green() * 255.0) as u8;
    let b = (color.blue() * 255.0) as u8;

    let scale = PxScale::from(font_size);
    let scaled_font = font.as_scaled(scale);

    let line_width = measure_line(&scaled_font, text);
    let x_offset = ((canvas.width() as f32 - line_width) / 2.0).max(1.0);

    let canvas_w = canvas.width() as i32;
    let canvas_h = canvas.height() as i32;
    let data = canvas.data_mut();

    let mut cursor_x = x_offset;
    let mut prev_glyph_id = None;

    for ch in text.chars() {
        let glyph_id = scaled_font.glyph_id(ch);

        if let Some(prev) = prev_glyph_id {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        if let Some(outlined) = scaled_font.outline_glyph(
            glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, y_baseline)),
        ) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x >= 0 && x < canvas_w && y >= 0 && y < canvas_h {
                    let idx = (y * canvas_w + x) as usize * 4;
                    let alpha = (coverage * 255.0) as u8;
                    // Simple alpha blend.
                    let inv = 255 - alpha;
                    data[idx] =
                        ((r as u16 * alpha as u16 + data[idx] as u16 * inv as u16) / 255) as u8;
                    data[idx + 1] =
                        ((g as u16 * alpha as u16 + data[idx + 1] as u16 * inv as u16) / 255) as u8;
                    data[idx + 2] =
                        ((b as u16 * alpha as u16 + data[idx + 2] as u16 * inv as u16) / 255) as u8;
                    data[idx + 3] = 255;
                }
            });
        }

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph_id = Some(glyph_id);
    }

    Ok(())
}

fn measure_line(font: &ab_glyph::PxScaleFont<&FontVec>, text: &str) -> f32 {
    let mut width = 0.0f32;
    let mut prev = None;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev_id) = prev {
            width += font.kern(prev_id, glyph_id);
        }
        width += font.h_advance(glyph_id);
        prev = Some(glyph_id);
    }
    width
}
