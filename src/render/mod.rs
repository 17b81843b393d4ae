pub mod canvas;
pub mod text;

use crate::error::Result;
use canvas::create_canvas;

const BACKGROUND: &str = "#000000";
const TEXT_COLOR: &str = "#ffffff";

/// Render a metric readout: a large centered number with a small caption
/// near the bottom edge. Returns raw RGBA bytes, `size` x `size`.
pub fn render_metric(value: f32, label: &str, size: u32) -> Result<Vec<u8>> {
    let mut pm = create_canvas(size, BACKGROUND)?;

    let number = format!("{value:.0}");
    let number_size = size as f32 * (48.0 / 72.0);
    let label_size = size as f32 * (14.0 / 72.0);

    // Baselines match the original layout: number on the vertical midline,
    // caption at 7/8 of the key height.
    text::draw_centered_line(&mut pm, &number, TEXT_COLOR, number_size, size as f32 / 2.0)?;
    text::draw_centered_line(
        &mut pm,
        label,
        TEXT_COLOR,
        label_size,
        size as f32 * 7.0 / 8.0,
    )?;

    Ok(pm.data().to_vec())
}

/// Render a single centered caption for an action key.
pub fn render_label(label: &str, size: u32) -> Result<Vec<u8>> {
    let mut pm = create_canvas(size, BACKGROUND)?;

    let font_size = size as f32 * (14.0 / 72.0);
    let baseline = (size as f32 + font_size * 0.7) / 2.0;
    text::draw_centered_line(&mut pm, label, TEXT_COLOR, font_size, baseline)?;

    Ok(pm.data().to_vec())
}

/// Render a blank (black) key face.
pub fn render_blank(size: u32) -> Result<Vec<u8>> {
    let pm = create_canvas(size, BACKGROUND)?;
    Ok(pm.data().to_vec())
}
