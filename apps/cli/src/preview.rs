use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use folio_printing::{Color, DisplayCommand, PrintedPage, Rect};
use image::{codecs::png::PngEncoder, ColorType, ImageBuffer, ImageEncoder, Rgba};

type Canvas = ImageBuffer<Rgba<u8>, Vec<u8>>;

const GUIDE_COLOR: Color = Color::new(0.9, 0.9, 0.9, 1.0);

/// Drawing state tracked while replaying a display list.
#[derive(Debug, Clone, Copy, Default)]
struct ReplayState {
    dx: f64,
    dy: f64,
    translated: bool,
    /// Clip in page points as (left, top, right, bottom).
    clip: Option<(f64, f64, f64, f64)>,
}

/// Maps display list coordinates of one printed page to page points.
///
/// Content is drawn in the renderer's unscaled space relative to the canvas;
/// header and footer runs recorded before the content scope use page points.
struct PageSpace {
    canvas: Rect,
    scale_factor: f64,
    header_footer: bool,
}

impl PageSpace {
    fn new(page: &PrintedPage) -> Self {
        Self {
            canvas: page.canvas_area,
            scale_factor: if page.scale_factor > 0.0 {
                page.scale_factor
            } else {
                1.0
            },
            header_footer: page.canvas_area != page.content_area,
        }
    }

    fn factor(&self, state: &ReplayState) -> f64 {
        if self.header_footer && !state.translated {
            1.0
        } else {
            self.scale_factor
        }
    }

    fn point(&self, state: &ReplayState, x: f64, y: f64) -> (f64, f64) {
        if self.header_footer && !state.translated {
            return (x, y);
        }
        (
            f64::from(self.canvas.x) + (state.dx + x) * self.scale_factor,
            f64::from(self.canvas.y) + (state.dy + y) * self.scale_factor,
        )
    }

    fn clip(&self, rect: Rect) -> (f64, f64, f64, f64) {
        let left = f64::from(self.canvas.x) + f64::from(rect.x) * self.scale_factor;
        let top = f64::from(self.canvas.y) + f64::from(rect.y) * self.scale_factor;
        (
            left,
            top,
            left + f64::from(rect.width) * self.scale_factor,
            top + f64::from(rect.height) * self.scale_factor,
        )
    }
}

/// 將單一列印頁面轉為 PNG 預覽。 / Rasterizes one printed page into a PNG preview.
///
/// Glyph runs are drawn as solid boxes of their estimated extent.
pub fn render_page_png(page: &PrintedPage, dpi: u32) -> Result<Vec<u8>> {
    let pixels_per_point = f64::from(dpi.max(1)) / 72.0;
    let width_px = (f64::from(page.page_size.width) * pixels_per_point).ceil().max(1.0) as u32;
    let height_px = (f64::from(page.page_size.height) * pixels_per_point)
        .ceil()
        .max(1.0) as u32;
    let mut canvas = ImageBuffer::from_pixel(width_px, height_px, Rgba([255, 255, 255, 255]));

    draw_margin_guides(&mut canvas, page.content_area, pixels_per_point);

    let space = PageSpace::new(page);
    let mut state = ReplayState::default();
    let mut saved = Vec::new();
    for command in &page.display_list.commands {
        match command {
            DisplayCommand::Save => saved.push(state),
            DisplayCommand::Restore => state = saved.pop().unwrap_or_default(),
            DisplayCommand::Translate { dx, dy } => {
                state.dx += dx;
                state.dy += dy;
                state.translated = true;
            }
            DisplayCommand::ClipRect(rect) => state.clip = Some(space.clip(*rect)),
            DisplayCommand::BackgroundRect(rect) => {
                let factor = space.factor(&state);
                let (x, y) = space.point(&state, f64::from(rect.origin.x), f64::from(rect.origin.y));
                let width = f64::from(rect.size.width) * factor;
                let height = f64::from(rect.size.height) * factor;
                fill_box(&mut canvas, &state, (x, y, width, height), pixels_per_point, rect.color);
            }
            DisplayCommand::GlyphRun(run) => {
                let factor = space.factor(&state);
                let font_size = f64::from(run.font_size_pt);
                let width = run.text.chars().count() as f64 * font_size * 0.6 * factor;
                let height = (font_size * 1.1).max(8.0) * factor;
                let (x, y) = space.point(&state, f64::from(run.position.x), f64::from(run.position.y));
                fill_box(&mut canvas, &state, (x, y, width, height), pixels_per_point, run.color);
            }
        }
    }

    let mut data = Vec::new();
    PngEncoder::new(&mut data)
        .write_image(canvas.as_raw(), width_px, height_px, ColorType::Rgba8)
        .context("encode preview png")?;
    Ok(data)
}

/// Writes `page-NNN.png` into `dir` and returns its path.
pub fn write_page_preview(page: &PrintedPage, dpi: u32, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create preview directory '{}'", dir.display()))?;
    let data = render_page_png(page, dpi)?;
    let path = dir.join(format!("page-{:03}.png", page.page_number + 1));
    fs::write(&path, data).with_context(|| format!("write preview '{}'", path.display()))?;
    Ok(path)
}

/// Fills a box given in page points, honouring the active clip.
fn fill_box(
    canvas: &mut Canvas,
    state: &ReplayState,
    (x, y, width, height): (f64, f64, f64, f64),
    pixels_per_point: f64,
    color: Color,
) {
    let (mut left, mut top, mut right, mut bottom) = (x, y, x + width.max(0.0), y + height.max(0.0));
    if let Some((clip_left, clip_top, clip_right, clip_bottom)) = state.clip {
        left = left.max(clip_left);
        top = top.max(clip_top);
        right = right.min(clip_right);
        bottom = bottom.min(clip_bottom);
    }
    let to_px = |value: f64| (value * pixels_per_point).round() as i32;
    fill_rect(
        canvas,
        to_px(left),
        to_px(top),
        to_px(right) - to_px(left),
        to_px(bottom) - to_px(top),
        color,
    );
}

fn fill_rect(buffer: &mut Canvas, x: i32, y: i32, width: i32, height: i32, color: Color) {
    if width <= 0 || height <= 0 {
        return;
    }
    let width_px = buffer.width() as i32;
    let height_px = buffer.height() as i32;
    let x0 = x.clamp(0, width_px);
    let y0 = y.clamp(0, height_px);
    let x1 = (x + width).clamp(0, width_px);
    let y1 = (y + height).clamp(0, height_px);
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    let rgba = color_to_rgba(color);
    for yy in y0..y1 {
        for xx in x0..x1 {
            buffer.put_pixel(xx as u32, yy as u32, rgba);
        }
    }
}

// Content area outline, for orientation only.
fn draw_margin_guides(buffer: &mut Canvas, content_area: Rect, pixels_per_point: f64) {
    let to_px = |value: i32| (f64::from(value) * pixels_per_point).round() as i32;
    let left = to_px(content_area.x);
    let right = to_px(content_area.x + content_area.width);
    let top = to_px(content_area.y);
    let bottom = to_px(content_area.y + content_area.height);
    let (width, height) = (buffer.width() as i32, buffer.height() as i32);
    fill_rect(buffer, left, 0, 1, height, GUIDE_COLOR);
    fill_rect(buffer, right, 0, 1, height, GUIDE_COLOR);
    fill_rect(buffer, 0, top, width, 1, GUIDE_COLOR);
    fill_rect(buffer, 0, bottom, width, 1, GUIDE_COLOR);
}

fn color_to_rgba(color: Color) -> Rgba<u8> {
    Rgba([
        clamp_to_u8(color.r),
        clamp_to_u8(color.g),
        clamp_to_u8(color.b),
        clamp_to_u8(color.a),
    ])
}

fn clamp_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
