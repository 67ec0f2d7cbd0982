use crate::display::{Color, GlyphRun, PageSurface, Point};
use crate::document::DocumentRenderer;
use crate::geometry::{Rect, RectF};
use crate::layout::PageLayoutPoints;
use crate::template::RenderedHeaderFooter;

const HEADER_FOOTER_FONT_FAMILY: &str = "Helvetica";
const HEADER_FOOTER_FONT_SIZE_PT: f32 = 9.0;
const HEADER_FOOTER_COLOR: Color = Color::new(0.2, 0.2, 0.2, 1.0);

/// Saves the surface state on creation and restores it when dropped, so no
/// transform or clip leaks past the scope on any exit path.
/// 建立時保存繪圖狀態，釋放時還原。
pub struct SurfaceScope<'a> {
    surface: &'a mut dyn PageSurface,
}

impl<'a> SurfaceScope<'a> {
    pub fn new(surface: &'a mut dyn PageSurface) -> Self {
        surface.save();
        Self { surface }
    }

    pub fn surface(&mut self) -> &mut (dyn PageSurface + 'a) {
        &mut *self.surface
    }
}

impl Drop for SurfaceScope<'_> {
    fn drop(&mut self) {
        self.surface.restore();
    }
}

/// Renders one page of `document` onto `surface` and returns the renderer's
/// pagination progress.
/// 將文件的單一頁面繪製到 `surface`，並回傳分頁進度。
///
/// When the canvas covers more than the content area (header and footer are
/// drawn around it), the origin moves to the content area and drawing is
/// clipped to it. Both are expressed in the renderer's unscaled space, hence
/// the division by `scale_factor`.
pub fn render_page_content(
    document: &mut dyn DocumentRenderer,
    page_number: u32,
    canvas_area: Rect,
    content_area: Rect,
    scale_factor: f64,
    surface: &mut dyn PageSurface,
) -> f32 {
    let mut scope = SurfaceScope::new(surface);
    if content_area != canvas_area {
        let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        scope.surface().translate(
            f64::from(content_area.x - canvas_area.x) / scale,
            f64::from(content_area.y - canvas_area.y) / scale,
        );
        let clip = RectF::new(
            f64::from(content_area.x) / scale,
            f64::from(content_area.y) / scale,
            f64::from(content_area.width) / scale,
            f64::from(content_area.height) / scale,
        );
        scope.surface().clip_rect(clip.round_out());
    }
    document.rasterize_page(page_number, scope.surface())
}

/// Draws the header into the top margin and the footer into the bottom margin
/// of a page described by `layout`.
pub fn draw_header_footer(
    surface: &mut dyn PageSurface,
    layout: &PageLayoutPoints,
    header: &RenderedHeaderFooter,
    footer: &RenderedHeaderFooter,
) {
    if header.is_empty() && footer.is_empty() {
        return;
    }

    let page_width = (layout.margin_left + layout.content_width + layout.margin_right) as f32;
    let page_height = (layout.margin_top + layout.content_height + layout.margin_bottom) as f32;
    let left = layout.margin_left as f32;
    let right = page_width - layout.margin_right as f32;
    let header_y = (layout.margin_top as f32 - HEADER_FOOTER_FONT_SIZE_PT) / 2.0;
    let footer_y = page_height - (layout.margin_bottom as f32 + HEADER_FOOTER_FONT_SIZE_PT) / 2.0;

    let mut scope = SurfaceScope::new(surface);
    for (line, y) in [(header, header_y.max(0.0)), (footer, footer_y)] {
        push_text(scope.surface(), &line.left, left, y);
        push_text(
            scope.surface(),
            &line.center,
            (page_width - estimate_text_width(&line.center)) / 2.0,
            y,
        );
        push_text(
            scope.surface(),
            &line.right,
            right - estimate_text_width(&line.right),
            y,
        );
    }
}

fn push_text(surface: &mut dyn PageSurface, text: &str, x: f32, y: f32) {
    if text.is_empty() {
        return;
    }
    surface.draw_glyph_run(GlyphRun {
        text: text.to_string(),
        font_family: HEADER_FOOTER_FONT_FAMILY.to_string(),
        font_size_pt: HEADER_FOOTER_FONT_SIZE_PT,
        position: Point { x, y },
        color: HEADER_FOOTER_COLOR,
    });
}

/// Rough advance width of `text` at the header/footer font size.
pub fn estimate_text_width(text: &str) -> f32 {
    (text.chars().count() as f32) * HEADER_FOOTER_FONT_SIZE_PT * 0.6
}
