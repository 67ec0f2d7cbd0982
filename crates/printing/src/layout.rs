use serde::{Deserialize, Serialize};

use crate::document::{DocumentKind, PageLayoutHints, PageLayoutQuery};
use crate::geometry::{Rect, Size};
use crate::job::{PrintParameters, ScalingOption};
use crate::units::{convert_unit, PIXELS_PER_INCH, POINTS_PER_INCH};

/// Canonical, device-independent layout of one page in points (1/72").
/// 單一頁面與裝置無關的標準版面，單位為點（1/72 英吋）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageLayoutPoints {
    pub content_width: i32,
    pub content_height: i32,
    pub margin_top: i32,
    pub margin_right: i32,
    pub margin_bottom: i32,
    pub margin_left: i32,
}

/// Parameters handed to the document renderer when pagination begins, in the
/// job's desired DPI.
/// 開始分頁時交給文件繪製器的參數，以作業期望的 DPI 表示。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderParams {
    pub printer_dpi: i32,
    pub scaling_option: ScalingOption,
    pub content_area: Size,
    pub printable_area: Rect,
    pub paper_size: Size,
}

/// Where per-page layout declarations come from.
///
/// A source without a query stands for "no live document": resolution then
/// returns the device-requested parameters untouched.
pub struct LayoutSource<'a, Q: ?Sized> {
    query: Option<&'a Q>,
    kind: DocumentKind,
}

impl<Q: ?Sized> Clone for LayoutSource<'_, Q> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Q: ?Sized> Copy for LayoutSource<'_, Q> {}

impl<'a, Q: PageLayoutQuery + ?Sized> LayoutSource<'a, Q> {
    pub fn new(query: &'a Q, kind: DocumentKind) -> Self {
        Self {
            query: Some(query),
            kind,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    fn is_live(&self) -> bool {
        self.query.is_some()
    }

    fn detached(&self) -> Self {
        Self {
            query: None,
            kind: self.kind,
        }
    }

    fn hints(&self, page_index: u32) -> Option<PageLayoutHints> {
        match self.kind {
            DocumentKind::PaginatedPlugin => None,
            DocumentKind::HtmlDocument => self.query?.page_layout_hints(page_index),
        }
    }
}

/// Stand-in query for callers that have no document at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDocument;

impl PageLayoutQuery for NoDocument {
    fn page_layout_hints(&self, _page_index: u32) -> Option<PageLayoutHints> {
        None
    }
}

impl LayoutSource<'static, NoDocument> {
    pub fn without_document() -> Self {
        Self {
            query: None,
            kind: DocumentKind::HtmlDocument,
        }
    }
}

/// Merges the document's declarations for `page_index` into `page_params`.
///
/// Declarations producing a content area under one pixel are discarded and
/// the device parameters are used instead.
fn css_print_params<Q>(
    source: &LayoutSource<'_, Q>,
    page_index: u32,
    page_params: &PrintParameters,
) -> PrintParameters
where
    Q: PageLayoutQuery + ?Sized,
{
    if !source.is_live() {
        return page_params.clone();
    }

    let dpi = page_params.device_dpi();
    let to_pixels = |value: i32| convert_unit(value, dpi, PIXELS_PER_INCH);
    let from_pixels = |value: i32| convert_unit(value, PIXELS_PER_INCH, dpi);

    let default_page_size = Size::new(
        to_pixels(page_params.page_size.width),
        to_pixels(page_params.page_size.height),
    );
    let mut page_size = default_page_size;
    let mut margin_top = to_pixels(page_params.margin_top);
    let mut margin_right = to_pixels(page_params.margin_right());
    let mut margin_bottom = to_pixels(page_params.margin_bottom());
    let mut margin_left = to_pixels(page_params.margin_left);

    if let Some(hints) = source.hints(page_index) {
        page_size = hints.page_size.unwrap_or(page_size);
        margin_top = hints.margin_top.unwrap_or(margin_top);
        margin_right = hints.margin_right.unwrap_or(margin_right);
        margin_bottom = hints.margin_bottom.unwrap_or(margin_bottom);
        margin_left = hints.margin_left.unwrap_or(margin_left);
    }

    let content_width = page_size.width - margin_left - margin_right;
    let content_height = page_size.height - margin_top - margin_bottom;
    if content_width < 1 || content_height < 1 {
        log::warn!(
            "page {page_index} declares an empty content area ({content_width}x{content_height}px); using device settings"
        );
        return css_print_params(&source.detached(), page_index, page_params);
    }

    let mut css_params = page_params.clone();
    css_params.content_size = Size::new(from_pixels(content_width), from_pixels(content_height));
    // Unchanged page sizes keep the device value; the pixel round-trip would
    // only add rounding error.
    css_params.page_size = if page_size != default_page_size {
        Size::new(from_pixels(page_size.width), from_pixels(page_size.height))
    } else {
        page_params.page_size
    };
    css_params.margin_top = from_pixels(margin_top);
    css_params.margin_left = from_pixels(margin_left);
    css_params
}

/// Shrinks `params_to_fit` onto the page of `page_params`, centring it.
/// Returns the applied scale factor, which never exceeds 1.0.
pub fn fit_print_params_to_page(
    page_params: &PrintParameters,
    params_to_fit: &mut PrintParameters,
) -> f64 {
    if page_params.page_size == params_to_fit.page_size {
        return 1.0;
    }

    let default_width = page_params.page_size.width;
    let default_height = page_params.page_size.height;
    let css_width = params_to_fit.page_size.width;
    let css_height = params_to_fit.page_size.height;
    let mut content_width = f64::from(params_to_fit.content_size.width);
    let mut content_height = f64::from(params_to_fit.content_size.height);

    let mut scale_factor = 1.0;
    if default_width < css_width || default_height < css_height {
        let ratio_width = f64::from(default_width) / f64::from(css_width);
        let ratio_height = f64::from(default_height) / f64::from(css_height);
        scale_factor = ratio_width.min(ratio_height);
        content_width *= scale_factor;
        content_height *= scale_factor;
    }

    params_to_fit.margin_top = ((f64::from(default_height) - f64::from(css_height) * scale_factor)
        / 2.0
        + f64::from(params_to_fit.margin_top) * scale_factor) as i32;
    params_to_fit.margin_left = ((f64::from(default_width) - f64::from(css_width) * scale_factor)
        / 2.0
        + f64::from(params_to_fit.margin_left) * scale_factor) as i32;
    params_to_fit.content_size = Size::new(content_width as i32, content_height as i32);
    params_to_fit.page_size = page_params.page_size;
    scale_factor
}

/// Rotates `page_params` when its orientation disagrees with `css_params`.
pub fn ensure_orientation_matches(css_params: &PrintParameters, page_params: &mut PrintParameters) {
    if page_params.page_size.is_landscape() == css_params.page_size.is_landscape() {
        return;
    }

    page_params.page_size = page_params.page_size.transposed();
    page_params.content_size = page_params.content_size.transposed();
    let printable_size = page_params.printable_area.size().transposed();
    page_params.printable_area.set_size(printable_size);
}

/// Resolves the parameters for `page_index` from device settings and the
/// document's declarations.
/// 依裝置設定與文件宣告解析 `page_index` 的列印參數。
///
/// Returns the resolved parameters and the scale factor applied by
/// fit-to-page (1.0 when nothing was scaled).
pub fn calculate_print_params_for_css<Q>(
    source: &LayoutSource<'_, Q>,
    page_index: u32,
    page_params: &PrintParameters,
    ignore_css_margins: bool,
    fit_to_page: bool,
) -> (PrintParameters, f64)
where
    Q: PageLayoutQuery + ?Sized,
{
    let css_params = css_print_params(source, page_index, page_params);

    let mut params = page_params.clone();
    ensure_orientation_matches(&css_params, &mut params);

    if ignore_css_margins && fit_to_page {
        return (params, 1.0);
    }

    let mut result_params = css_params;
    if ignore_css_margins {
        result_params.margin_top = params.margin_top;
        result_params.margin_left = params.margin_left;

        // The declared page size stays, but the content area has to make
        // room for the device margins instead of the declared ones.
        let default_margin_right = params.margin_right();
        let default_margin_bottom = params.margin_bottom();
        result_params.content_size = Size::new(
            result_params.page_size.width - result_params.margin_left - default_margin_right,
            result_params.page_size.height - result_params.margin_top - default_margin_bottom,
        );
    }

    let mut scale_factor = 1.0;
    if fit_to_page {
        scale_factor = fit_print_params_to_page(&params, &mut result_params);
    }
    (result_params, scale_factor)
}

/// Converts resolved parameters to the points-based page layout.
pub fn page_layout_from_params(params: &PrintParameters) -> PageLayoutPoints {
    let dpi = params.device_dpi();
    let to_points = |value: i32| convert_unit(value, dpi, POINTS_PER_INCH);

    let page_width = to_points(params.page_size.width);
    let page_height = to_points(params.page_size.height);
    let content_width = to_points(params.content_size.width);
    let content_height = to_points(params.content_size.height);
    let margin_top = to_points(params.margin_top);
    let margin_left = to_points(params.margin_left);

    PageLayoutPoints {
        content_width,
        content_height,
        margin_top,
        margin_right: page_width - content_width - margin_left,
        margin_bottom: page_height - content_height - margin_top,
        margin_left,
    }
}

/// Resolves and converts the layout of `page_index` in one step, fitting to
/// the page when the job asks for [`ScalingOption::FitToPrintableArea`].
pub fn compute_page_layout_in_points_for_css<Q>(
    source: &LayoutSource<'_, Q>,
    page_index: u32,
    page_params: &PrintParameters,
    ignore_css_margins: bool,
) -> (PageLayoutPoints, f64)
where
    Q: PageLayoutQuery + ?Sized,
{
    let (params, scale_factor) = calculate_print_params_for_css(
        source,
        page_index,
        page_params,
        ignore_css_margins,
        page_params.fits_to_printable_area(),
    );
    (page_layout_from_params(&params), scale_factor)
}

/// Page size and content rectangle described by a points layout.
pub fn page_size_and_content_area(layout: &PageLayoutPoints) -> (Size, Rect) {
    let page_size = Size::new(
        layout.content_width + layout.margin_right + layout.margin_left,
        layout.content_height + layout.margin_top + layout.margin_bottom,
    );
    let content_area = Rect::new(
        layout.margin_left,
        layout.margin_top,
        layout.content_width,
        layout.content_height,
    );
    (page_size, content_area)
}

/// Converts device-unit parameters to the renderer's desired DPI.
pub fn render_params_in_desired_dpi(params: &PrintParameters) -> RenderParams {
    let dpi = params.device_dpi();
    let desired = params.desired_dpi.max(1);
    let convert = |value: i32| convert_unit(value, dpi.max(1), desired);

    RenderParams {
        printer_dpi: dpi,
        scaling_option: params.scaling_option,
        content_area: Size::new(
            convert(params.content_size.width),
            convert(params.content_size.height),
        ),
        printable_area: Rect::new(
            convert(params.printable_area.x),
            convert(params.printable_area.y),
            convert(params.printable_area.width),
            convert(params.printable_area.height),
        ),
        paper_size: Size::new(
            convert(params.page_size.width),
            convert(params.page_size.height),
        ),
    }
}
