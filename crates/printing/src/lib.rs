//! Print layout and pagination engine: resolves per-page geometry against a
//! document's own page rules and drives print jobs through their lifecycle.

pub mod config;
pub mod controller;
pub mod display;
pub mod document;
pub mod frame;
pub mod geometry;
pub mod job;
pub mod layout;
pub mod platform;
pub mod render;
pub mod selection;
pub mod template;
pub mod units;

pub use config::{ConfigError, PageCountStrategy, PrintConfig};
pub use controller::{JobOutcome, PrintController, PrintError, RequestError, SessionPhase};
pub use display::{Color, DisplayCommand, GlyphRun, PageSurface, Point, PrintDisplayList, Rectangle};
pub use document::{
    DocumentKind, DocumentRenderer, NodeId, PageLayoutHints, PageLayoutQuery, PrintTarget,
    SharedDocument, ViewSettings,
};
pub use frame::{FramePreparation, ReadyToken};
pub use geometry::{Rect, RectF, Size};
pub use job::{
    DocumentCookie, HeaderFooterInfo, MarginType, MarginTypeError, PrintParameters, PrintRequest,
    ScalingOption, MIN_DPI,
};
pub use layout::{
    calculate_print_params_for_css, compute_page_layout_in_points_for_css,
    ensure_orientation_matches, fit_print_params_to_page, page_layout_from_params,
    page_size_and_content_area, render_params_in_desired_dpi, LayoutSource, NoDocument,
    PageLayoutPoints, RenderParams,
};
pub use platform::{
    HostError, HostMessage, PrintHost, PrintedPage, RecordingHost, ScriptedPrintRequest,
};
pub use render::{draw_header_footer, render_page_content, SurfaceScope};
pub use selection::{decode_data_url, escape_query_param_value, selection_data_url};
pub use template::{
    HeaderFooterContext, HeaderFooterTemplate, RenderedHeaderFooter, TemplateError,
    TemplateSegment, TemplateToken,
};
pub use units::{convert_unit, DeviceUnits, PIXELS_PER_INCH, POINTS_PER_INCH};
