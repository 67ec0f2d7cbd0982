use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::display::PageSurface;
use crate::geometry::Size;
use crate::layout::RenderParams;

/// Identifies a node inside a document, for node-specific printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// What kind of document a print target renders.
/// 列印目標所呈現的文件種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    HtmlDocument,
    /// A full-frame plugin that paginates its own content (e.g. a PDF viewer).
    /// It declares no CSS page rules.
    PaginatedPlugin,
}

/// Target of one print job, resolved once from the document and the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintTarget {
    pub kind: DocumentKind,
    pub node: Option<NodeId>,
}

impl PrintTarget {
    pub const fn new(kind: DocumentKind, node: Option<NodeId>) -> Self {
        Self { kind, node }
    }

    /// Node prints and paginated plugins keep their own scaling and never
    /// get their selection copied.
    pub const fn is_node_or_paginated_plugin(&self) -> bool {
        self.node.is_some() || matches!(self.kind, DocumentKind::PaginatedPlugin)
    }
}

/// View preferences copied onto synthetic views created for printing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSettings {
    pub javascript_enabled: bool,
    pub plugins_enabled: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            javascript_enabled: true,
            plugins_enabled: true,
        }
    }
}

/// Page geometry a document declares for one page (CSS `@page`), in pixels.
/// Fields left as `None` keep the device-requested value.
/// 文件針對單一頁面宣告的版面（CSS `@page`），單位為像素。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageLayoutHints {
    #[serde(default)]
    pub page_size: Option<Size>,
    #[serde(default)]
    pub margin_top: Option<i32>,
    #[serde(default)]
    pub margin_right: Option<i32>,
    #[serde(default)]
    pub margin_bottom: Option<i32>,
    #[serde(default)]
    pub margin_left: Option<i32>,
}

/// Read-only access to per-page layout declarations.
pub trait PageLayoutQuery {
    /// Returns the declarations for `page_index`, or `None` when the
    /// document declares nothing for that page.
    fn page_layout_hints(&self, page_index: u32) -> Option<PageLayoutHints>;
}

/// Contract implemented by the layout/rendering engine that owns the live
/// document view.
/// 擁有即時文件檢視的版面／繪製引擎需實作的介面契約。
pub trait DocumentRenderer: PageLayoutQuery {
    fn document_kind(&self) -> DocumentKind;

    /// Whether a document is currently loaded in the view.
    fn has_document(&self) -> bool {
        true
    }

    fn contains_node(&self, node: NodeId) -> bool;

    /// Plugins may ask to be printed without any scaling.
    fn is_print_scaling_disabled(&self, node: Option<NodeId>) -> bool {
        let _ = node;
        false
    }

    /// Lays the document out for printing and returns its page count.
    fn begin_pagination(&mut self, params: &RenderParams, node: Option<NodeId>) -> u32;

    fn end_pagination(&mut self);

    /// Computes the page count without leaving the document in print mode.
    /// Renderers that cannot do this return `None`.
    fn compute_layout_and_count(
        &mut self,
        params: &RenderParams,
        node: Option<NodeId>,
    ) -> Option<u32> {
        let _ = (params, node);
        None
    }

    /// Draws `page_number` onto `surface`; returns the pagination progress.
    fn rasterize_page(&mut self, page_number: u32, surface: &mut dyn PageSurface) -> f32;

    fn viewport_size(&self) -> Size;

    fn resize_viewport(&mut self, size: Size);

    fn scroll_offset(&self) -> Size;

    fn set_scroll_offset(&mut self, offset: Size);

    fn set_print_backgrounds(&mut self, enabled: bool);

    fn has_selection(&self) -> bool;

    fn selection_as_markup(&self) -> String;

    fn view_settings(&self) -> ViewSettings;

    /// Creates a detached view with `settings`, owned by the caller.
    fn create_view(&mut self, settings: &ViewSettings) -> Option<Box<dyn DocumentRenderer>>;

    fn load_url(&mut self, url: &str);

    fn is_loading(&self) -> bool;

    /// Disposes a view returned by [`DocumentRenderer::create_view`].
    fn close(&mut self);
}

/// Live document view shared between its owner and the print controller.
pub type SharedDocument = Rc<RefCell<dyn DocumentRenderer>>;
