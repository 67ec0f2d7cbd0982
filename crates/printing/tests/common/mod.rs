#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use folio_printing::{
    decode_data_url, Color, DocumentCookie, DocumentKind, DocumentRenderer, GlyphRun, NodeId,
    PageLayoutHints, PageLayoutQuery, PageSurface, Point, PrintParameters, Rect, RenderParams,
    SharedDocument, Size, ViewSettings,
};

pub type Journal = Rc<RefCell<Vec<String>>>;

/// Scripted document view that logs every call it receives.
pub struct FakeDocument {
    pub name: String,
    pub journal: Journal,
    pub kind: DocumentKind,
    pub page_count: u32,
    pub single_pass_count: Option<u32>,
    pub hints: HashMap<u32, PageLayoutHints>,
    pub viewport: Size,
    pub scroll: Size,
    pub selection: Option<String>,
    pub nodes: Vec<NodeId>,
    pub has_document: bool,
    pub print_scaling_disabled: bool,
    pub can_create_views: bool,
    pub settings: ViewSettings,
    pub loaded_markup: Option<String>,
    pub paginating: bool,
    pub print_backgrounds: bool,
    pub last_render_params: Option<RenderParams>,
}

impl FakeDocument {
    pub fn new(journal: &Journal, name: &str, page_count: u32) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            kind: DocumentKind::HtmlDocument,
            page_count,
            single_pass_count: None,
            hints: HashMap::new(),
            viewport: Size::new(1024, 768),
            scroll: Size::new(0, 300),
            selection: None,
            nodes: Vec::new(),
            has_document: true,
            print_scaling_disabled: false,
            can_create_views: true,
            settings: ViewSettings::default(),
            loaded_markup: None,
            paginating: false,
            print_backgrounds: false,
            last_render_params: None,
        }
    }

    pub fn shared(self) -> Rc<RefCell<FakeDocument>> {
        Rc::new(RefCell::new(self))
    }

    fn log(&self, event: impl AsRef<str>) {
        self.journal
            .borrow_mut()
            .push(format!("{}:{}", self.name, event.as_ref()));
    }
}

pub fn as_shared(document: &Rc<RefCell<FakeDocument>>) -> SharedDocument {
    document.clone()
}

pub fn events(journal: &Journal) -> Vec<String> {
    journal.borrow().clone()
}

impl PageLayoutQuery for FakeDocument {
    fn page_layout_hints(&self, page_index: u32) -> Option<PageLayoutHints> {
        self.hints.get(&page_index).copied()
    }
}

impl DocumentRenderer for FakeDocument {
    fn document_kind(&self) -> DocumentKind {
        self.kind
    }

    fn has_document(&self) -> bool {
        self.has_document
    }

    fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    fn is_print_scaling_disabled(&self, _node: Option<NodeId>) -> bool {
        self.print_scaling_disabled
    }

    fn begin_pagination(&mut self, params: &RenderParams, _node: Option<NodeId>) -> u32 {
        self.paginating = true;
        self.last_render_params = Some(*params);
        self.log("begin");
        self.page_count
    }

    fn end_pagination(&mut self) {
        self.paginating = false;
        self.log("end");
    }

    fn compute_layout_and_count(
        &mut self,
        _params: &RenderParams,
        _node: Option<NodeId>,
    ) -> Option<u32> {
        self.single_pass_count
    }

    fn rasterize_page(&mut self, page_number: u32, surface: &mut dyn PageSurface) -> f32 {
        self.log(format!("rasterize {page_number}"));
        surface.draw_glyph_run(GlyphRun {
            text: format!("{} page {}", self.name, page_number + 1),
            font_family: "Times".into(),
            font_size_pt: 12.0,
            position: Point { x: 0.0, y: 0.0 },
            color: Color::BLACK,
        });
        (page_number + 1) as f32 / self.page_count.max(1) as f32
    }

    fn viewport_size(&self) -> Size {
        self.viewport
    }

    fn resize_viewport(&mut self, size: Size) {
        self.viewport = size;
        self.log(format!("resize {}x{}", size.width, size.height));
    }

    fn scroll_offset(&self) -> Size {
        self.scroll
    }

    fn set_scroll_offset(&mut self, offset: Size) {
        self.scroll = offset;
    }

    fn set_print_backgrounds(&mut self, enabled: bool) {
        self.print_backgrounds = enabled;
    }

    fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    fn selection_as_markup(&self) -> String {
        self.selection.clone().unwrap_or_default()
    }

    fn view_settings(&self) -> ViewSettings {
        self.settings.clone()
    }

    fn create_view(&mut self, settings: &ViewSettings) -> Option<Box<dyn DocumentRenderer>> {
        if !self.can_create_views {
            return None;
        }
        self.log(format!(
            "create js={} plugins={}",
            settings.javascript_enabled, settings.plugins_enabled
        ));
        let mut view = FakeDocument::new(&self.journal, "selection", 1);
        view.settings = settings.clone();
        Some(Box::new(view))
    }

    fn load_url(&mut self, url: &str) {
        self.loaded_markup = decode_data_url(url);
        self.log(format!("load {url}"));
    }

    fn is_loading(&self) -> bool {
        false
    }

    fn close(&mut self) {
        self.log("close");
    }
}

/// US Letter at 72 DPI with half-inch margins.
pub fn letter() -> PrintParameters {
    PrintParameters {
        page_size: Size::new(612, 792),
        content_size: Size::new(540, 720),
        printable_area: Rect::new(18, 18, 576, 756),
        margin_top: 36,
        margin_left: 36,
        dpi: 72.0,
        desired_dpi: 72,
        document_cookie: DocumentCookie(7),
        ..PrintParameters::default()
    }
}
