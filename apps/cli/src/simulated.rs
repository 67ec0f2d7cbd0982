use std::collections::BTreeMap;

use folio_printing::display::Size as ExtentF;
use folio_printing::{
    decode_data_url, Color, DocumentKind, DocumentRenderer, GlyphRun, NodeId, PageLayoutHints,
    PageLayoutQuery, PageSurface, Point, PrintParameters, Rectangle, RenderParams, Size,
    ViewSettings,
};
use serde::Deserialize;

const BODY_FONT: &str = "Times";
const BODY_FONT_SIZE_PT: f32 = 12.0;
const BODY_LINE_HEIGHT_PT: f32 = 18.0;
const BACKGROUND: Color = Color::new(0.93, 0.95, 1.0, 1.0);

/// 模擬文件的描述。 / Description of a simulated document.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentSetup {
    pub kind: DocumentKind,
    pub title: String,
    pub page_count: u32,
    /// Body lines drawn under the heading of every page.
    pub lines_per_page: u32,
    /// Answer the single-pass page count query instead of declining it.
    pub single_pass: bool,
    pub hints: BTreeMap<u32, PageLayoutHints>,
    pub selection: Option<String>,
    pub nodes: Vec<NodeId>,
    pub print_scaling_disabled: bool,
    pub supports_views: bool,
    pub viewport: Size,
}

impl Default for DocumentSetup {
    fn default() -> Self {
        Self {
            kind: DocumentKind::HtmlDocument,
            title: "Untitled".to_string(),
            page_count: 1,
            lines_per_page: 3,
            single_pass: false,
            hints: BTreeMap::new(),
            selection: None,
            nodes: Vec::new(),
            print_scaling_disabled: false,
            supports_views: true,
            viewport: Size::new(1280, 800),
        }
    }
}

/// How the job is started.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum RequestSetup {
    Pages {
        #[serde(default = "default_silent")]
        silent: bool,
        #[serde(default)]
        print_background: bool,
    },
    Scripted,
    Node {
        node: NodeId,
    },
}

fn default_silent() -> bool {
    true
}

impl Default for RequestSetup {
    fn default() -> Self {
        RequestSetup::Pages {
            silent: true,
            print_background: false,
        }
    }
}

/// A complete print scenario read from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub document: DocumentSetup,
    pub default_settings: PrintParameters,
    /// Settings returned by the dialog; absent means the dialog is cancelled.
    #[serde(default)]
    pub user_settings: Option<PrintParameters>,
    #[serde(default)]
    pub reject_page: Option<u32>,
    #[serde(default)]
    pub request: RequestSetup,
}

/// Document view whose pages are generated from a [`DocumentSetup`].
pub struct SimulatedDocument {
    setup: DocumentSetup,
    viewport: Size,
    scroll: Size,
    paginating: bool,
    print_backgrounds: bool,
    render_params: Option<RenderParams>,
    settings: ViewSettings,
}

impl SimulatedDocument {
    pub fn new(setup: DocumentSetup) -> Self {
        let viewport = setup.viewport;
        Self {
            setup,
            viewport,
            scroll: Size::default(),
            paginating: false,
            print_backgrounds: false,
            render_params: None,
            settings: ViewSettings::default(),
        }
    }

    fn heading(&self, page_number: u32) -> String {
        format!("{} page {}", self.setup.title, page_number + 1)
    }
}

impl PageLayoutQuery for SimulatedDocument {
    fn page_layout_hints(&self, page_index: u32) -> Option<PageLayoutHints> {
        self.setup.hints.get(&page_index).copied()
    }
}

impl DocumentRenderer for SimulatedDocument {
    fn document_kind(&self) -> DocumentKind {
        self.setup.kind
    }

    fn contains_node(&self, node: NodeId) -> bool {
        self.setup.nodes.contains(&node)
    }

    fn is_print_scaling_disabled(&self, _node: Option<NodeId>) -> bool {
        self.setup.print_scaling_disabled
    }

    fn begin_pagination(&mut self, params: &RenderParams, node: Option<NodeId>) -> u32 {
        log::debug!(
            "simulated pagination at {}x{} (node {node:?})",
            params.content_area.width,
            params.content_area.height
        );
        self.paginating = true;
        self.render_params = Some(*params);
        self.setup.page_count
    }

    fn end_pagination(&mut self) {
        self.paginating = false;
    }

    fn compute_layout_and_count(
        &mut self,
        _params: &RenderParams,
        _node: Option<NodeId>,
    ) -> Option<u32> {
        self.setup.single_pass.then_some(self.setup.page_count)
    }

    fn rasterize_page(&mut self, page_number: u32, surface: &mut dyn PageSurface) -> f32 {
        if !self.paginating {
            log::warn!("rasterizing page {page_number} outside of pagination");
        }
        let content = self
            .render_params
            .map(|params| params.content_area)
            .unwrap_or(self.viewport);
        if self.print_backgrounds {
            surface.fill_rect(Rectangle {
                origin: Point { x: 0.0, y: 0.0 },
                size: ExtentF {
                    width: content.width as f32,
                    height: content.height as f32,
                },
                color: BACKGROUND,
            });
        }

        let mut lines = vec![self.heading(page_number)];
        lines.extend((1..=self.setup.lines_per_page).map(|line| format!("Line {line}")));
        for (index, text) in lines.into_iter().enumerate() {
            surface.draw_glyph_run(GlyphRun {
                text,
                font_family: BODY_FONT.to_string(),
                font_size_pt: BODY_FONT_SIZE_PT,
                position: Point {
                    x: 0.0,
                    y: index as f32 * BODY_LINE_HEIGHT_PT,
                },
                color: Color::BLACK,
            });
        }
        (page_number + 1) as f32 / self.setup.page_count.max(1) as f32
    }

    fn viewport_size(&self) -> Size {
        self.viewport
    }

    fn resize_viewport(&mut self, size: Size) {
        self.viewport = size;
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
        self.setup.selection.is_some()
    }

    fn selection_as_markup(&self) -> String {
        self.setup.selection.clone().unwrap_or_default()
    }

    fn view_settings(&self) -> ViewSettings {
        self.settings.clone()
    }

    fn create_view(&mut self, settings: &ViewSettings) -> Option<Box<dyn DocumentRenderer>> {
        if !self.setup.supports_views {
            return None;
        }
        let setup = DocumentSetup {
            kind: DocumentKind::HtmlDocument,
            title: "Selection".to_string(),
            page_count: 1,
            lines_per_page: 0,
            single_pass: false,
            hints: BTreeMap::new(),
            selection: None,
            nodes: Vec::new(),
            print_scaling_disabled: false,
            supports_views: false,
            viewport: self.viewport,
        };
        let mut view = SimulatedDocument::new(setup);
        view.settings = settings.clone();
        Some(Box::new(view))
    }

    fn load_url(&mut self, url: &str) {
        match decode_data_url(url) {
            Some(markup) => {
                self.setup.lines_per_page = markup.lines().count() as u32;
                self.setup.title = format!("Selection ({} bytes)", markup.len());
            }
            None => log::warn!("simulated view cannot load {url}"),
        }
    }

    fn is_loading(&self) -> bool {
        false
    }

    fn close(&mut self) {
        log::debug!("closing simulated view '{}'", self.setup.title);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_defaults_to_a_silent_page_print() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "default_settings": {
                    "page_size": { "width": 612, "height": 792 },
                    "content_size": { "width": 540, "height": 720 },
                    "printable_area": { "x": 18, "y": 18, "width": 576, "height": 756 },
                    "margin_top": 36,
                    "margin_left": 36,
                    "dpi": 72.0,
                    "desired_dpi": 72,
                    "document_cookie": 1
                }
            }"#,
        )
        .unwrap();
        assert!(matches!(
            scenario.request,
            RequestSetup::Pages {
                silent: true,
                print_background: false
            }
        ));
        assert_eq!(scenario.document.page_count, 1);
        assert!(scenario.user_settings.is_none());
    }

    #[test]
    fn hints_are_keyed_by_page_index() {
        let setup: DocumentSetup = serde_json::from_str(
            r#"{ "page_count": 2, "hints": { "1": { "margin_top": 0 } } }"#,
        )
        .unwrap();
        let document = SimulatedDocument::new(setup);
        assert!(document.page_layout_hints(0).is_none());
        assert_eq!(
            document.page_layout_hints(1).and_then(|hints| hints.margin_top),
            Some(0)
        );
    }

    #[test]
    fn synthetic_view_takes_its_lines_from_the_markup() {
        let mut document = SimulatedDocument::new(DocumentSetup::default());
        let mut view = document
            .create_view(&ViewSettings::default())
            .expect("views supported");
        view.load_url(&folio_printing::selection_data_url("<p>a</p>\n<p>b</p>"));
        let mut list = folio_printing::PrintDisplayList::default();
        view.rasterize_page(0, &mut list);
        assert_eq!(list.glyph_runs().count(), 3);
    }
}
