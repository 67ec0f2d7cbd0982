use std::rc::{Rc, Weak};

use crate::controller::PrintError;
use crate::document::{DocumentKind, DocumentRenderer, NodeId, PrintTarget, SharedDocument};
use crate::geometry::Size;
use crate::job::PrintParameters;
use crate::layout::{
    calculate_print_params_for_css, render_params_in_desired_dpi, LayoutSource, RenderParams,
};
use crate::selection::selection_data_url;

/// View a preparation prints from.
enum PreparedView {
    /// The live document; its size and scroll position are restored.
    Attached(SharedDocument),
    /// A synthetic selection document; it is closed when printing ends.
    Owned(Box<dyn DocumentRenderer>),
    Released,
}

/// Handle to the "frame is ready" continuation of a preparation. It stops
/// resolving once the preparation that issued it is gone.
#[derive(Debug, Clone)]
pub struct ReadyToken(Weak<()>);

impl ReadyToken {
    pub fn is_cancelled(&self) -> bool {
        self.0.strong_count() == 0
    }
}

/// Per-job view state: puts the document in print mode and guarantees it is
/// restored (or the synthetic view disposed) when the preparation ends.
/// 單次列印作業的檢視狀態，結束時必定還原檢視或釋放合成文件。
pub struct FramePreparation {
    view: PreparedView,
    node: Option<NodeId>,
    render_params: RenderParams,
    prev_view_size: Size,
    prev_scroll_offset: Size,
    expected_page_count: u32,
    is_printing_started: bool,
    should_print_backgrounds: bool,
    height_inflation: f64,
    ready: Option<Rc<()>>,
}

impl FramePreparation {
    /// Computes the render parameters from the first page's declarations.
    ///
    /// A selection-only job on a node or plugin keeps `params` unchanged.
    pub fn new(
        document: SharedDocument,
        params: &PrintParameters,
        node: Option<NodeId>,
        ignore_css_margins: bool,
        height_inflation: f64,
    ) -> Self {
        let mut print_params = params.clone();
        {
            let mut view = document.borrow_mut();
            let kind = view.document_kind();
            let target = PrintTarget::new(kind, node);
            if !params.selection_only || !target.is_node_or_paginated_plugin() {
                let fit_to_page = ignore_css_margins && params.fits_to_printable_area();
                view.begin_pagination(&render_params_in_desired_dpi(params), node);
                let (css_params, _) = calculate_print_params_for_css(
                    &LayoutSource::new(&*view, kind),
                    0,
                    params,
                    ignore_css_margins,
                    fit_to_page,
                );
                view.end_pagination();
                print_params = css_params;
            }
        }

        Self {
            view: PreparedView::Attached(document),
            node,
            render_params: render_params_in_desired_dpi(&print_params),
            prev_view_size: Size::default(),
            prev_scroll_offset: Size::default(),
            expected_page_count: 0,
            is_printing_started: false,
            should_print_backgrounds: params.should_print_backgrounds,
            height_inflation,
            ready: None,
        }
    }

    pub fn render_params(&self) -> &RenderParams {
        &self.render_params
    }

    pub fn expected_page_count(&self) -> u32 {
        self.expected_page_count
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn owns_view(&self) -> bool {
        matches!(self.view, PreparedView::Owned(_))
    }

    pub fn document_kind(&self) -> Option<DocumentKind> {
        self.with_view(|view| view.document_kind())
    }

    pub(crate) fn with_document<R>(
        &mut self,
        f: impl FnOnce(&mut dyn DocumentRenderer) -> R,
    ) -> Option<R> {
        match &mut self.view {
            PreparedView::Attached(document) => {
                let mut view = document.borrow_mut();
                Some(f(&mut *view))
            }
            PreparedView::Owned(view) => Some(f(view.as_mut())),
            PreparedView::Released => None,
        }
    }

    fn with_view<R>(&self, f: impl FnOnce(&dyn DocumentRenderer) -> R) -> Option<R> {
        match &self.view {
            PreparedView::Attached(document) => Some(f(&*document.borrow())),
            PreparedView::Owned(view) => Some(f(view.as_ref())),
            PreparedView::Released => None,
        }
    }

    /// Lays the view out at the content width and an inflated content
    /// height, remembering the previous size and scroll offset.
    pub fn resize_for_printing(&mut self) {
        let content = self.render_params.content_area;
        let layout_size = Size::new(
            content.width,
            (f64::from(content.height) * self.height_inflation) as i32,
        );
        let saved = self.with_document(|view| {
            let saved = (view.viewport_size(), view.scroll_offset());
            view.resize_viewport(layout_size);
            saved
        });
        if let Some((size, offset)) = saved {
            self.prev_view_size = size;
            self.prev_scroll_offset = offset;
        }
    }

    pub fn restore_size(&mut self) {
        let (size, offset) = (self.prev_view_size, self.prev_scroll_offset);
        self.with_document(|view| {
            view.resize_viewport(size);
            view.set_scroll_offset(offset);
        });
    }

    /// Replaces the view with a synthetic document holding the serialized
    /// selection, with scripting and plugins disabled. Returns the token the
    /// caller resolves once that document has loaded.
    pub fn copy_selection(&mut self) -> Result<ReadyToken, PrintError> {
        self.resize_for_printing();
        let markup = self
            .with_document(|view| view.selection_as_markup())
            .ok_or(PrintError::RendererUnavailable)?;
        let url = selection_data_url(&markup);
        self.restore_size();

        let created = self.with_document(|view| {
            let mut settings = view.view_settings();
            settings.javascript_enabled = false;
            settings.plugins_enabled = false;
            view.create_view(&settings)
        });
        let Some(mut synthetic) = created.flatten() else {
            return Err(PrintError::RendererUnavailable);
        };

        log::debug!("loading selection document ({} bytes of markup)", markup.len());
        synthetic.load_url(&url);
        self.view = PreparedView::Owned(synthetic);
        self.node = None;
        Ok(self.arm_ready())
    }

    fn arm_ready(&mut self) -> ReadyToken {
        let ready = Rc::new(());
        let token = ReadyToken(Rc::downgrade(&ready));
        self.ready = Some(ready);
        token
    }

    /// Token of the pending ready continuation, if one is armed.
    pub fn ready_token(&self) -> Option<ReadyToken> {
        self.ready.as_ref().map(|ready| ReadyToken(Rc::downgrade(ready)))
    }

    /// Whether `token` was issued by this preparation and is still armed.
    pub fn accepts(&self, token: &ReadyToken) -> bool {
        match (&self.ready, token.0.upgrade()) {
            (Some(ready), Some(issued)) => Rc::ptr_eq(ready, &issued),
            _ => false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.with_view(|view| view.is_loading()).unwrap_or(false)
    }

    /// Resizes the view and begins pagination, recording the page count.
    pub fn start_printing(&mut self) {
        self.resize_for_printing();
        let backgrounds = self.should_print_backgrounds;
        let params = self.render_params;
        let node = self.node;
        let count = self.with_document(|view| {
            view.set_print_backgrounds(backgrounds);
            view.begin_pagination(&params, node)
        });
        self.expected_page_count = count.unwrap_or(0);
        self.is_printing_started = count.is_some();
    }

    /// Page count without entering print mode, for renderers that support it.
    pub fn compute_layout_and_count(&mut self) -> Option<u32> {
        let params = self.render_params;
        let node = self.node;
        self.with_document(|view| view.compute_layout_and_count(&params, node))
            .flatten()
    }

    /// Ends pagination and restores or disposes the view. Safe to call more
    /// than once.
    pub fn finish_printing(&mut self) {
        let view = std::mem::replace(&mut self.view, PreparedView::Released);
        match view {
            PreparedView::Attached(document) => {
                if self.is_printing_started {
                    let mut view = document.borrow_mut();
                    view.end_pagination();
                    view.set_print_backgrounds(false);
                    view.resize_viewport(self.prev_view_size);
                    view.set_scroll_offset(self.prev_scroll_offset);
                }
            }
            PreparedView::Owned(mut view) => {
                if self.is_printing_started {
                    view.end_pagination();
                }
                if view.is_loading() {
                    log::warn!("closing selection document before it finished loading");
                }
                view.close();
            }
            PreparedView::Released => {}
        }
        self.is_printing_started = false;
        self.ready = None;
    }
}

impl Drop for FramePreparation {
    fn drop(&mut self) {
        self.finish_printing();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::display::PageSurface;
    use crate::document::{PageLayoutHints, PageLayoutQuery, ViewSettings};
    use crate::job::{letter_at_72_dpi, ScalingOption};

    #[derive(Default)]
    struct Journal {
        events: Vec<String>,
    }

    type SharedJournal = Rc<RefCell<Journal>>;

    struct Page {
        journal: SharedJournal,
        name: &'static str,
        viewport: Size,
        scroll: Size,
        hints: Option<PageLayoutHints>,
        can_create_views: bool,
        loaded_url: Option<String>,
    }

    impl Page {
        fn new(journal: &SharedJournal, name: &'static str) -> Self {
            Self {
                journal: journal.clone(),
                name,
                viewport: Size::new(800, 600),
                scroll: Size::new(0, 120),
                hints: None,
                can_create_views: true,
                loaded_url: None,
            }
        }

        fn log(&self, event: impl Into<String>) {
            self.journal
                .borrow_mut()
                .events
                .push(format!("{}:{}", self.name, event.into()));
        }
    }

    impl PageLayoutQuery for Page {
        fn page_layout_hints(&self, _page_index: u32) -> Option<PageLayoutHints> {
            self.hints
        }
    }

    impl DocumentRenderer for Page {
        fn document_kind(&self) -> DocumentKind {
            DocumentKind::HtmlDocument
        }
        fn contains_node(&self, _node: NodeId) -> bool {
            true
        }
        fn begin_pagination(&mut self, params: &RenderParams, _node: Option<NodeId>) -> u32 {
            self.log(format!("begin {}x{}", params.content_area.width, params.content_area.height));
            3
        }
        fn end_pagination(&mut self) {
            self.log("end");
        }
        fn rasterize_page(&mut self, _page_number: u32, _surface: &mut dyn PageSurface) -> f32 {
            1.0
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
            self.log(format!("backgrounds {enabled}"));
        }
        fn has_selection(&self) -> bool {
            true
        }
        fn selection_as_markup(&self) -> String {
            "<b>picked</b>".into()
        }
        fn view_settings(&self) -> ViewSettings {
            ViewSettings::default()
        }
        fn create_view(&mut self, settings: &ViewSettings) -> Option<Box<dyn DocumentRenderer>> {
            if !self.can_create_views {
                return None;
            }
            self.log(format!(
                "create js={} plugins={}",
                settings.javascript_enabled, settings.plugins_enabled
            ));
            Some(Box::new(Page::new(&self.journal, "copy")))
        }
        fn load_url(&mut self, url: &str) {
            self.loaded_url = Some(url.to_string());
            self.log(format!("load {url}"));
        }
        fn is_loading(&self) -> bool {
            false
        }
        fn close(&mut self) {
            self.log("close");
        }
    }

    fn shared(page: Page) -> SharedDocument {
        Rc::new(RefCell::new(page))
    }

    fn events(journal: &SharedJournal) -> Vec<String> {
        journal.borrow().events.clone()
    }

    #[test]
    fn construction_runs_a_scratch_pagination_for_css() {
        let journal = SharedJournal::default();
        let document = shared(Page::new(&journal, "live"));
        let frame = FramePreparation::new(document, &letter_at_72_dpi(), None, false, 1.25);

        assert_eq!(events(&journal), vec!["live:begin 540x720", "live:end"]);
        assert_eq!(frame.render_params().content_area, Size::new(540, 720));
        assert_eq!(frame.expected_page_count(), 0);
    }

    #[test]
    fn first_page_declarations_shape_render_params() {
        let journal = SharedJournal::default();
        let mut page = Page::new(&journal, "live");
        page.hints = Some(PageLayoutHints {
            margin_top: Some(0),
            margin_right: Some(0),
            margin_bottom: Some(0),
            margin_left: Some(0),
            ..PageLayoutHints::default()
        });
        let frame = FramePreparation::new(shared(page), &letter_at_72_dpi(), None, false, 1.25);
        assert_eq!(frame.render_params().content_area, Size::new(612, 792));
    }

    #[test]
    fn printing_inflates_height_and_restores_on_drop() {
        let journal = SharedJournal::default();
        let document = shared(Page::new(&journal, "live"));
        let mut params = letter_at_72_dpi();
        params.should_print_backgrounds = true;
        {
            let mut frame =
                FramePreparation::new(document.clone(), &params, None, false, 1.25);
            frame.start_printing();
            assert_eq!(frame.expected_page_count(), 3);
            assert_eq!(document.borrow().viewport_size(), Size::new(540, 900));
        }
        assert_eq!(document.borrow().viewport_size(), Size::new(800, 600));
        assert_eq!(document.borrow().scroll_offset(), Size::new(0, 120));
        assert_eq!(
            events(&journal)[2..],
            [
                "live:backgrounds true",
                "live:begin 540x720",
                "live:end",
                "live:backgrounds false",
            ]
        );
    }

    #[test]
    fn finishing_twice_is_harmless() {
        let journal = SharedJournal::default();
        let document = shared(Page::new(&journal, "live"));
        let mut frame = FramePreparation::new(document, &letter_at_72_dpi(), None, false, 1.25);
        frame.start_printing();
        frame.finish_printing();
        frame.finish_printing();
        drop(frame);
        let ends = events(&journal).iter().filter(|e| *e == "live:end").count();
        assert_eq!(ends, 2);
    }

    #[test]
    fn selection_copy_owns_and_closes_a_scriptless_view() {
        let journal = SharedJournal::default();
        let document = shared(Page::new(&journal, "live"));
        let mut params = letter_at_72_dpi();
        params.selection_only = true;
        let mut frame = FramePreparation::new(document.clone(), &params, Some(NodeId(4)), false, 1.25);
        let token = frame.copy_selection().unwrap();

        assert!(frame.owns_view());
        assert!(frame.node().is_none());
        assert!(frame.accepts(&token));
        assert_eq!(document.borrow().viewport_size(), Size::new(800, 600));
        assert!(events(&journal).contains(&"live:create js=false plugins=false".to_string()));
        assert!(events(&journal).contains(
            &"copy:load data:text/html;charset=utf-8,%3Cb%3Epicked%3C%2Fb%3E".to_string()
        ));

        drop(frame);
        assert!(token.is_cancelled());
        assert_eq!(events(&journal).last().map(String::as_str), Some("copy:close"));
    }

    #[test]
    fn selection_copy_without_view_support_fails() {
        let journal = SharedJournal::default();
        let mut page = Page::new(&journal, "live");
        page.can_create_views = false;
        let mut params = letter_at_72_dpi();
        params.selection_only = true;
        let mut frame = FramePreparation::new(shared(page), &params, None, false, 1.25);
        assert_eq!(frame.copy_selection().unwrap_err(), PrintError::RendererUnavailable);
        assert!(!frame.owns_view());
    }

    #[test]
    fn tokens_from_other_preparations_are_refused() {
        let journal = SharedJournal::default();
        let document = shared(Page::new(&journal, "live"));
        let mut params = letter_at_72_dpi();
        params.selection_only = true;
        let mut first = FramePreparation::new(document.clone(), &params, None, false, 1.25);
        let stale = first.copy_selection().unwrap();
        drop(first);

        let mut second = FramePreparation::new(document, &params, None, false, 1.25);
        let fresh = second.copy_selection().unwrap();
        assert!(!second.accepts(&stale));
        assert!(second.accepts(&fresh));
        assert!(second.ready_token().is_some_and(|token| second.accepts(&token)));
    }

    #[test]
    fn fit_to_page_with_ignored_margins_keeps_device_page() {
        let journal = SharedJournal::default();
        let mut page = Page::new(&journal, "live");
        page.hints = Some(PageLayoutHints {
            page_size: Some(Size::new(2000, 2000)),
            ..PageLayoutHints::default()
        });
        let mut params = letter_at_72_dpi();
        params.scaling_option = ScalingOption::FitToPrintableArea;
        let frame = FramePreparation::new(shared(page), &params, None, true, 1.25);
        assert_eq!(frame.render_params().paper_size, Size::new(612, 792));
        assert_eq!(frame.render_params().content_area, Size::new(540, 720));
    }
}
