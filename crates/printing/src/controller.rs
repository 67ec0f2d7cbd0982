use std::collections::VecDeque;

use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, PageCountStrategy, PrintConfig};
use crate::display::PrintDisplayList;
use crate::document::{NodeId, PrintTarget, SharedDocument};
use crate::frame::{FramePreparation, ReadyToken};
use crate::geometry::Rect;
use crate::job::{MarginType, PrintParameters, PrintRequest, ScalingOption};
use crate::layout::{
    compute_page_layout_in_points_for_css, page_size_and_content_area, LayoutSource,
};
use crate::platform::{PrintHost, PrintedPage, ScriptedPrintRequest};
use crate::render::{draw_header_footer, render_page_content};
use crate::template::{HeaderFooterContext, HeaderFooterTemplate};

/// Terminal failures of a print job.
/// 列印作業的終止性錯誤。
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum PrintError {
    #[error("printer settings are missing or incomplete")]
    InvalidSettings,
    #[error("document has no pages to print")]
    ZeroPages,
    #[error("none of the requested pages exist")]
    NoPagesInRange,
    #[error("print settings dialog was declined")]
    UserCancelled,
    #[error("print host reported a failure")]
    HostReportedFailure,
    #[error("no document is available to print")]
    RendererUnavailable,
    #[error("host refused page {page}: {reason}")]
    PageDelivery { page: u32, reason: String },
}

impl PrintError {
    /// Failures the host learns about through the generic failure message.
    fn reports_generic_failure(&self) -> bool {
        matches!(
            self,
            PrintError::ZeroPages | PrintError::NoPagesInRange | PrintError::PageDelivery { .. }
        )
    }
}

/// Reasons a print request is refused before any job starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("a print job is already in progress")]
    Busy,
    #[error("node does not belong to a live document")]
    InvalidNode,
}

/// Lifecycle phases of a print job.
/// 列印作業的生命週期階段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Preparing,
    SelectionCopying,
    Prepared,
    Rendering,
    Finished,
    Failed,
}

/// How the most recent job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Finished { pages_printed: u32 },
    Cancelled,
    Failed(PrintError),
}

enum PendingTask {
    FramePrepared(ReadyToken),
}

/// Where a job stands once the synchronous part of a request returns.
enum Progress {
    AwaitingSelection,
    Printed(u32),
}

struct PrintSession {
    document: SharedDocument,
    target: PrintTarget,
    phase: SessionPhase,
    params: Option<PrintParameters>,
    ignore_css_margins: bool,
    frame: Option<FramePreparation>,
}

/// Drives print jobs against a document view and a print host, one job at
/// a time.
/// 針對文件檢視與列印主機驅動列印作業，一次僅處理一個作業。
///
/// Work that must not run inside a load notification is queued and executed
/// by [`PrintController::run_pending_tasks`].
pub struct PrintController<H: PrintHost> {
    host: H,
    config: PrintConfig,
    header_template: HeaderFooterTemplate,
    footer_template: HeaderFooterTemplate,
    session: Option<PrintSession>,
    tasks: VecDeque<PendingTask>,
    phase_history: Vec<SessionPhase>,
    last_outcome: Option<JobOutcome>,
}

impl<H: PrintHost> PrintController<H> {
    pub fn new(host: H, mut config: PrintConfig) -> Result<Self, ConfigError> {
        config.sanitize();
        let templates = config.templates()?;
        Ok(Self::with_templates(host, config, templates))
    }

    /// Uses [`PrintConfig::default`], whose templates are prebuilt.
    pub fn with_default_config(host: H) -> Self {
        let templates = (
            HeaderFooterTemplate::default_header(),
            HeaderFooterTemplate::default_footer(),
        );
        Self::with_templates(host, PrintConfig::default(), templates)
    }

    fn with_templates(
        host: H,
        config: PrintConfig,
        (header_template, footer_template): (HeaderFooterTemplate, HeaderFooterTemplate),
    ) -> Self {
        Self {
            host,
            config,
            header_template,
            footer_template,
            session: None,
            tasks: VecDeque::new(),
            phase_history: Vec::new(),
            last_outcome: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn config(&self) -> &PrintConfig {
        &self.config
    }

    /// Phase of the job in flight, `Idle` when there is none.
    pub fn phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map_or(SessionPhase::Idle, |session| session.phase)
    }

    /// Phases traversed by the most recent job, in order.
    pub fn phase_history(&self) -> &[SessionPhase] {
        &self.phase_history
    }

    pub fn last_outcome(&self) -> Option<&JobOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Prints the whole document, as asked for by the host.
    pub fn print_pages(
        &mut self,
        document: &SharedDocument,
        silent: bool,
        print_background: bool,
    ) -> Result<(), RequestError> {
        self.print(
            document,
            None,
            PrintRequest {
                silent,
                print_background,
                is_scripted: false,
            },
        )
    }

    /// Prints on behalf of document script; always asks the user.
    pub fn scripted_print(&mut self, document: &SharedDocument) -> Result<(), RequestError> {
        self.print(document, None, PrintRequest::scripted())
    }

    /// Prints a single node, e.g. from a context menu.
    pub fn print_node(
        &mut self,
        document: &SharedDocument,
        node: NodeId,
    ) -> Result<(), RequestError> {
        {
            let view = document.borrow();
            if !view.has_document() || !view.contains_node(node) {
                log::warn!("ignoring print request for unknown node {node:?}");
                return Err(RequestError::InvalidNode);
            }
        }
        self.print(document, Some(node), PrintRequest::interactive())
    }

    /// Starts a job. Job failures are reported through the host and
    /// [`PrintController::last_outcome`]; only refusals return an error.
    pub fn print(
        &mut self,
        document: &SharedDocument,
        node: Option<NodeId>,
        request: PrintRequest,
    ) -> Result<(), RequestError> {
        if self.session.is_some() {
            log::warn!("print request dropped: previous job still in progress");
            return Err(RequestError::Busy);
        }

        let kind = document.borrow().document_kind();
        self.phase_history.clear();
        self.last_outcome = None;
        self.session = Some(PrintSession {
            document: document.clone(),
            target: PrintTarget::new(kind, node),
            phase: SessionPhase::Idle,
            params: None,
            ignore_css_margins: false,
            frame: None,
        });
        self.enter(SessionPhase::Preparing);

        match self.begin_job(request) {
            Ok(Progress::AwaitingSelection) => {}
            Ok(Progress::Printed(pages)) => self.did_finish_printing(Ok(pages)),
            Err(error) => self.did_finish_printing(Err(error)),
        }
        Ok(())
    }

    /// The synthetic selection document finished loading. The job continues
    /// on the next [`PrintController::run_pending_tasks`] turn.
    pub fn did_stop_loading(&mut self) {
        let token = self
            .session
            .as_ref()
            .and_then(|session| session.frame.as_ref())
            .and_then(FramePreparation::ready_token);
        match token {
            Some(token) => self.tasks.push_back(PendingTask::FramePrepared(token)),
            None => log::warn!("load finished with no selection copy pending"),
        }
    }

    /// Runs the tasks queued before this call; tasks they queue wait for the
    /// next turn. Returns how many tasks did work.
    pub fn run_pending_tasks(&mut self) -> usize {
        let turn: Vec<PendingTask> = self.tasks.drain(..).collect();
        let mut ran = 0;
        for task in turn {
            match task {
                PendingTask::FramePrepared(token) => {
                    let current = self
                        .session
                        .as_ref()
                        .and_then(|session| session.frame.as_ref())
                        .is_some_and(|frame| frame.accepts(&token));
                    if !current {
                        log::debug!("dropping ready continuation of a finished job");
                        continue;
                    }
                    ran += 1;
                    self.on_frame_prepared_for_print_pages();
                }
            }
        }
        ran
    }

    /// Host acknowledgement that it finished (or failed) the job output.
    ///
    /// A success that arrives while a job is still in flight ends that job
    /// as cancelled, since none of its pages were delivered.
    pub fn on_printing_done(&mut self, success: bool) {
        if !success {
            log::error!("Failure in printing done");
        }
        if self.session.is_some() {
            let result = if success {
                Err(PrintError::UserCancelled)
            } else {
                Err(PrintError::HostReportedFailure)
            };
            self.did_finish_printing(result);
        } else if !success {
            self.last_outcome = Some(JobOutcome::Failed(PrintError::HostReportedFailure));
        }
    }

    fn enter(&mut self, phase: SessionPhase) {
        if let Some(session) = self.session.as_mut() {
            log::debug!("print session {:?} -> {:?}", session.phase, phase);
            session.phase = phase;
        }
        self.phase_history.push(phase);
    }

    fn begin_job(&mut self, request: PrintRequest) -> Result<Progress, PrintError> {
        let expected_page_count = self.calculate_number_of_pages()?;
        if expected_page_count == 0 {
            log::warn!("document reports no pages");
            return Err(PrintError::ZeroPages);
        }

        if !request.silent
            && !self.get_print_settings_from_user(expected_page_count, request.is_scripted)?
        {
            return Err(PrintError::UserCancelled);
        }

        let session = self.session_mut()?;
        let params = session.params.as_mut().ok_or(PrintError::InvalidSettings)?;
        params.should_print_backgrounds = request.print_background;
        self.render_pages_for_print()
    }

    fn session_mut(&mut self) -> Result<&mut PrintSession, PrintError> {
        self.session.as_mut().ok_or(PrintError::RendererUnavailable)
    }

    fn calculate_number_of_pages(&mut self) -> Result<u32, PrintError> {
        if !self.session_mut()?.document.borrow().has_document() {
            return Err(PrintError::RendererUnavailable);
        }

        self.init_print_settings()?;

        let inflation = self.config.layout_height_inflation;
        let strategy = self.config.page_count_strategy;
        let session = self.session_mut()?;
        let params = session.params.clone().ok_or(PrintError::InvalidSettings)?;
        let mut frame = FramePreparation::new(
            session.document.clone(),
            &params,
            session.target.node,
            session.ignore_css_margins,
            inflation,
        );

        if strategy == PageCountStrategy::SinglePass {
            if let Some(count) = frame.compute_layout_and_count() {
                return Ok(count);
            }
            log::debug!("renderer cannot count pages in one pass; paginating");
        }
        frame.start_printing();
        Ok(frame.expected_page_count())
    }

    fn init_print_settings(&mut self) -> Result<(), PrintError> {
        let mut settings = self.host.get_default_settings();
        settings.device_units = self.config.device_units;
        let valid = settings.is_valid();

        let session = self.session_mut()?;
        session.ignore_css_margins = false;
        settings.margin_type = MarginType::DefaultMargins;
        settings.pages.clear();
        settings.scaling_option = if session.target.is_node_or_paginated_plugin() {
            ScalingOption::SourceSize
        } else {
            ScalingOption::FitToPrintableArea
        };
        let cookie = settings.document_cookie;
        session.params = Some(settings);
        self.host.did_get_document_cookie(cookie);

        if valid {
            Ok(())
        } else {
            log::warn!("default printer settings are invalid");
            Err(PrintError::InvalidSettings)
        }
    }

    /// Asks the host for the user's settings. `Ok(false)` means the dialog
    /// gave no answer; an answer with incomplete geometry is an error.
    fn get_print_settings_from_user(
        &mut self,
        expected_pages_count: u32,
        is_scripted: bool,
    ) -> Result<bool, PrintError> {
        let session = self.session_mut()?;
        let target = session.target;
        let (has_selection, margin_type) = {
            let view = session.document.borrow();
            let margin_type = if target.is_node_or_paginated_plugin() {
                if view.is_print_scaling_disabled(target.node) {
                    MarginType::NoMargins
                } else {
                    MarginType::PrintableAreaMargins
                }
            } else {
                MarginType::DefaultMargins
            };
            (view.has_selection(), margin_type)
        };
        let current = session.params.take().ok_or(PrintError::InvalidSettings)?;
        let request = ScriptedPrintRequest {
            cookie: current.document_cookie,
            has_selection,
            expected_pages_count,
            margin_type,
            is_scripted,
        };

        self.host.did_show_print_dialog();
        let mut settings = self.host.scripted_print(&request).unwrap_or_default();
        settings.scaling_option = current.scaling_option;
        settings.device_units = self.config.device_units;
        let answered = settings.dpi != 0.0 || settings.document_cookie.is_valid();
        let valid = settings.is_valid();
        let cookie = settings.document_cookie;

        let session = self.session_mut()?;
        session.ignore_css_margins = settings.ignores_css_margins();
        session.params = Some(settings);
        self.host.did_get_document_cookie(cookie);
        if answered && !valid {
            log::warn!("print dialog returned incomplete settings");
            return Err(PrintError::InvalidSettings);
        }
        Ok(answered)
    }

    fn render_pages_for_print(&mut self) -> Result<Progress, PrintError> {
        let inflation = self.config.layout_height_inflation;
        let session = self.session_mut()?;
        let params = session.params.clone().ok_or(PrintError::InvalidSettings)?;
        let mut frame = FramePreparation::new(
            session.document.clone(),
            &params,
            session.target.node,
            session.ignore_css_margins,
            inflation,
        );

        if params.selection_only && !session.target.is_node_or_paginated_plugin() {
            frame.copy_selection()?;
            session.frame = Some(frame);
            self.enter(SessionPhase::SelectionCopying);
            return Ok(Progress::AwaitingSelection);
        }

        session.frame = Some(frame);
        self.enter(SessionPhase::Prepared);
        self.print_prepared_pages().map(Progress::Printed)
    }

    fn on_frame_prepared_for_print_pages(&mut self) {
        self.enter(SessionPhase::Prepared);
        let result = self.print_prepared_pages();
        self.did_finish_printing(result);
    }

    fn print_prepared_pages(&mut self) -> Result<u32, PrintError> {
        self.enter(SessionPhase::Rendering);
        let notify_page_count = self.config.notify_page_count;
        let session = self.session_mut()?;
        let cookie = session
            .params
            .as_ref()
            .map(|params| params.document_cookie)
            .unwrap_or_default();
        let frame = session.frame.as_mut().ok_or(PrintError::RendererUnavailable)?;
        frame.start_printing();
        let page_count = frame.expected_page_count();
        if page_count == 0 {
            log::error!("Can't print 0 pages.");
            return Err(PrintError::ZeroPages);
        }

        if notify_page_count {
            self.host.did_get_printed_pages_count(cookie, page_count);
        }
        self.print_pages_native(page_count)
    }

    fn print_pages_native(&mut self, page_count: u32) -> Result<u32, PrintError> {
        let session = self.session_mut()?;
        let params = session.params.as_ref().ok_or(PrintError::InvalidSettings)?;
        let printed_pages = select_pages(&params.pages, page_count);
        if printed_pages.is_empty() {
            log::error!("Printing failed: no requested page is below {page_count}");
            return Err(PrintError::NoPagesInRange);
        }

        for &page_number in &printed_pages {
            self.print_page_internal(page_number, page_count)?;
        }
        Ok(printed_pages.len() as u32)
    }

    fn print_page_internal(
        &mut self,
        page_number: u32,
        page_count: u32,
    ) -> Result<(), PrintError> {
        let Self {
            host,
            session,
            header_template,
            footer_template,
            ..
        } = self;
        let session = session.as_mut().ok_or(PrintError::RendererUnavailable)?;
        let params = session.params.as_ref().ok_or(PrintError::InvalidSettings)?;
        let ignore_css_margins = session.ignore_css_margins;
        let frame = session.frame.as_mut().ok_or(PrintError::RendererUnavailable)?;
        let kind = frame
            .document_kind()
            .ok_or(PrintError::RendererUnavailable)?;

        let page = frame
            .with_document(|document| {
                let (layout, scale_factor) = compute_page_layout_in_points_for_css(
                    &LayoutSource::new(&*document, kind),
                    page_number,
                    params,
                    ignore_css_margins,
                );
                let (page_size, content_area) = page_size_and_content_area(&layout);
                let canvas_area = if params.header_footer.is_some() {
                    Rect::from_size(page_size)
                } else {
                    content_area
                };

                let mut display_list = PrintDisplayList::default();
                if let Some(info) = &params.header_footer {
                    let context = HeaderFooterContext {
                        title: &info.title,
                        url: &info.url,
                        date: &info.date,
                        page_number: page_number + 1,
                        page_count,
                    };
                    draw_header_footer(
                        &mut display_list,
                        &layout,
                        &header_template.render(&context),
                        &footer_template.render(&context),
                    );
                }
                let progress = render_page_content(
                    document,
                    page_number,
                    canvas_area,
                    content_area,
                    scale_factor,
                    &mut display_list,
                );

                PrintedPage {
                    cookie: params.document_cookie,
                    page_number,
                    page_size,
                    content_area,
                    canvas_area,
                    scale_factor,
                    progress,
                    display_list,
                }
            })
            .ok_or(PrintError::RendererUnavailable)?;

        host.did_print_page(page)
            .map_err(|error| PrintError::PageDelivery {
                page: page_number,
                reason: error.to_string(),
            })
    }

    /// Ends the job in flight: releases the view, then reports the outcome.
    fn did_finish_printing(&mut self, result: Result<u32, PrintError>) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Some(mut frame) = session.frame.take() {
            frame.finish_printing();
        }
        let cookie = session
            .params
            .as_ref()
            .map(|params| params.document_cookie)
            .unwrap_or_default();

        let (phase, outcome) = match result {
            Ok(pages_printed) => (SessionPhase::Finished, JobOutcome::Finished { pages_printed }),
            Err(PrintError::UserCancelled) => {
                log::debug!("print settings declined; releasing job {cookie}");
                (SessionPhase::Failed, JobOutcome::Cancelled)
            }
            Err(error) => {
                log::error!("print job {cookie} failed: {error}");
                match &error {
                    PrintError::InvalidSettings => self.host.show_invalid_printer_settings_error(),
                    PrintError::RendererUnavailable => self.host.renderer_unavailable(),
                    other if other.reports_generic_failure() && session.params.is_some() => {
                        self.host.printing_failed(cookie)
                    }
                    _ => {}
                }
                (SessionPhase::Failed, JobOutcome::Failed(error))
            }
        };

        log::debug!("print session {:?} -> {:?}", session.phase, phase);
        self.phase_history.push(phase);
        self.last_outcome = Some(outcome);
    }
}

/// Pages to print: all of them, or the explicit list up to the first entry
/// past the end.
fn select_pages(requested: &[u32], page_count: u32) -> Vec<u32> {
    if requested.is_empty() {
        return (0..page_count).collect();
    }
    requested
        .iter()
        .copied()
        .take_while(|&page| page < page_count)
        .collect()
}
