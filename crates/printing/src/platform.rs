use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::display::PrintDisplayList;
use crate::geometry::{Rect, Size};
use crate::job::{DocumentCookie, MarginType, PrintParameters};

/// Payload of the interactive settings round-trip.
/// 互動式列印設定請求的內容。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedPrintRequest {
    pub cookie: DocumentCookie,
    pub has_selection: bool,
    pub expected_pages_count: u32,
    pub margin_type: MarginType,
    pub is_scripted: bool,
}

/// One rendered page as delivered to the host, geometry in points.
/// 交付給主機的已繪製頁面，幾何單位為點。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintedPage {
    pub cookie: DocumentCookie,
    pub page_number: u32,
    pub page_size: Size,
    pub content_area: Rect,
    pub canvas_area: Rect,
    pub scale_factor: f64,
    /// Pagination progress reported by the renderer for this page.
    pub progress: f32,
    pub display_list: PrintDisplayList,
}

/// Print host owning the dialog, the spooler and the output document.
/// 負責列印對話框、佇列與輸出文件的主機端介面。
///
/// `scripted_print` blocks until the user answers; hosts that need to keep
/// servicing their own queue do so inside the call.
pub trait PrintHost {
    type Error: fmt::Display;

    fn get_default_settings(&mut self) -> PrintParameters;

    /// Returns the user's settings, or `None` when the dialog failed.
    fn scripted_print(&mut self, request: &ScriptedPrintRequest) -> Option<PrintParameters>;

    fn did_get_printed_pages_count(&mut self, cookie: DocumentCookie, page_count: u32);

    fn did_print_page(&mut self, page: PrintedPage) -> Result<(), Self::Error>;

    fn printing_failed(&mut self, cookie: DocumentCookie);

    fn show_invalid_printer_settings_error(&mut self);

    /// The target view had no document to print.
    fn renderer_unavailable(&mut self);

    fn did_get_document_cookie(&mut self, cookie: DocumentCookie) {
        let _ = cookie;
    }

    fn did_show_print_dialog(&mut self) {}
}

/// Messages observed by [`RecordingHost`], in the order they were sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum HostMessage {
    GetDefaultSettings,
    DidGetDocumentCookie {
        cookie: DocumentCookie,
    },
    DidShowPrintDialog,
    ScriptedPrint(ScriptedPrintRequest),
    DidGetPrintedPagesCount {
        cookie: DocumentCookie,
        page_count: u32,
    },
    DidPrintPage {
        cookie: DocumentCookie,
        page_number: u32,
    },
    PrintingFailed {
        cookie: DocumentCookie,
    },
    ShowInvalidPrinterSettingsError,
    RendererUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host rejected page {0}")]
    PageRejected(u32),
}

/// In-memory host that answers from canned settings and records every
/// message. Used by tests and the command-line driver.
/// 以預設設定回應並記錄所有訊息的記憶體主機。
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    pub default_settings: PrintParameters,
    /// Answer to the settings dialog; `None` behaves like a cancelled dialog.
    pub user_settings: Option<PrintParameters>,
    /// Page number the host refuses to accept.
    pub reject_page: Option<u32>,
    pub messages: Vec<HostMessage>,
    pub pages: Vec<PrintedPage>,
}

impl RecordingHost {
    pub fn new(default_settings: PrintParameters) -> Self {
        Self {
            default_settings,
            ..Self::default()
        }
    }

    pub fn with_user_settings(mut self, settings: PrintParameters) -> Self {
        self.user_settings = Some(settings);
        self
    }

    pub fn printed_page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(|page| page.page_number).collect()
    }

    pub fn failure_notifications(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| matches!(message, HostMessage::PrintingFailed { .. }))
            .count()
    }
}

impl PrintHost for RecordingHost {
    type Error = HostError;

    fn get_default_settings(&mut self) -> PrintParameters {
        self.messages.push(HostMessage::GetDefaultSettings);
        self.default_settings.clone()
    }

    fn scripted_print(&mut self, request: &ScriptedPrintRequest) -> Option<PrintParameters> {
        self.messages.push(HostMessage::ScriptedPrint(*request));
        self.user_settings.clone()
    }

    fn did_get_printed_pages_count(&mut self, cookie: DocumentCookie, page_count: u32) {
        self.messages
            .push(HostMessage::DidGetPrintedPagesCount { cookie, page_count });
    }

    fn did_print_page(&mut self, page: PrintedPage) -> Result<(), Self::Error> {
        if self.reject_page == Some(page.page_number) {
            return Err(HostError::PageRejected(page.page_number));
        }
        self.messages.push(HostMessage::DidPrintPage {
            cookie: page.cookie,
            page_number: page.page_number,
        });
        self.pages.push(page);
        Ok(())
    }

    fn printing_failed(&mut self, cookie: DocumentCookie) {
        self.messages.push(HostMessage::PrintingFailed { cookie });
    }

    fn show_invalid_printer_settings_error(&mut self) {
        self.messages.push(HostMessage::ShowInvalidPrinterSettingsError);
    }

    fn renderer_unavailable(&mut self) {
        self.messages.push(HostMessage::RendererUnavailable);
    }

    fn did_get_document_cookie(&mut self, cookie: DocumentCookie) {
        self.messages.push(HostMessage::DidGetDocumentCookie { cookie });
    }

    fn did_show_print_dialog(&mut self) {
        self.messages.push(HostMessage::DidShowPrintDialog);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::letter_at_72_dpi;

    fn page(page_number: u32) -> PrintedPage {
        PrintedPage {
            cookie: DocumentCookie(7),
            page_number,
            page_size: Size::new(612, 792),
            content_area: Rect::new(36, 36, 540, 720),
            canvas_area: Rect::new(36, 36, 540, 720),
            scale_factor: 1.0,
            progress: 1.0,
            display_list: PrintDisplayList::default(),
        }
    }

    #[test]
    fn recording_host_captures_pages() {
        let mut host = RecordingHost::new(letter_at_72_dpi());
        assert_eq!(host.get_default_settings(), letter_at_72_dpi());
        host.did_print_page(page(0)).unwrap();
        host.did_print_page(page(1)).unwrap();

        assert_eq!(host.printed_page_numbers(), vec![0, 1]);
        assert_eq!(host.messages.len(), 3);
        assert_eq!(host.messages[0], HostMessage::GetDefaultSettings);
    }

    #[test]
    fn recording_host_rejects_configured_page() {
        let mut host = RecordingHost {
            reject_page: Some(1),
            ..RecordingHost::default()
        };
        host.did_print_page(page(0)).unwrap();
        assert_eq!(host.did_print_page(page(1)), Err(HostError::PageRejected(1)));
        assert_eq!(host.printed_page_numbers(), vec![0]);
    }

    #[test]
    fn cancelled_dialog_returns_nothing() {
        let mut host = RecordingHost::new(letter_at_72_dpi());
        let request = ScriptedPrintRequest {
            cookie: DocumentCookie(7),
            has_selection: false,
            expected_pages_count: 2,
            margin_type: MarginType::DefaultMargins,
            is_scripted: true,
        };
        assert!(host.scripted_print(&request).is_none());
        assert_eq!(host.messages, vec![HostMessage::ScriptedPrint(request)]);
    }

    #[test]
    fn messages_serialize_with_a_tag() {
        let value = serde_json::to_value(HostMessage::PrintingFailed {
            cookie: DocumentCookie(3),
        })
        .unwrap();
        assert_eq!(value["message"], "printing_failed");
        assert_eq!(value["cookie"], 3);
    }
}
