use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Rect, Size};
use crate::units::DeviceUnits;

/// Printer resolutions at or below this value are rejected as invalid.
pub const MIN_DPI: f64 = 1.0;

/// Opaque identifier the host assigns to a print job. Zero means "no job".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentCookie(pub i32);

impl DocumentCookie {
    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for DocumentCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "print-job-{}", self.0)
    }
}

/// How document content is scaled onto the device page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingOption {
    #[default]
    SourceSize,
    FitToPrintableArea,
}

/// Margin source selected by the user or the host, carried as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum MarginType {
    /// Margins declared by the document win.
    #[default]
    DefaultMargins,
    NoMargins,
    PrintableAreaMargins,
    CustomMargins,
}

/// Raised when an integer does not name a margin type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown margin type {0}")]
pub struct MarginTypeError(pub i32);

impl TryFrom<i32> for MarginType {
    type Error = MarginTypeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MarginType::DefaultMargins),
            1 => Ok(MarginType::NoMargins),
            2 => Ok(MarginType::PrintableAreaMargins),
            3 => Ok(MarginType::CustomMargins),
            other => Err(MarginTypeError(other)),
        }
    }
}

impl From<MarginType> for i32 {
    fn from(value: MarginType) -> Self {
        match value {
            MarginType::DefaultMargins => 0,
            MarginType::NoMargins => 1,
            MarginType::PrintableAreaMargins => 2,
            MarginType::CustomMargins => 3,
        }
    }
}

/// Strings substituted into the page header and footer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeaderFooterInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub date: String,
}

/// Requested geometry and behavior for one print job, in device units.
///
/// The right and bottom margins are never stored; they are whatever remains
/// of the page once the content and the top/left margins are placed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrintParameters {
    pub page_size: Size,
    pub content_size: Size,
    pub printable_area: Rect,
    pub margin_top: i32,
    pub margin_left: i32,
    pub dpi: f64,
    pub desired_dpi: i32,
    #[serde(default)]
    pub device_units: DeviceUnits,
    #[serde(default)]
    pub scaling_option: ScalingOption,
    #[serde(default)]
    pub margin_type: MarginType,
    pub document_cookie: DocumentCookie,
    #[serde(default)]
    pub selection_only: bool,
    #[serde(default)]
    pub should_print_backgrounds: bool,
    /// Zero-based page indices to print; empty prints every page.
    #[serde(default)]
    pub pages: Vec<u32>,
    #[serde(default)]
    pub header_footer: Option<HeaderFooterInfo>,
}

impl PrintParameters {
    /// Whether the host returned usable settings.
    pub fn is_valid(&self) -> bool {
        !self.content_size.is_empty()
            && !self.page_size.is_empty()
            && !self.printable_area.is_empty()
            && self.document_cookie.is_valid()
            && self.desired_dpi > 0
            && self.dpi > MIN_DPI
            && self.margin_top >= 0
            && self.margin_left >= 0
    }

    /// DPI that page, content and margin values are expressed in.
    pub fn device_dpi(&self) -> i32 {
        self.device_units.resolve(self.dpi)
    }

    pub fn margin_right(&self) -> i32 {
        self.page_size.width - self.content_size.width - self.margin_left
    }

    pub fn margin_bottom(&self) -> i32 {
        self.page_size.height - self.content_size.height - self.margin_top
    }

    /// Document-declared margins are ignored for every margin type except
    /// [`MarginType::DefaultMargins`].
    pub fn ignores_css_margins(&self) -> bool {
        self.margin_type != MarginType::DefaultMargins
    }

    pub fn fits_to_printable_area(&self) -> bool {
        self.scaling_option == ScalingOption::FitToPrintableArea
    }
}

/// Options supplied by whoever asks for a print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrintRequest {
    /// Skip the interactive settings round-trip and use the device defaults.
    pub silent: bool,
    pub print_background: bool,
    /// Issued by document script rather than by the user or the host.
    pub is_scripted: bool,
}

impl PrintRequest {
    /// Request issued by document script: interactive, no backgrounds.
    pub const fn scripted() -> Self {
        Self {
            silent: false,
            print_background: false,
            is_scripted: true,
        }
    }

    /// Interactive request from the user, e.g. a context menu.
    pub const fn interactive() -> Self {
        Self {
            silent: false,
            print_background: false,
            is_scripted: false,
        }
    }
}

#[cfg(test)]
pub(crate) fn letter_at_72_dpi() -> PrintParameters {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_are_invalid() {
        assert!(!PrintParameters::default().is_valid());
    }

    #[test]
    fn validity_requires_every_field() {
        let params = letter_at_72_dpi();
        assert!(params.is_valid());

        let mut zero_cookie = params.clone();
        zero_cookie.document_cookie = DocumentCookie(0);
        assert!(!zero_cookie.is_valid());

        let mut low_dpi = params.clone();
        low_dpi.dpi = MIN_DPI;
        assert!(!low_dpi.is_valid());

        let mut negative_margin = params.clone();
        negative_margin.margin_left = -1;
        assert!(!negative_margin.is_valid());

        let mut empty_area = params.clone();
        empty_area.printable_area = Rect::new(0, 0, 0, 756);
        assert!(!empty_area.is_valid());

        let mut no_desired_dpi = params;
        no_desired_dpi.desired_dpi = 0;
        assert!(!no_desired_dpi.is_valid());
    }

    #[test]
    fn right_and_bottom_margins_are_derived() {
        let mut params = letter_at_72_dpi();
        params.margin_left = 20;
        params.margin_top = 10;
        assert_eq!(params.margin_right(), 612 - 540 - 20);
        assert_eq!(params.margin_bottom(), 792 - 720 - 10);
    }

    #[test]
    fn margin_type_wire_values() {
        for (value, margin_type) in [
            (0, MarginType::DefaultMargins),
            (1, MarginType::NoMargins),
            (2, MarginType::PrintableAreaMargins),
            (3, MarginType::CustomMargins),
        ] {
            assert_eq!(MarginType::try_from(value), Ok(margin_type));
            assert_eq!(i32::from(margin_type), value);
        }
        assert_eq!(MarginType::try_from(4), Err(MarginTypeError(4)));
    }

    #[test]
    fn margin_type_serializes_as_integer() {
        let mut params = letter_at_72_dpi();
        params.margin_type = MarginType::PrintableAreaMargins;
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["margin_type"], 2);
        assert_eq!(value["document_cookie"], 7);

        let parsed: PrintParameters = serde_json::from_value(value).unwrap();
        assert!(parsed.ignores_css_margins());
    }

    #[test]
    fn points_device_units_ignore_printer_dpi() {
        let mut params = letter_at_72_dpi();
        params.dpi = 600.0;
        assert_eq!(params.device_dpi(), 600);
        params.device_units = DeviceUnits::Points;
        assert_eq!(params.device_dpi(), 72);
    }

    #[test]
    fn cookie_display() {
        assert_eq!(DocumentCookie(42).to_string(), "print-job-42");
    }
}
