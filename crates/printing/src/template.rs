use std::fmt::Write as _;

use thiserror::Error;

/// Tokens recognised by the header/footer parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateToken {
    Title,
    Url,
    Date,
    PageNumber,
    PageCount,
}

/// Template segments per alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSegment {
    Literal(String),
    Token(TemplateToken),
}

/// Parsed representation of a header/footer template.
///
/// `&l`, `&c` and `&r` switch the alignment slot; `&t`, `&u`, `&d`, `&p` and
/// `&P` insert the title, url, date, page number and page count; `&&` is a
/// literal ampersand.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderFooterTemplate {
    pub left: Vec<TemplateSegment>,
    pub center: Vec<TemplateSegment>,
    pub right: Vec<TemplateSegment>,
}

#[derive(Clone, Copy)]
enum Alignment {
    Left,
    Center,
    Right,
}

/// Source of the header used when no template is configured.
pub const DEFAULT_HEADER_TEMPLATE: &str = "&l&d&c&t";

/// Source of the footer used when no template is configured.
pub const DEFAULT_FOOTER_TEMPLATE: &str = "&l&u&r&p/&P";

impl HeaderFooterTemplate {
    /// Date on the left, title in the centre.
    pub fn default_header() -> Self {
        Self {
            left: vec![TemplateSegment::Token(TemplateToken::Date)],
            center: vec![TemplateSegment::Token(TemplateToken::Title)],
            right: Vec::new(),
        }
    }

    /// Url on the left, "page/count" on the right.
    pub fn default_footer() -> Self {
        Self {
            left: vec![TemplateSegment::Token(TemplateToken::Url)],
            center: Vec::new(),
            right: vec![
                TemplateSegment::Token(TemplateToken::PageNumber),
                TemplateSegment::Literal("/".into()),
                TemplateSegment::Token(TemplateToken::PageCount),
            ],
        }
    }

    pub fn parse(input: &str) -> Result<Self, TemplateError> {
        let mut alignment = Alignment::Left;
        let mut slots = Slots::default();
        let mut buffer = String::new();

        let mut chars = input.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch != '&' {
                buffer.push(ch);
                continue;
            }

            let Some(next) = chars.peek().copied() else {
                buffer.push('&');
                break;
            };
            chars.next();

            let token = match next {
                '&' => {
                    buffer.push('&');
                    continue;
                }
                'l' | 'L' | 'c' | 'C' | 'r' | 'R' => {
                    slots.flush(&mut buffer, alignment);
                    alignment = match next {
                        'l' | 'L' => Alignment::Left,
                        'c' | 'C' => Alignment::Center,
                        _ => Alignment::Right,
                    };
                    continue;
                }
                't' | 'T' => TemplateToken::Title,
                'u' | 'U' => TemplateToken::Url,
                'd' | 'D' => TemplateToken::Date,
                'p' => TemplateToken::PageNumber,
                'P' => TemplateToken::PageCount,
                other => return Err(TemplateError::UnknownToken(other)),
            };
            slots.flush(&mut buffer, alignment);
            slots.push(TemplateSegment::Token(token), alignment);
        }

        slots.flush(&mut buffer, alignment);

        Ok(Self {
            left: slots.left,
            center: slots.center,
            right: slots.right,
        })
    }

    pub fn render(&self, context: &HeaderFooterContext<'_>) -> RenderedHeaderFooter {
        RenderedHeaderFooter {
            left: render_segments(&self.left, context),
            center: render_segments(&self.center, context),
            right: render_segments(&self.right, context),
        }
    }
}

#[derive(Default)]
struct Slots {
    left: Vec<TemplateSegment>,
    center: Vec<TemplateSegment>,
    right: Vec<TemplateSegment>,
}

impl Slots {
    fn flush(&mut self, buffer: &mut String, alignment: Alignment) {
        if buffer.is_empty() {
            return;
        }
        self.push(TemplateSegment::Literal(std::mem::take(buffer)), alignment);
    }

    fn push(&mut self, segment: TemplateSegment, alignment: Alignment) {
        match alignment {
            Alignment::Left => self.left.push(segment),
            Alignment::Center => self.center.push(segment),
            Alignment::Right => self.right.push(segment),
        }
    }
}

fn render_segments(segments: &[TemplateSegment], context: &HeaderFooterContext<'_>) -> String {
    let mut output = String::new();
    for segment in segments {
        match segment {
            TemplateSegment::Literal(text) => output.push_str(text),
            TemplateSegment::Token(token) => token.append_to(&mut output, context),
        }
    }
    output
}

/// Runtime context for header/footer rendering.
#[derive(Debug, Clone, Default)]
pub struct HeaderFooterContext<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub date: &'a str,
    /// One-based page number as shown to the reader.
    pub page_number: u32,
    pub page_count: u32,
}

/// Rendered header/footer strings for each alignment slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedHeaderFooter {
    pub left: String,
    pub center: String,
    pub right: String,
}

impl RenderedHeaderFooter {
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.center.is_empty() && self.right.is_empty()
    }
}

/// Errors raised while parsing header/footer templates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown header/footer token '&{0}'")]
    UnknownToken(char),
}

impl TemplateToken {
    fn append_to(&self, buffer: &mut String, context: &HeaderFooterContext<'_>) {
        match self {
            TemplateToken::Title => buffer.push_str(context.title),
            TemplateToken::Url => buffer.push_str(context.url),
            TemplateToken::Date => buffer.push_str(context.date),
            TemplateToken::PageNumber => {
                let _ = write!(buffer, "{}", context.page_number);
            }
            TemplateToken::PageCount => {
                let _ = write!(buffer, "{}", context.page_count);
            }
        }
    }
}
