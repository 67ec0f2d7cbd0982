use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Drawing target for one printed page, coordinates in points.
///
/// `save`/`restore` bracket transform and clip changes the same way a
/// canvas state stack does.
pub trait PageSurface {
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, dx: f64, dy: f64);
    /// Replaces the clip with `rect` in the current coordinate space.
    fn clip_rect(&mut self, rect: Rect);
    fn fill_rect(&mut self, rect: Rectangle);
    fn draw_glyph_run(&mut self, run: GlyphRun);
}

/// Recorded display list for one page; what the host receives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintDisplayList {
    pub commands: Vec<DisplayCommand>,
}

impl PrintDisplayList {
    /// Append a command to the display list.
    pub fn push(&mut self, command: DisplayCommand) {
        self.commands.push(command);
    }

    /// Returns true if the display list is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Glyph runs in drawing order.
    pub fn glyph_runs(&self) -> impl Iterator<Item = &GlyphRun> {
        self.commands.iter().filter_map(|command| match command {
            DisplayCommand::GlyphRun(run) => Some(run),
            _ => None,
        })
    }
}

impl PageSurface for PrintDisplayList {
    fn save(&mut self) {
        self.push(DisplayCommand::Save);
    }

    fn restore(&mut self) {
        self.push(DisplayCommand::Restore);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.push(DisplayCommand::Translate { dx, dy });
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.push(DisplayCommand::ClipRect(rect));
    }

    fn fill_rect(&mut self, rect: Rectangle) {
        self.push(DisplayCommand::BackgroundRect(rect));
    }

    fn draw_glyph_run(&mut self, run: GlyphRun) {
        self.push(DisplayCommand::GlyphRun(run));
    }
}

/// Low-level drawing commands recorded while a page renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DisplayCommand {
    Save,
    Restore,
    Translate {
        dx: f64,
        dy: f64,
    },
    ClipRect(Rect),
    GlyphRun(GlyphRun),
    BackgroundRect(Rectangle),
}

/// Describes an individual shaped glyph run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphRun {
    pub text: String,
    pub font_family: String,
    pub font_size_pt: f32,
    pub position: Point,
    pub color: Color,
}

/// Represents a filled rectangular region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub origin: Point,
    pub size: Size,
    pub color: Color,
}

/// 2D size representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// RGBA color stored in normalized floating-point form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rgba({:.3}, {:.3}, {:.3}, {:.3})",
            self.r, self.g, self.b, self.a
        )
    }
}
