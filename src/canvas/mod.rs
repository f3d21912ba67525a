//! # Page Canvas
//!
//! The layout engine never writes PDF directly. It talks to a [`Canvas`], a
//! page primitive provider that can open pages, measure and draw text, fill
//! and stroke shapes, and place images. The canvas records everything as
//! [`DrawOp`]s on [`CanvasPage`]s, which the PDF writer serializes later.
//!
//! ## Coordinates
//!
//! All coordinates are in points with the origin at the top-left corner of
//! the page and y growing downward. The PDF writer flips them.
//!
//! ## The cursor
//!
//! [`Cursor`] is the pagination cursor: current page, x and y, plus the
//! printable [`Frame`]. It is explicit state owned by the layout pass and
//! handed to the canvas for flowing text, so that nothing hides the current
//! position in ambient globals. The invariant the whole engine relies on:
//! immediately before anything is drawn, `frame.top() <= y` and
//! `y + height <= frame.bottom()`, otherwise a page break happens first.

pub mod pdf_canvas;

pub use pdf_canvas::PdfCanvas;

use std::sync::Arc;

use crate::error::Result;
use crate::font::FontKey;
use crate::image_loader::LoadedImage;
use crate::style::{Color, Edges, PageLayout};

/// Tolerance for floating point comparisons against page limits.
pub const EPSILON: f64 = 0.001;

/// The printable area of every page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub page_width: f64,
    pub page_height: f64,
    pub margins: Edges,
}

impl Frame {
    pub fn from_layout(layout: &PageLayout) -> Self {
        let (page_width, page_height) = layout.page_size.dimensions();
        Self {
            page_width,
            page_height,
            margins: layout.margins,
        }
    }

    pub fn left(&self) -> f64 {
        self.margins.left
    }

    pub fn right(&self) -> f64 {
        self.page_width - self.margins.right
    }

    pub fn top(&self) -> f64 {
        self.margins.top
    }

    /// The lowest y content may reach.
    pub fn bottom(&self) -> f64 {
        self.page_height - self.margins.bottom
    }

    pub fn content_width(&self) -> f64 {
        self.right() - self.left()
    }

    pub fn content_height(&self) -> f64 {
        self.bottom() - self.top()
    }
}

/// Where the layout pass currently is.
#[derive(Debug, Clone)]
pub struct Cursor {
    pub page: usize,
    pub x: f64,
    pub y: f64,
    frame: Frame,
}

impl Cursor {
    /// A cursor at the top-left of the printable area of page 0.
    pub fn new(frame: Frame) -> Self {
        Self {
            page: 0,
            x: frame.left(),
            y: frame.top(),
            frame,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn fits(&self, height: f64) -> bool {
        self.y + height <= self.frame.bottom() + EPSILON
    }

    pub fn at_page_top(&self) -> bool {
        (self.y - self.frame.top()).abs() < EPSILON
    }

    /// Start a new page if `height` more points do not fit below the cursor.
    ///
    /// Returns whether a page was started. A cursor already at the top of a
    /// page never breaks: the content would not fit on a fresh page either,
    /// and breaking again would only add blank pages.
    pub fn ensure_space<C: Canvas + ?Sized>(&mut self, canvas: &mut C, height: f64) -> Result<bool> {
        if self.fits(height) || self.at_page_top() {
            return Ok(false);
        }
        self.break_page(canvas)?;
        Ok(true)
    }

    /// Unconditionally open a new page and move to its top-left corner.
    pub fn break_page<C: Canvas + ?Sized>(&mut self, canvas: &mut C) -> Result<()> {
        self.page = canvas.new_page()?;
        self.x = self.frame.left();
        self.y = self.frame.top();
        log::debug!("page break -> page {}", self.page + 1);
        Ok(())
    }

    pub fn advance(&mut self, dy: f64) {
        self.y += dy;
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    pub fn return_to_margin(&mut self) {
        self.x = self.frame.left();
    }
}

/// A rectangle in page coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

/// A face at a size.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub key: FontKey,
    pub size: f64,
}

impl FontSpec {
    pub fn new(key: FontKey, size: f64) -> Self {
        Self { key, size }
    }
}

/// Everything that decides how one run of text looks.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStyle {
    pub font: FontSpec,
    pub color: Color,
    pub underline: bool,
    pub strike: bool,
    /// URI the run links to.
    pub link: Option<String>,
    /// Filled behind every fragment the run lands as, on whatever line or
    /// page the fragment ends up.
    pub background: Option<Color>,
}

impl RunStyle {
    pub fn plain(font: FontSpec, color: Color) -> Self {
        Self {
            font,
            color,
            underline: false,
            strike: false,
            link: None,
            background: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Options for flowing text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextOptions {
    /// Leave the flow open so the next run continues on the same line.
    pub continued: bool,
    /// Start a new flow at this position instead of the cursor's.
    pub at: Option<(f64, f64)>,
    /// Wrap width for a new flow. Defaults to the distance from the start x
    /// to the right margin.
    pub width: Option<f64>,
    /// Extra leading between wrapped lines.
    pub line_gap: f64,
}

impl TextOptions {
    pub fn continued(continued: bool) -> Self {
        Self {
            continued,
            ..Default::default()
        }
    }
}

/// Where the first fragment of the most recent text draw landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextOrigin {
    pub page: usize,
    pub x: f64,
    pub y: f64,
}

/// One recorded drawing operation.
#[derive(Debug, Clone)]
pub enum DrawOp {
    /// A single line fragment of text. `y` is the top of the line box and
    /// `baseline` the y the glyphs sit on.
    Text {
        x: f64,
        y: f64,
        baseline: f64,
        width: f64,
        text: String,
        font: FontKey,
        size: f64,
        color: Color,
        underline: bool,
        strike: bool,
        link: Option<String>,
    },
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        stroke: Stroke,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        stroke: Stroke,
    },
    Image {
        rect: Rect,
        image: Arc<LoadedImage>,
    },
}

/// A finished page: its size and everything drawn on it, in paint order.
#[derive(Debug, Clone)]
pub struct CanvasPage {
    pub width: f64,
    pub height: f64,
    pub ops: Vec<DrawOp>,
}

impl CanvasPage {
    /// All text fragments on the page, concatenated in paint order.
    pub fn text(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// The page primitive provider the layout engine draws through.
pub trait Canvas {
    fn frame(&self) -> &Frame;

    /// Open a new page and return its index.
    fn new_page(&mut self) -> Result<usize>;

    fn page_count(&self) -> usize;

    fn measure_text(&self, text: &str, font: &FontSpec) -> f64;

    /// Distance between consecutive baselines for the font, without gap.
    fn line_height(&self, font: &FontSpec) -> f64;

    /// Flow text at the cursor, wrapping at the flow's right edge and
    /// breaking pages as lines run past the bottom of the frame.
    ///
    /// A `continued` draw leaves the cursor on the current line; the next
    /// draw without `at` picks up where this one stopped. A draw that is not
    /// continued finishes the line and moves the cursor to the start of the
    /// next one.
    fn draw_text(&mut self, cursor: &mut Cursor, text: &str, style: &RunStyle, opts: &TextOptions) -> Result<()>;

    /// Draw a single unwrapped line at an explicit position, independent of
    /// any flow. Returns the drawn width.
    fn draw_text_at(&mut self, page: usize, x: f64, y: f64, text: &str, style: &RunStyle) -> Result<f64>;

    /// Wrap text inside a box, aligning each line. Lines that would overflow
    /// the box height are dropped, but the first line is always drawn.
    fn draw_text_box(&mut self, page: usize, rect: Rect, text: &str, style: &RunStyle, align: TextAlign) -> Result<()>;

    /// Where the next continued draw would start.
    fn flow_position(&self, cursor: &Cursor) -> (f64, f64);

    /// Origin of the first fragment of the last text draw.
    fn last_text_origin(&self) -> Option<TextOrigin>;

    /// Close a flow left open by a continued draw, moving the cursor to the
    /// start of the next line. No-op without an open flow.
    fn end_flow(&mut self, cursor: &mut Cursor);

    fn fill_rect(&mut self, page: usize, rect: Rect, color: Color) -> Result<()>;

    fn stroke_rect(&mut self, page: usize, rect: Rect, stroke: Stroke) -> Result<()>;

    fn stroke_line(&mut self, page: usize, from: (f64, f64), to: (f64, f64), stroke: Stroke) -> Result<()>;

    fn draw_image(&mut self, page: usize, image: &Arc<LoadedImage>, rect: Rect) -> Result<()>;
}
