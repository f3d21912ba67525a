//! In-memory canvas that records draw operations for the PDF writer.
//!
//! Text wrapping is greedy: UAX#14 break opportunities (via
//! `unicode-linebreak`) split the text into pieces, and each piece goes on
//! the current line if its visible width fits, otherwise on the next one.
//! A piece wider than a whole line is split between characters. Hard breaks
//! (`\n`) always end the line.

use std::sync::Arc;

use unicode_linebreak::{linebreaks, BreakOpportunity};

use super::*;
use crate::error::QuireError;
use crate::font::FontContext;

/// An open text flow: the line a continued draw left behind.
#[derive(Debug, Clone)]
struct Flow {
    left: f64,
    right: f64,
    pen_x: f64,
    /// Tallest line height seen on the current line.
    line_height: f64,
    line_gap: f64,
    /// Whether anything has been emitted on the current line yet. The
    /// vertical fit check happens when the first fragment lands.
    line_started: bool,
}

pub struct PdfCanvas<'f> {
    fonts: &'f FontContext,
    frame: Frame,
    pages: Vec<CanvasPage>,
    flow: Option<Flow>,
    last_origin: Option<TextOrigin>,
}

impl<'f> PdfCanvas<'f> {
    /// A canvas with its first page already open.
    pub fn new(fonts: &'f FontContext, frame: Frame) -> Self {
        Self {
            fonts,
            frame,
            pages: vec![Self::blank_page(&frame)],
            flow: None,
            last_origin: None,
        }
    }

    pub fn pages(&self) -> &[CanvasPage] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<CanvasPage> {
        self.pages
    }

    fn blank_page(frame: &Frame) -> CanvasPage {
        CanvasPage {
            width: frame.page_width,
            height: frame.page_height,
            ops: Vec::new(),
        }
    }

    fn page_mut(&mut self, page: usize) -> Result<&mut CanvasPage> {
        let count = self.pages.len();
        self.pages
            .get_mut(page)
            .ok_or_else(|| QuireError::Render(format!("page {} out of range ({} pages)", page, count)))
    }

    fn text_op(&self, x: f64, y: f64, text: &str, style: &RunStyle) -> DrawOp {
        let ascent = self.fonts.ascent(&style.font.key, style.font.size);
        DrawOp::Text {
            x,
            y,
            baseline: y + ascent,
            width: self.measure_text(text, &style.font),
            text: text.to_string(),
            font: style.font.key.clone(),
            size: style.font.size,
            color: style.color,
            underline: style.underline,
            strike: style.strike,
            link: style.link.clone(),
        }
    }

    /// Record one text fragment, preceded by its background when the style
    /// has one. Returns the fragment width.
    fn push_text(&mut self, page: usize, x: f64, y: f64, text: &str, style: &RunStyle) -> Result<f64> {
        let op = self.text_op(x, y, text, style);
        let width = match &op {
            DrawOp::Text { width, .. } => *width,
            _ => 0.0,
        };
        let backdrop = style.background.map(|color| {
            let inked = self.measure_text(trim_spaces(text), &style.font);
            let height = self.line_height(&style.font);
            DrawOp::FillRect {
                rect: Rect::new(x - 2.0, y - 1.0, inked + 4.0, height + 2.0),
                color,
            }
        });
        let ops = &mut self.page_mut(page)?.ops;
        ops.extend(backdrop);
        ops.push(op);
        Ok(width)
    }

    /// Emit the pending fragment of the current line, if any.
    fn flush(
        &mut self,
        cursor: &mut Cursor,
        flow: &mut Flow,
        fragment: &mut String,
        fragment_x: &mut f64,
        style: &RunStyle,
    ) -> Result<()> {
        if fragment.is_empty() {
            return Ok(());
        }
        if !flow.line_started {
            if !cursor.fits(flow.line_height) && !cursor.at_page_top() {
                cursor.break_page(self)?;
            }
            flow.line_started = true;
        }
        if self.last_origin.is_none() {
            self.last_origin = Some(TextOrigin {
                page: cursor.page,
                x: *fragment_x,
                y: cursor.y,
            });
        }
        self.push_text(cursor.page, *fragment_x, cursor.y, fragment, style)?;
        fragment.clear();
        *fragment_x = flow.pen_x;
        Ok(())
    }

    fn next_line(cursor: &mut Cursor, flow: &mut Flow, run_line_height: f64) {
        if flow.line_started {
            cursor.advance(flow.line_height + flow.line_gap);
        }
        flow.pen_x = flow.left;
        flow.line_height = run_line_height;
        flow.line_started = false;
    }
}

/// Split text at UAX#14 opportunities. Each piece carries whether a hard
/// line break follows it; the newline itself is stripped.
fn break_pieces(text: &str) -> Vec<(&str, bool)> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, opportunity) in linebreaks(text) {
        let piece = &text[start..idx];
        start = idx;
        let hard = opportunity == BreakOpportunity::Mandatory
            && piece.ends_with(['\n', '\r', '\u{2028}', '\u{2029}']);
        let piece = if hard {
            piece.trim_end_matches(['\n', '\r', '\u{2028}', '\u{2029}'])
        } else {
            piece
        };
        pieces.push((piece, hard));
    }
    pieces
}

/// Trailing break spaces hang past the right edge. No-break spaces are
/// content and keep their width.
fn trim_spaces(piece: &str) -> &str {
    piece.trim_end_matches([' ', '\t'])
}

impl<'f> Canvas for PdfCanvas<'f> {
    fn frame(&self) -> &Frame {
        &self.frame
    }

    fn new_page(&mut self) -> Result<usize> {
        self.pages.push(Self::blank_page(&self.frame));
        Ok(self.pages.len() - 1)
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn measure_text(&self, text: &str, font: &FontSpec) -> f64 {
        self.fonts.measure_string(text, &font.key, font.size)
    }

    fn line_height(&self, font: &FontSpec) -> f64 {
        self.fonts.line_height(&font.key, font.size)
    }

    fn draw_text(&mut self, cursor: &mut Cursor, text: &str, style: &RunStyle, opts: &TextOptions) -> Result<()> {
        let run_line_height = self.line_height(&style.font);
        let open = self.flow.take().filter(|_| opts.at.is_none());
        let mut flow = match open {
            Some(flow) => flow,
            None => {
                if let Some((x, y)) = opts.at {
                    cursor.move_to(x, y);
                }
                let left = cursor.x;
                let right = opts
                    .width
                    .map(|w| left + w)
                    .unwrap_or_else(|| self.frame.right());
                Flow {
                    left,
                    right,
                    pen_x: left,
                    line_height: 0.0,
                    line_gap: 0.0,
                    line_started: false,
                }
            }
        };
        flow.line_height = flow.line_height.max(run_line_height);
        flow.line_gap = flow.line_gap.max(opts.line_gap);
        self.last_origin = None;

        let mut fragment = String::new();
        let mut fragment_x = flow.pen_x;

        for (piece, hard) in break_pieces(text) {
            let visible = self.measure_text(trim_spaces(piece), &style.font);
            let full = self.measure_text(piece, &style.font);

            if flow.pen_x + visible > flow.right + EPSILON && flow.pen_x > flow.left + EPSILON {
                self.flush(cursor, &mut flow, &mut fragment, &mut fragment_x, style)?;
                Self::next_line(cursor, &mut flow, run_line_height);
                fragment_x = flow.pen_x;
            }

            if visible > flow.right - flow.left + EPSILON {
                // Longer than a whole line: break between characters.
                for ch in piece.chars() {
                    let w = self.fonts.char_width(ch, &style.font.key, style.font.size);
                    if flow.pen_x + w > flow.right + EPSILON && flow.pen_x > flow.left + EPSILON {
                        self.flush(cursor, &mut flow, &mut fragment, &mut fragment_x, style)?;
                        Self::next_line(cursor, &mut flow, run_line_height);
                        fragment_x = flow.pen_x;
                    }
                    fragment.push(ch);
                    flow.pen_x += w;
                }
            } else {
                fragment.push_str(piece);
                flow.pen_x += full;
            }

            if hard {
                self.flush(cursor, &mut flow, &mut fragment, &mut fragment_x, style)?;
                // An empty line still occupies its height.
                flow.line_started = true;
                Self::next_line(cursor, &mut flow, run_line_height);
                fragment_x = flow.pen_x;
            }
        }
        self.flush(cursor, &mut flow, &mut fragment, &mut fragment_x, style)?;

        if opts.continued {
            self.flow = Some(flow);
        } else {
            if flow.line_started || flow.pen_x > flow.left + EPSILON {
                cursor.advance(flow.line_height + flow.line_gap);
            }
            cursor.x = flow.left;
        }
        Ok(())
    }

    fn draw_text_at(&mut self, page: usize, x: f64, y: f64, text: &str, style: &RunStyle) -> Result<f64> {
        self.last_origin = Some(TextOrigin { page, x, y });
        self.push_text(page, x, y, text, style)
    }

    fn draw_text_box(&mut self, page: usize, rect: Rect, text: &str, style: &RunStyle, align: TextAlign) -> Result<()> {
        let line_height = self.line_height(&style.font);
        let mut lines: Vec<String> = vec![String::new()];
        let mut pen = 0.0;
        for (piece, hard) in break_pieces(text) {
            let visible = self.measure_text(trim_spaces(piece), &style.font);
            if pen + visible > rect.width + EPSILON && pen > EPSILON {
                lines.push(String::new());
                pen = 0.0;
            }
            if let Some(line) = lines.last_mut() {
                line.push_str(piece);
            }
            pen += self.measure_text(piece, &style.font);
            if hard {
                lines.push(String::new());
                pen = 0.0;
            }
        }

        let mut y = rect.y;
        for (i, line) in lines.iter().enumerate() {
            if i > 0 && y + line_height > rect.y + rect.height + EPSILON {
                break;
            }
            let line = trim_spaces(line);
            if !line.is_empty() {
                let width = self.measure_text(line, &style.font);
                let x = match align {
                    TextAlign::Left => rect.x,
                    TextAlign::Center => rect.x + (rect.width - width) / 2.0,
                    TextAlign::Right => rect.x + rect.width - width,
                };
                self.draw_text_at(page, x, y, line, style)?;
            }
            y += line_height;
        }
        Ok(())
    }

    fn flow_position(&self, cursor: &Cursor) -> (f64, f64) {
        match &self.flow {
            Some(flow) => (flow.pen_x, cursor.y),
            None => (cursor.x, cursor.y),
        }
    }

    fn last_text_origin(&self) -> Option<TextOrigin> {
        self.last_origin
    }

    fn end_flow(&mut self, cursor: &mut Cursor) {
        if let Some(flow) = self.flow.take() {
            if flow.line_started {
                cursor.advance(flow.line_height + flow.line_gap);
            }
            cursor.x = flow.left;
        }
    }

    fn fill_rect(&mut self, page: usize, rect: Rect, color: Color) -> Result<()> {
        self.page_mut(page)?.ops.push(DrawOp::FillRect { rect, color });
        Ok(())
    }

    fn stroke_rect(&mut self, page: usize, rect: Rect, stroke: Stroke) -> Result<()> {
        self.page_mut(page)?.ops.push(DrawOp::StrokeRect { rect, stroke });
        Ok(())
    }

    fn stroke_line(&mut self, page: usize, from: (f64, f64), to: (f64, f64), stroke: Stroke) -> Result<()> {
        self.page_mut(page)?.ops.push(DrawOp::Line { from, to, stroke });
        Ok(())
    }

    fn draw_image(&mut self, page: usize, image: &Arc<LoadedImage>, rect: Rect) -> Result<()> {
        self.page_mut(page)?.ops.push(DrawOp::Image {
            rect,
            image: Arc::clone(image),
        });
        Ok(())
    }
}
