//! Fenced code blocks: background panel, line-number gutter and
//! token-colored text.
//!
//! Lines are never wrapped. A block that does not fit on the current page
//! is cut into per-page segments between lines; every segment gets its own
//! background panel and line numbers keep counting across the cut.

use crate::canvas::{Canvas, Cursor, FontSpec, Rect, RunStyle, TextAlign};
use crate::error::Result;
use crate::font::FontKey;
use crate::highlight::{plain_lines, tokenize_to_lines, FlatToken, TokenPalette};
use crate::style::{CodeBlockStyle, Color};

use super::{Column, LayoutEngine};

/// Line height as a multiple of the code font size.
const LINE_SPACING: f64 = 1.4;
/// Space between the widest line number and the code.
const GUTTER_EXTRA: f64 = 16.0;
/// Right margin of the line numbers inside the gutter.
const GUTTER_GAP: f64 = 8.0;

/// Everything needed to paint the lines of one block.
pub struct CodeBlockGeometry {
    pub line_height: f64,
    pub padding: f64,
    pub gutter: f64,
}

impl CodeBlockGeometry {
    pub fn new<C: Canvas + ?Sized>(canvas: &C, style: &CodeBlockStyle, lines: usize, line_numbers: bool) -> Self {
        let gutter = if line_numbers {
            let font = FontSpec::new(FontKey::from_name(&style.font), style.font_size);
            canvas.measure_text(&lines.to_string(), &font) + GUTTER_EXTRA
        } else {
            0.0
        };
        Self {
            line_height: style.font_size * LINE_SPACING,
            padding: style.padding,
            gutter,
        }
    }

    /// Height of a panel holding `lines` lines.
    pub fn panel_height(&self, lines: usize) -> f64 {
        lines as f64 * self.line_height + self.padding * 2.0
    }
}

/// Split a code block's text into highlighted lines.
pub fn code_lines(engine: &LayoutEngine<'_>, language: Option<&str>, text: &str) -> Vec<Vec<FlatToken>> {
    let text = text.replace('\t', "  ");
    if engine.options().highlight {
        tokenize_to_lines(Some(engine.tokenizer()), &text, language)
    } else {
        plain_lines(&text)
    }
}

pub fn layout_code_block<C: Canvas + ?Sized>(
    engine: &LayoutEngine<'_>,
    canvas: &mut C,
    cursor: &mut Cursor,
    language: Option<&str>,
    text: &str,
    column: Column,
) -> Result<()> {
    let lines = code_lines(engine, language, text);
    let style = &engine.theme().code_block;
    let geometry = CodeBlockGeometry::new(&*canvas, style, lines.len(), engine.options().line_numbers);
    let syntax = engine.syntax();
    draw_code_lines(canvas, cursor, &lines, style, syntax.background, syntax.gutter, syntax, &geometry, column)
}

/// Paint lines as one or more panels, breaking pages between lines.
///
/// Token colors come from `palette`; tokens without a kind use the
/// palette's default color, looked up once per block.
#[allow(clippy::too_many_arguments)]
pub fn draw_code_lines<C: Canvas + ?Sized>(
    canvas: &mut C,
    cursor: &mut Cursor,
    lines: &[Vec<FlatToken>],
    style: &CodeBlockStyle,
    background: Color,
    gutter_color: Color,
    palette: &dyn TokenPalette,
    geometry: &CodeBlockGeometry,
    column: Column,
) -> Result<()> {
    let font = FontSpec::new(FontKey::from_name(&style.font), style.font_size);
    let text_height = canvas.line_height(&font);
    let text_offset = ((geometry.line_height - text_height) / 2.0).max(0.0);
    let default_color = palette.default_color();
    let code_x = column.x + geometry.padding + geometry.gutter;
    let right = column.right() - geometry.padding;

    cursor.ensure_space(canvas, geometry.panel_height(1))?;

    let mut next = 0;
    while next < lines.len() {
        let available = cursor.frame().bottom() - cursor.y - geometry.padding * 2.0;
        let fit = ((available + crate::canvas::EPSILON) / geometry.line_height).floor().max(0.0) as usize;
        if fit == 0 && !cursor.at_page_top() {
            cursor.break_page(canvas)?;
            continue;
        }
        let count = fit.max(1).min(lines.len() - next);
        let panel = Rect::new(column.x, cursor.y, column.width, geometry.panel_height(count));
        canvas.fill_rect(cursor.page, panel, background)?;

        for (offset, tokens) in lines[next..next + count].iter().enumerate() {
            let number = next + offset + 1;
            let line_y = panel.y + geometry.padding + offset as f64 * geometry.line_height;
            let text_y = line_y + text_offset;

            if geometry.gutter > 0.0 {
                let numbers = RunStyle::plain(font.clone(), gutter_color);
                canvas.draw_text_box(
                    cursor.page,
                    Rect::new(
                        column.x + geometry.padding,
                        text_y,
                        geometry.gutter - GUTTER_GAP,
                        text_height,
                    ),
                    &number.to_string(),
                    &numbers,
                    TextAlign::Right,
                )?;
            }

            let mut x = code_x;
            for token in tokens {
                let shown = clip_to_width(&*canvas, &token.text, &font, right - x);
                if shown.is_empty() {
                    break;
                }
                let color = match &token.kind {
                    Some(kind) => palette.color_for(kind),
                    None => default_color,
                };
                let run = RunStyle::plain(font.clone(), color);
                x += canvas.draw_text_at(cursor.page, x, text_y, shown, &run)?;
                if shown.len() < token.text.len() {
                    break;
                }
            }
        }

        cursor.advance(panel.height);
        next += count;
        if next < lines.len() {
            log::debug!("code block continues on the next page after line {}", next);
            cursor.break_page(canvas)?;
        }
    }
    cursor.return_to_margin();
    Ok(())
}

/// The longest prefix of `text` no wider than `room`.
fn clip_to_width<'t, C: Canvas + ?Sized>(canvas: &C, text: &'t str, font: &FontSpec, room: f64) -> &'t str {
    if canvas.measure_text(text, font) <= room + crate::canvas::EPSILON {
        return text;
    }
    let mut used = 0.0;
    for (i, ch) in text.char_indices() {
        let mut buf = [0u8; 4];
        used += canvas.measure_text(ch.encode_utf8(&mut buf), font);
        if used > room + crate::canvas::EPSILON {
            return &text[..i];
        }
    }
    text
}
