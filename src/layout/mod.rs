//! # Block Layout
//!
//! Walks the document's top-level blocks in order and draws each one onto a
//! [`Canvas`], breaking pages through the explicit [`Cursor`].
//!
//! There is no measure-then-place pass. Every block reserves the space it
//! needs with [`Cursor::ensure_space`] right before drawing, using the same
//! formulas it draws with, and text that runs past the bottom of the frame
//! is broken onto the next page by the canvas as it flows. That keeps the
//! engine single-pass and streaming: a block only ever looks at the page it
//! is about to draw on.
//!
//! Block kinds with their own non-trivial layout live in submodules:
//! [`inline`] (styled runs), [`list`], [`table`] and [`code`]. The rest
//! (headings, paragraphs, blockquotes, rules, images) are small enough to
//! live here.

pub mod code;
pub mod inline;
pub mod list;
pub mod table;

use std::sync::Arc;

use crate::canvas::{Canvas, Cursor, FontSpec, Rect, RunStyle, Stroke, TextOptions};
use crate::error::Result;
use crate::font::FontKey;
use crate::highlight::{SyntaxTokenizer, SyntectTokenizer};
use crate::image_loader::LoadedImage;
use crate::model::{Block, BlockId, Document, Inline};
use crate::resources::Resources;
use crate::style::{SyntaxTheme, TextStyle, Theme};

use inline::FlowStart;

/// Space reserved above a blockquote before its top padding.
const BLOCKQUOTE_MIN_SPACE: f64 = 30.0;
/// Padding above and below blockquote content.
const BLOCKQUOTE_PADDING: f64 = 6.0;
const RULE_MIN_SPACE: f64 = 20.0;
/// Largest height an image block is scaled to.
const IMAGE_MAX_HEIGHT: f64 = 400.0;
const IMAGE_FALLBACK_SPACE: f64 = 20.0;

static DEFAULT_TOKENIZER: SyntectTokenizer = SyntectTokenizer;

/// Switches that change how blocks are drawn, independent of the theme.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    /// Color code blocks by token kind.
    pub highlight: bool,
    /// Draw a line-number gutter beside code blocks.
    pub line_numbers: bool,
    /// Registered font family used for monochrome emoji.
    pub emoji_font: Option<String>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            highlight: true,
            line_numbers: true,
            emoji_font: None,
        }
    }
}

/// A horizontal band of the page that blocks are drawn into.
///
/// The top-level column spans the frame between the margins. Blockquotes
/// and list items narrow it for their children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub x: f64,
    pub width: f64,
    /// Paragraphs inside are forced italic (quoted text).
    pub italic: bool,
}

impl Column {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// The column shifted right by `dx`, keeping its right edge.
    pub fn inset(&self, dx: f64) -> Column {
        Column {
            x: self.x + dx,
            width: (self.width - dx).max(0.0),
            italic: self.italic,
        }
    }
}

/// Draws a [`Document`] with a [`Theme`].
pub struct LayoutEngine<'a> {
    document: &'a Document,
    theme: &'a Theme,
    syntax: SyntaxTheme,
    resources: &'a Resources,
    options: &'a LayoutOptions,
    tokenizer: &'a dyn SyntaxTokenizer,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(
        document: &'a Document,
        theme: &'a Theme,
        resources: &'a Resources,
        options: &'a LayoutOptions,
    ) -> Self {
        Self {
            document,
            theme,
            syntax: theme.syntax_theme(),
            resources,
            options,
            tokenizer: &DEFAULT_TOKENIZER,
        }
    }

    /// Replace the bundled syntect tokenizer.
    pub fn with_tokenizer(mut self, tokenizer: &'a dyn SyntaxTokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Lay out every top-level block, starting at the top of the canvas's
    /// current page.
    pub fn layout<C: Canvas + ?Sized>(&self, canvas: &mut C) -> Result<()> {
        let frame = *canvas.frame();
        let mut cursor = Cursor::new(frame);
        cursor.page = canvas.page_count().saturating_sub(1);
        let column = Column {
            x: frame.left(),
            width: frame.content_width(),
            italic: false,
        };

        for id in self.document.roots() {
            self.layout_block(canvas, &mut cursor, *id, column)?;
        }
        log::debug!(
            "laid out {} blocks on {} pages",
            self.document.roots().len(),
            canvas.page_count()
        );
        Ok(())
    }

    pub(crate) fn theme(&self) -> &Theme {
        self.theme
    }

    pub(crate) fn resources(&self) -> &Resources {
        self.resources
    }

    pub(crate) fn options(&self) -> &LayoutOptions {
        self.options
    }

    pub(crate) fn block(&self, id: BlockId) -> Option<&'a Block> {
        self.document.get(id)
    }

    /// Run style for a theme text style.
    pub(crate) fn run_style(style: &TextStyle) -> RunStyle {
        RunStyle::plain(
            FontSpec::new(FontKey::from_name(&style.font), style.font_size),
            style.color,
        )
    }

    /// Height of one line of body text, gap included.
    pub(crate) fn body_line<C: Canvas + ?Sized>(&self, canvas: &C) -> f64 {
        let body = &self.theme.body;
        canvas.line_height(&Self::run_style(body).font) + body.line_gap
    }

    /// Draw one block into `column`.
    pub(crate) fn layout_block<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: &mut Cursor,
        id: BlockId,
        column: Column,
    ) -> Result<()> {
        let Some(block) = self.block(id) else {
            log::trace!("skipping dangling block id {:?}", id);
            return Ok(());
        };
        match block {
            Block::Heading { level, content } => {
                self.layout_heading(canvas, cursor, *level, content, column)
            }
            Block::Paragraph { content } => self.layout_paragraph(canvas, cursor, content, column, 0.5),
            Block::CodeBlock { language, text } => {
                code::layout_code_block(self, canvas, cursor, language.as_deref(), text, column)?;
                cursor.advance(self.body_line(canvas) * 0.5);
                Ok(())
            }
            Block::Blockquote { children } => self.layout_blockquote(canvas, cursor, children, column),
            Block::List(list) => {
                list::layout_list(self, canvas, cursor, list, column, 0)?;
                cursor.advance(self.body_line(canvas) * 0.3);
                Ok(())
            }
            Block::Table(table) => table::layout_table(self, canvas, cursor, table, column),
            Block::HorizontalRule => self.layout_rule(canvas, cursor, column),
            Block::Image { url, alt } => self.layout_image(canvas, cursor, url, alt, column),
            Block::RawHtml { .. } => {
                log::trace!("skipping raw HTML block");
                Ok(())
            }
        }
    }

    /// Draw a paragraph and leave `gap` body lines below it.
    fn layout_paragraph<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: &mut Cursor,
        content: &[Inline],
        column: Column,
        gap: f64,
    ) -> Result<()> {
        let body = &self.theme.body;
        cursor.ensure_space(canvas, body.font_size * 2.0)?;
        let mut style = Self::run_style(body);
        if column.italic {
            style.font.key = style.font.key.styled(false, true);
        }
        inline::draw_run(
            self,
            canvas,
            cursor,
            content,
            &style,
            body.line_gap,
            FlowStart::new_line(column),
        )?;
        cursor.advance(self.body_line(canvas) * gap);
        Ok(())
    }

    fn layout_heading<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: &mut Cursor,
        level: u8,
        content: &[Inline],
        column: Column,
    ) -> Result<()> {
        let heading = self.theme.heading(level);
        let size = heading.font_size;
        cursor.ensure_space(canvas, size * 0.8 + size + size * 0.3)?;
        cursor.advance(size * 0.8);
        let style = Self::run_style(heading);
        inline::draw_run(
            self,
            canvas,
            cursor,
            content,
            &style,
            heading.line_gap,
            FlowStart::new_line(column),
        )?;
        cursor.advance(size * 0.3);
        Ok(())
    }

    fn layout_blockquote<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: &mut Cursor,
        children: &[BlockId],
        column: Column,
    ) -> Result<()> {
        let quote = &self.theme.blockquote;
        cursor.ensure_space(canvas, BLOCKQUOTE_MIN_SPACE)?;
        let start_page = cursor.page;
        let start_y = cursor.y;
        cursor.advance(BLOCKQUOTE_PADDING);

        let mut inner = column.inset(quote.border_width + quote.indent);
        inner.italic = column.italic || quote.italic;
        for child in children {
            match self.block(*child) {
                Some(Block::Paragraph { content }) => {
                    self.layout_paragraph(canvas, cursor, content, inner, 0.3)?
                }
                _ => self.layout_block(canvas, cursor, *child, inner)?,
            }
        }
        cursor.advance(BLOCKQUOTE_PADDING);

        let end_page = cursor.page;
        let end_y = cursor.y.min(cursor.frame().bottom());
        let frame = *cursor.frame();
        for page in start_page..=end_page {
            let top = if page == start_page { start_y } else { frame.top() };
            let bottom = if page == end_page { end_y } else { frame.bottom() };
            if bottom > top {
                canvas.fill_rect(
                    page,
                    Rect::new(column.x, top, quote.border_width, bottom - top),
                    quote.border_color,
                )?;
            }
        }
        if end_page > start_page {
            log::debug!("blockquote spans pages {}..={}", start_page + 1, end_page + 1);
        }
        cursor.advance(self.body_line(canvas) * 0.3);
        Ok(())
    }

    fn layout_rule<C: Canvas + ?Sized>(&self, canvas: &mut C, cursor: &mut Cursor, column: Column) -> Result<()> {
        cursor.ensure_space(canvas, RULE_MIN_SPACE)?;
        let half = self.body_line(canvas) * 0.5;
        cursor.advance(half);
        canvas.stroke_line(
            cursor.page,
            (column.x, cursor.y),
            (column.right(), cursor.y),
            Stroke {
                color: self.theme.rule_color,
                width: 1.0,
            },
        )?;
        cursor.advance(half);
        Ok(())
    }

    fn layout_image<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: &mut Cursor,
        url: &str,
        alt: &str,
        column: Column,
    ) -> Result<()> {
        let Some(image) = self.resources.image(url) else {
            return self.layout_image_fallback(canvas, cursor, alt, column);
        };

        let max_height = IMAGE_MAX_HEIGHT.min(cursor.frame().content_height());
        let (width, height) = fit_image(image, column.width, max_height);
        if width <= 0.0 || height <= 0.0 {
            return self.layout_image_fallback(canvas, cursor, alt, column);
        }
        cursor.ensure_space(canvas, height)?;
        let x = column.x + (column.width - width) / 2.0;
        canvas.draw_image(cursor.page, image, Rect::new(x, cursor.y, width, height))?;
        cursor.advance(height);
        cursor.advance(self.body_line(canvas) * 0.5);
        Ok(())
    }

    fn layout_image_fallback<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cursor: &mut Cursor,
        alt: &str,
        column: Column,
    ) -> Result<()> {
        cursor.ensure_space(canvas, IMAGE_FALLBACK_SPACE)?;
        let label = if alt.is_empty() { "image" } else { alt };
        let body = &self.theme.body;
        canvas.draw_text(
            cursor,
            &format!("[Image: {}]", label),
            &Self::run_style(body),
            &TextOptions {
                at: Some((column.x, cursor.y)),
                width: Some(column.width),
                line_gap: body.line_gap,
                ..Default::default()
            },
        )?;
        cursor.advance(self.body_line(canvas) * 0.3);
        Ok(())
    }

    pub(crate) fn syntax(&self) -> &SyntaxTheme {
        &self.syntax
    }

    pub(crate) fn tokenizer(&self) -> &dyn SyntaxTokenizer {
        self.tokenizer
    }
}

/// Scale an image (one pixel = one point) to fit inside the box, keeping
/// its aspect ratio. Images are never enlarged.
fn fit_image(image: &Arc<LoadedImage>, max_width: f64, max_height: f64) -> (f64, f64) {
    let (w, h) = (image.width_px as f64, image.height_px as f64);
    if w <= 0.0 || h <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_width / w).min(max_height / h).min(1.0);
    (w * scale, h * scale)
}
