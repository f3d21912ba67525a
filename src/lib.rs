//! # Quire
//!
//! Markdown to paginated PDF.
//!
//! Quire does not render onto an endless scroll and cut it into pages
//! afterwards. A single [`Cursor`](canvas::Cursor) walks down the page while
//! blocks are drawn, and every block asks it for room before it draws: a
//! heading that would strand at the bottom of a page moves to the next one,
//! table rows never split, and long code blocks break between lines with a
//! fresh background panel on each page.
//!
//! ## Architecture
//!
//! ```text
//! markdown text
//!       ↓
//!   [model]       pulldown-cmark events folded into a block arena
//!       ↓
//!   [resources]   images and emoji rasters fetched before layout
//!       ↓
//!   [layout]      blocks, inline flow, lists, tables, code, emoji overlay
//!       ↓
//!   [canvas]      page primitives recorded as draw operations
//!       ↓
//!   [pdf]         serialize to PDF bytes
//! ```
//!
//! ```no_run
//! let pdf = quire::render_markdown("# Hello\n\nWorld", &quire::RenderOptions::default()).unwrap();
//! std::fs::write("hello.pdf", pdf).unwrap();
//! ```

pub mod canvas;
pub mod config;
pub mod emoji;
pub mod error;
pub mod font;
pub mod highlight;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod resources;
pub mod style;

use std::path::PathBuf;

use canvas::{CanvasPage, Frame, PdfCanvas};
use emoji::{DirectoryEmojiSource, EmojiRasterSource};
use error::{QuireError, Result};
use font::FontContext;
use highlight::{SyntaxTokenizer, SyntectTokenizer};
use image_loader::{FileImageResolver, ImageResolver};
use layout::{LayoutEngine, LayoutOptions};
use model::Metadata;
use pdf::PdfWriter;
use resources::Resources;
use style::{PageLayout, Theme};

/// Font family name custom emoji fonts are registered under.
pub const EMOJI_FONT_FAMILY: &str = "QuireEmoji";

/// Everything that controls a render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub theme: Theme,
    pub page: PageLayout,
    /// Color code blocks by token kind.
    pub highlight: bool,
    pub line_numbers: bool,
    /// TrueType font for monochrome emoji. Without one, emoji fall back to
    /// the text font.
    pub emoji_font: Option<PathBuf>,
    /// Directory of Twemoji-named PNGs. Setting it switches on color emoji.
    pub emoji_images: Option<PathBuf>,
    /// Base directory for relative image paths.
    pub image_base_path: Option<PathBuf>,
    pub metadata: Metadata,
    pub compress: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            page: PageLayout::default(),
            highlight: true,
            line_numbers: true,
            emoji_font: None,
            emoji_images: None,
            image_base_path: None,
            metadata: Metadata::default(),
            compress: true,
        }
    }
}

/// A configured renderer. Reusable across documents; each render gets its
/// own cursor, canvas and resources.
pub struct Renderer {
    options: RenderOptions,
    fonts: FontContext,
    emoji_family: Option<String>,
    images: Box<dyn ImageResolver>,
    emoji_source: Option<Box<dyn EmojiRasterSource>>,
    tokenizer: Box<dyn SyntaxTokenizer>,
}

impl Renderer {
    /// Build a renderer, loading the emoji font if one is configured.
    pub fn new(options: RenderOptions) -> Result<Self> {
        let mut fonts = FontContext::new();
        let emoji_family = match &options.emoji_font {
            Some(path) => {
                let data = std::fs::read(path).map_err(|e| QuireError::io(path, e))?;
                fonts.registry_mut().register(EMOJI_FONT_FAMILY, 400, false, data)?;
                Some(EMOJI_FONT_FAMILY.to_string())
            }
            None => None,
        };
        let images: Box<dyn ImageResolver> = Box::new(FileImageResolver::new(options.image_base_path.clone()));
        let emoji_source = options
            .emoji_images
            .clone()
            .map(|dir| Box::new(DirectoryEmojiSource::new(dir)) as Box<dyn EmojiRasterSource>);
        Ok(Self {
            options,
            fonts,
            emoji_family,
            images,
            emoji_source,
            tokenizer: Box::new(SyntectTokenizer::new()),
        })
    }

    pub fn with_image_resolver(mut self, resolver: impl ImageResolver + 'static) -> Self {
        self.images = Box::new(resolver);
        self
    }

    /// Use `source` for color emoji rasters, switching color emoji on.
    pub fn with_emoji_source(mut self, source: impl EmojiRasterSource + 'static) -> Self {
        self.emoji_source = Some(Box::new(source));
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: impl SyntaxTokenizer + 'static) -> Self {
        self.tokenizer = Box::new(tokenizer);
        self
    }

    /// Register a TrueType/OpenType face that themes can name as a font.
    pub fn register_font(&mut self, family: &str, weight: u32, italic: bool, data: Vec<u8>) -> Result<()> {
        self.fonts.registry_mut().register(family, weight, italic, data)
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Lay out `markdown` without serializing it.
    pub fn layout(&self, markdown: &str) -> Result<Vec<CanvasPage>> {
        let document = model::parse::parse_markdown(markdown);
        let resources = Resources::gather(&document, markdown, &*self.images, self.emoji_source.as_deref());
        if self.emoji_family.is_none() {
            let atlas = resources.emoji_atlas();
            let unglyphed = emoji::emoji_units(markdown)
                .filter(|unit| atlas.map_or(true, |a| a.get(unit).is_none()))
                .count();
            if unglyphed > 0 {
                log::warn!(
                    "{} emoji have no color raster and no emoji font is set; drawing codepoint labels (set emojiFont)",
                    unglyphed
                );
            }
        }
        let layout_options = LayoutOptions {
            highlight: self.options.highlight,
            line_numbers: self.options.line_numbers,
            emoji_font: self.emoji_family.clone(),
        };
        let engine = LayoutEngine::new(&document, &self.options.theme, &resources, &layout_options)
            .with_tokenizer(&*self.tokenizer);
        let mut canvas = PdfCanvas::new(&self.fonts, Frame::from_layout(&self.options.page));
        engine.layout(&mut canvas)?;
        Ok(canvas.into_pages())
    }

    /// Render `markdown` to PDF bytes.
    pub fn render(&self, markdown: &str) -> Result<Vec<u8>> {
        let pages = self.layout(markdown)?;
        let writer = if self.options.compress {
            PdfWriter::new()
        } else {
            PdfWriter::uncompressed()
        };
        writer.write(&pages, &self.options.metadata, &self.fonts)
    }
}

/// Render Markdown to PDF bytes with the bundled parser, resolver and
/// tokenizer.
pub fn render_markdown(markdown: &str, options: &RenderOptions) -> Result<Vec<u8>> {
    Renderer::new(options.clone())?.render(markdown)
}
