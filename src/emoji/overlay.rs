//! Drawing text that contains emoji.
//!
//! Monochrome mode draws emoji runs as ordinary text in the emoji font.
//! Without an emoji font the standard fonts have no glyphs for them, so each
//! emoji is drawn as its codepoint label instead, e.g. `[1f389]` for 🎉.
//!
//! Color mode works in two passes, because where a continued text draw
//! leaves the pen is only known after the canvas has wrapped the line:
//!
//! 1. Every run is drawn in order. Each emoji with a raster in the atlas is
//!    replaced by a placeholder of no-break spaces about as wide as the
//!    emoji, and the canvas flow position is recorded right before the
//!    placeholder is drawn.
//! 2. Once the text has been drawn, every recorded placement gets its raster
//!    painted over the placeholder, centered horizontally in the placeholder
//!    and vertically in the line.
//!
//! If a placeholder wraps onto a new line or page, the position recorded
//! before the draw is stale; the canvas-reported origin of the placeholder
//! fragment is used instead.

use std::sync::Arc;

use crate::canvas::{Canvas, Cursor, Rect, RunStyle, TextAlign, TextOptions};
use crate::error::Result;
use crate::font::FontKey;
use crate::image_loader::LoadedImage;

use super::{contains_emoji, emoji_units, split_emoji_segments, twemoji_codepoints, EmojiAtlas};

const NBSP: char = '\u{00A0}';

/// A raster waiting to be painted over its placeholder.
#[derive(Debug, Clone)]
pub struct EmojiPlacement {
    pub image: Arc<LoadedImage>,
    pub page: usize,
    /// Left edge of the placeholder.
    pub x: f64,
    /// Top of the line the placeholder sits on.
    pub y: f64,
    pub placeholder_width: f64,
    pub line_height: f64,
    /// Edge length of the square raster.
    pub size: f64,
}

/// Readable stand-in for one emoji when no emoji font is registered.
pub fn fallback_label(emoji: &str) -> String {
    format!("[{}]", twemoji_codepoints(emoji))
}

/// A piece of text ready to draw: plain, monochrome emoji, or a color
/// placeholder.
enum Piece<'t> {
    Text(&'t str),
    Mono(String),
    Color {
        image: Arc<LoadedImage>,
        placeholder: String,
    },
}

/// Emoji-aware text drawing for one inline run.
pub struct EmojiOverlay<'a> {
    atlas: Option<&'a EmojiAtlas>,
    emoji_font: Option<&'a str>,
    pending: Vec<EmojiPlacement>,
}

impl<'a> EmojiOverlay<'a> {
    /// `atlas` switches on color mode; `emoji_font` is the family used for
    /// monochrome emoji (and color misses).
    pub fn new(atlas: Option<&'a EmojiAtlas>, emoji_font: Option<&'a str>) -> Self {
        Self {
            atlas,
            emoji_font,
            pending: Vec::new(),
        }
    }

    /// Placements recorded by pass one that have not been painted yet.
    pub fn pending(&self) -> &[EmojiPlacement] {
        &self.pending
    }

    fn mono_style(&self, style: &RunStyle) -> RunStyle {
        let mut mono = style.clone();
        if let Some(family) = self.emoji_font {
            mono.font.key = FontKey::new(family, 400, false);
        }
        mono
    }

    /// What a monochrome emoji run is drawn as.
    fn mono_text(&self, emoji: &str) -> String {
        match self.emoji_font {
            Some(_) => emoji.to_string(),
            None => emoji_units(emoji).map(fallback_label).collect(),
        }
    }

    fn placeholder<C: Canvas + ?Sized>(canvas: &C, style: &RunStyle) -> String {
        let nbsp_width = canvas.measure_text(&NBSP.to_string(), &style.font);
        let count = if nbsp_width > 0.0 {
            (style.font.size / nbsp_width).ceil().max(1.0) as usize
        } else {
            1
        };
        std::iter::repeat(NBSP).take(count).collect()
    }

    /// Cut text into drawable pieces. Consecutive misses share one piece so
    /// a run of unknown emoji is a single monochrome draw.
    fn pieces<'t, C: Canvas + ?Sized>(&self, canvas: &C, text: &'t str, style: &RunStyle) -> Vec<Piece<'t>> {
        let mut pieces = Vec::new();
        for segment in split_emoji_segments(text) {
            if !segment.is_emoji {
                pieces.push(Piece::Text(segment.text));
                continue;
            }
            let Some(atlas) = self.atlas else {
                pieces.push(Piece::Mono(self.mono_text(segment.text)));
                continue;
            };
            for unit in emoji_units(segment.text) {
                match (atlas.get(unit), pieces.last_mut()) {
                    (Some(image), _) => pieces.push(Piece::Color {
                        image: Arc::clone(image),
                        placeholder: Self::placeholder(canvas, style),
                    }),
                    (None, Some(Piece::Mono(prev))) => prev.push_str(&self.mono_text(unit)),
                    (None, _) => pieces.push(Piece::Mono(self.mono_text(unit))),
                }
            }
        }
        pieces
    }

    /// Pass one: draw `text` into the flow at the cursor. Every piece but the
    /// last is drawn continued; the last honors `opts.continued`. Only the
    /// first draw uses `opts.at` and `opts.width`.
    pub fn draw_text<C: Canvas + ?Sized>(
        &mut self,
        canvas: &mut C,
        cursor: &mut Cursor,
        text: &str,
        style: &RunStyle,
        opts: &TextOptions,
    ) -> Result<()> {
        if !contains_emoji(text) {
            return canvas.draw_text(cursor, text, style, opts);
        }

        let pieces = self.pieces(&*canvas, text, style);
        let count = pieces.len();
        let mono = self.mono_style(style);
        for (i, piece) in pieces.into_iter().enumerate() {
            let piece_opts = TextOptions {
                continued: i + 1 < count || opts.continued,
                at: if i == 0 { opts.at } else { None },
                width: if i == 0 { opts.width } else { None },
                line_gap: opts.line_gap,
            };
            match piece {
                Piece::Text(t) => canvas.draw_text(cursor, t, style, &piece_opts)?,
                Piece::Mono(t) => canvas.draw_text(cursor, &t, &mono, &piece_opts)?,
                Piece::Color { image, placeholder } => {
                    let (x, y) = match piece_opts.at {
                        Some(at) => at,
                        None => canvas.flow_position(cursor),
                    };
                    let page = cursor.page;
                    canvas.draw_text(cursor, &placeholder, style, &piece_opts)?;
                    let (page, x, y) = match canvas.last_text_origin() {
                        Some(origin) if origin.page != page || origin.x != x || origin.y != y => {
                            log::debug!("emoji placeholder wrapped; using drawn origin");
                            (origin.page, origin.x, origin.y)
                        }
                        _ => (page, x, y),
                    };
                    self.pending.push(EmojiPlacement {
                        image,
                        page,
                        x,
                        y,
                        placeholder_width: canvas.measure_text(&placeholder, &style.font),
                        line_height: canvas.line_height(&style.font),
                        size: style.font.size,
                    });
                }
            }
        }
        Ok(())
    }

    /// Draw a single line of cell text inside `rect`, honoring alignment.
    /// Text without emoji goes through the canvas text box (wrapped and
    /// clipped); text with emoji is laid out on one line from an x computed
    /// from the measured total width, and its rasters are painted at once.
    pub fn draw_cell<C: Canvas + ?Sized>(
        &mut self,
        canvas: &mut C,
        page: usize,
        rect: Rect,
        text: &str,
        style: &RunStyle,
        align: TextAlign,
    ) -> Result<()> {
        if !contains_emoji(text) {
            return canvas.draw_text_box(page, rect, text, style, align);
        }

        let pieces = self.pieces(&*canvas, text, style);
        let mono = self.mono_style(style);
        let width_of = |canvas: &C, piece: &Piece<'_>| match piece {
            Piece::Text(t) => canvas.measure_text(t, &style.font),
            Piece::Mono(t) => canvas.measure_text(t, &mono.font),
            Piece::Color { placeholder, .. } => canvas.measure_text(placeholder, &style.font),
        };
        let total: f64 = pieces.iter().map(|p| width_of(&*canvas, p)).sum();
        let mut x = match align {
            TextAlign::Left => rect.x,
            TextAlign::Center => rect.x + (rect.width - total) / 2.0,
            TextAlign::Right => rect.x + rect.width - total,
        };

        let line_height = canvas.line_height(&style.font);
        for piece in &pieces {
            let advance = match piece {
                Piece::Text(t) => canvas.draw_text_at(page, x, rect.y, t, style)?,
                Piece::Mono(t) => canvas.draw_text_at(page, x, rect.y, t, &mono)?,
                Piece::Color { image, placeholder } => {
                    let width = canvas.draw_text_at(page, x, rect.y, placeholder, style)?;
                    self.pending.push(EmojiPlacement {
                        image: Arc::clone(image),
                        page,
                        x,
                        y: rect.y,
                        placeholder_width: width,
                        line_height,
                        size: style.font.size,
                    });
                    width
                }
            };
            x += advance;
        }
        self.flush(canvas)
    }

    /// Pass two: paint every pending raster and clear the list.
    pub fn flush<C: Canvas + ?Sized>(&mut self, canvas: &mut C) -> Result<()> {
        for placement in self.pending.drain(..) {
            let rect = Rect::new(
                placement.x + (placement.placeholder_width - placement.size) / 2.0,
                placement.y + (placement.line_height - placement.size) / 2.0,
                placement.size,
                placement.size,
            );
            canvas.draw_image(placement.page, &placement.image, rect)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawOp, FontSpec, Frame, PdfCanvas};
    use crate::font::FontContext;
    use crate::image_loader::ImagePixelData;
    use crate::style::{Color, Edges, PageLayout, PageSize};

    fn frame(width: f64) -> Frame {
        Frame::from_layout(&PageLayout {
            page_size: PageSize::Custom {
                width,
                height: 400.0,
            },
            margins: Edges::uniform(20.0),
        })
    }

    fn body() -> RunStyle {
        RunStyle::plain(FontSpec::new(FontKey::new("Helvetica", 400, false), 12.0), Color::BLACK)
    }

    fn raster() -> LoadedImage {
        LoadedImage {
            pixel_data: ImagePixelData::Decoded {
                rgb: vec![255, 200, 0],
                alpha: None,
            },
            width_px: 1,
            height_px: 1,
        }
    }

    fn party_atlas() -> EmojiAtlas {
        let mut atlas = EmojiAtlas::new();
        atlas.insert("🎉", raster());
        atlas
    }

    fn image_rects(canvas: &PdfCanvas<'_>) -> Vec<(usize, Rect)> {
        canvas
            .pages()
            .iter()
            .enumerate()
            .flat_map(|(i, page)| {
                page.ops.iter().filter_map(move |op| match op {
                    DrawOp::Image { rect, .. } => Some((i, *rect)),
                    _ => None,
                })
            })
            .collect()
    }

    #[test]
    fn test_color_placement_sits_after_preceding_text() {
        let fonts = FontContext::new();
        let f = frame(400.0);
        let mut canvas = PdfCanvas::new(&fonts, f);
        let mut cursor = Cursor::new(f);
        let atlas = party_atlas();
        let mut overlay = EmojiOverlay::new(Some(&atlas), None);
        let style = body();

        overlay
            .draw_text(&mut canvas, &mut cursor, "Hi 🎉 there", &style, &TextOptions::default())
            .unwrap();

        let placements = overlay.pending().to_vec();
        assert_eq!(placements.len(), 1);
        let lead = canvas.measure_text("Hi ", &style.font);
        let p = &placements[0];
        assert!((p.x - (f.left() + lead)).abs() < 1e-9);
        assert!(p.placeholder_width >= style.font.size);
        assert_eq!(p.y, f.top());

        overlay.flush(&mut canvas).unwrap();
        let rects = image_rects(&canvas);
        assert_eq!(rects.len(), 1);
        let rect = rects[0].1;
        assert!(rect.x >= f.left() + lead);
        assert!(rect.x + rect.width <= f.left() + lead + p.placeholder_width + 1e-9);
        assert!(overlay.pending().is_empty());
        let placeholder = EmojiOverlay::placeholder(&canvas, &style);
        assert_eq!(canvas.pages()[0].text(), format!("Hi {} there", placeholder));
    }

    #[test]
    fn test_miss_falls_back_to_one_monochrome_draw() {
        let fonts = FontContext::new();
        let f = frame(400.0);
        let mut canvas = PdfCanvas::new(&fonts, f);
        let mut cursor = Cursor::new(f);
        let atlas = EmojiAtlas::new();
        let mut overlay = EmojiOverlay::new(Some(&atlas), Some("NotoEmoji"));
        let flag = "🏳\u{FE0F}\u{200D}🌈";

        overlay
            .draw_text(&mut canvas, &mut cursor, &format!("Hi {}", flag), &body(), &TextOptions::default())
            .unwrap();
        overlay.flush(&mut canvas).unwrap();

        assert!(image_rects(&canvas).is_empty());
        let emoji_draws: Vec<&DrawOp> = canvas.pages()[0]
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Text { font, .. } if font.family == "NotoEmoji"))
            .collect();
        assert_eq!(emoji_draws.len(), 1);
        match emoji_draws[0] {
            DrawOp::Text { text, .. } => assert_eq!(text, flag),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_monochrome_mode_has_no_images() {
        let fonts = FontContext::new();
        let f = frame(400.0);
        let mut canvas = PdfCanvas::new(&fonts, f);
        let mut cursor = Cursor::new(f);
        let mut overlay = EmojiOverlay::new(None, Some("NotoEmoji"));

        overlay
            .draw_text(&mut canvas, &mut cursor, "a 🎉🔥 b", &body(), &TextOptions::default())
            .unwrap();
        assert!(overlay.pending().is_empty());
        let texts: Vec<String> = canvas.pages()[0]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["a ", "🎉🔥", " b"]);
    }

    #[test]
    fn test_wrapped_placeholder_uses_drawn_origin() {
        let fonts = FontContext::new();
        // 60pt of text width: the words fill the first line.
        let f = frame(100.0);
        let mut canvas = PdfCanvas::new(&fonts, f);
        let mut cursor = Cursor::new(f);
        let atlas = party_atlas();
        let mut overlay = EmojiOverlay::new(Some(&atlas), None);
        let style = body();

        overlay
            .draw_text(&mut canvas, &mut cursor, "Hello all of 🎉", &style, &TextOptions::default())
            .unwrap();

        let p = &overlay.pending()[0];
        let line = canvas.line_height(&style.font);
        assert_eq!(p.x, f.left(), "placeholder starts the next line");
        assert!((p.y - (f.top() + line)).abs() < 1e-9);
    }

    #[test]
    fn test_cell_alignment_computes_start_x() {
        let fonts = FontContext::new();
        let f = frame(400.0);
        let mut canvas = PdfCanvas::new(&fonts, f);
        let atlas = party_atlas();
        let mut overlay = EmojiOverlay::new(Some(&atlas), None);
        let style = body();
        let rect = Rect::new(100.0, 50.0, 120.0, 14.0);

        overlay
            .draw_cell(&mut canvas, 0, rect, "ok 🎉", &style, TextAlign::Right)
            .unwrap();

        let rects = image_rects(&canvas);
        assert_eq!(rects.len(), 1);
        let placeholder = EmojiOverlay::placeholder(&canvas, &style);
        let placeholder_w = canvas.measure_text(&placeholder, &style.font);
        let start = rect.x + rect.width - canvas.measure_text("ok ", &style.font) - placeholder_w;
        match &canvas.pages()[0].ops[0] {
            DrawOp::Text { x, text, .. } => {
                assert_eq!(text, "ok ");
                assert!((x - start).abs() < 1e-9);
            }
            other => panic!("expected text first, got {:?}", other),
        }
        let image = rects[0].1;
        assert!(image.x + image.width <= rect.x + rect.width + 1e-9);
    }

    #[test]
    fn test_monochrome_without_font_draws_one_label_per_emoji() {
        let fonts = FontContext::new();
        let f = frame(400.0);
        let mut canvas = PdfCanvas::new(&fonts, f);
        let mut cursor = Cursor::new(f);
        let mut overlay = EmojiOverlay::new(None, None);
        let family = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";

        overlay
            .draw_text(&mut canvas, &mut cursor, &format!("Family {}🎉 here", family), &body(), &TextOptions::default())
            .unwrap();
        assert_eq!(
            canvas.pages()[0].text(),
            "Family [1f468-200d-1f469-200d-1f467][1f389] here"
        );
    }

    #[test]
    fn test_atlas_miss_without_font_uses_label() {
        let fonts = FontContext::new();
        let f = frame(400.0);
        let mut canvas = PdfCanvas::new(&fonts, f);
        let mut cursor = Cursor::new(f);
        let atlas = party_atlas();
        let mut overlay = EmojiOverlay::new(Some(&atlas), None);

        overlay
            .draw_text(&mut canvas, &mut cursor, "🎉🔥", &body(), &TextOptions::default())
            .unwrap();
        overlay.flush(&mut canvas).unwrap();
        assert_eq!(image_rects(&canvas).len(), 1);
        assert!(canvas.pages()[0].text().ends_with("[1f525]"));
    }
}
