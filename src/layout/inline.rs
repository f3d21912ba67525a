//! Inline flow: draws a run of styled spans as one wrapped text flow.
//!
//! The inline tree is first flattened into spans that carry the
//! accumulated bold/italic/strike/link state of their ancestors. Spans are
//! then drawn in order, every one but the last as a continued draw, so the
//! canvas keeps a single pen position across style changes and wraps the
//! run as a whole.

use crate::canvas::{Canvas, Cursor, FontSpec, RunStyle, TextOptions};
use crate::emoji::EmojiOverlay;
use crate::error::Result;
use crate::font::FontKey;
use crate::model::Inline;

use super::{Column, LayoutEngine};

/// Where the first span of a run starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowStart {
    /// Open a new flow at the cursor's y, wrapping within `width` from `x`.
    NewLine { x: f64, width: f64 },
    /// Continue the flow a previous continued draw left open.
    Continue,
}

impl FlowStart {
    pub fn new_line(column: Column) -> Self {
        FlowStart::NewLine {
            x: column.x,
            width: column.width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanKind {
    Text,
    Code,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Marks<'r> {
    bold: bool,
    italic: bool,
    strike: bool,
    link: Option<&'r str>,
}

#[derive(Debug, Clone, PartialEq)]
struct Span<'r> {
    text: String,
    kind: SpanKind,
    marks: Marks<'r>,
}

/// Flatten an inline tree into spans. Adjacent text spans with the same
/// marks are merged.
fn collect_spans(run: &[Inline]) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    collect_into(run, Marks::default(), &mut spans);
    spans
}

fn push_text<'r>(spans: &mut Vec<Span<'r>>, text: &str, marks: Marks<'r>) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = spans.last_mut() {
        if last.kind == SpanKind::Text && last.marks == marks {
            last.text.push_str(text);
            return;
        }
    }
    spans.push(Span {
        text: text.to_string(),
        kind: SpanKind::Text,
        marks,
    });
}

fn collect_into<'r>(run: &'r [Inline], marks: Marks<'r>, spans: &mut Vec<Span<'r>>) {
    for inline in run {
        match inline {
            Inline::Text(text) | Inline::Raw(text) => push_text(spans, text, marks),
            Inline::Bold(inner) => collect_into(inner, Marks { bold: true, ..marks }, spans),
            Inline::Italic(inner) => collect_into(inner, Marks { italic: true, ..marks }, spans),
            Inline::BoldItalic(inner) => collect_into(
                inner,
                Marks {
                    bold: true,
                    italic: true,
                    ..marks
                },
                spans,
            ),
            Inline::Strikethrough(inner) => collect_into(inner, Marks { strike: true, ..marks }, spans),
            Inline::Code(code) => {
                if !code.is_empty() {
                    spans.push(Span {
                        text: code.clone(),
                        kind: SpanKind::Code,
                        marks,
                    });
                }
            }
            Inline::Link { href, label } => {
                let marks = Marks {
                    link: Some(href.as_str()),
                    ..marks
                };
                if label.is_empty() {
                    push_text(spans, href, marks);
                } else {
                    collect_into(label, marks, spans);
                }
            }
            Inline::LineBreak => push_text(spans, "\n", marks),
            Inline::Image { alt, .. } => push_text(spans, alt, marks),
        }
    }
}

/// Draw an inline run into the flow. The last span closes the flow, so the
/// cursor ends at the start of the line below the run.
pub fn draw_run<C: Canvas + ?Sized>(
    engine: &LayoutEngine<'_>,
    canvas: &mut C,
    cursor: &mut Cursor,
    run: &[Inline],
    base: &RunStyle,
    line_gap: f64,
    start: FlowStart,
) -> Result<()> {
    let spans = collect_spans(run);
    if spans.is_empty() {
        if start == FlowStart::Continue {
            canvas.end_flow(cursor);
        }
        return Ok(());
    }

    let theme = engine.theme();
    let options = engine.options();
    let mut overlay = EmojiOverlay::new(engine.resources().emoji_atlas(), options.emoji_font.as_deref());
    let count = spans.len();

    for (i, span) in spans.iter().enumerate() {
        let mut opts = TextOptions {
            continued: i + 1 < count,
            line_gap,
            ..Default::default()
        };
        if let (0, FlowStart::NewLine { x, width }) = (i, start) {
            opts.at = Some((x, cursor.y));
            opts.width = Some(width);
        }

        let mut style = base.clone();
        style.font.key = style.font.key.styled(span.marks.bold, span.marks.italic);
        style.strike = span.marks.strike;
        if let Some(href) = span.marks.link {
            style.color = theme.link_color;
            style.underline = true;
            style.link = Some(href.to_string());
        }

        match span.kind {
            SpanKind::Text => overlay.draw_text(canvas, cursor, &span.text, &style, &opts)?,
            SpanKind::Code => {
                let code = &theme.inline_code;
                style.font = FontSpec::new(FontKey::from_name(&code.font), code.font_size);
                if span.marks.link.is_none() {
                    style.color = code.color;
                }
                style.background = Some(code.background);
                canvas.draw_text(cursor, &span.text, &style, &opts)?;
            }
        }
    }
    overlay.flush(canvas)
}
