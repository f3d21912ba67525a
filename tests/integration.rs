//! Integration tests for the quire rendering pipeline.
//!
//! These tests run Markdown through parse, resource gathering, layout and
//! PDF serialization. They verify:
//! - text never starts outside the printable frame
//! - headings, tables, lists and code blocks keep their geometry
//! - rendering is deterministic
//! - color emoji overlay and monochrome fallback
//! - configuration reaches the output

use quire::canvas::{CanvasPage, DrawOp};
use quire::config::RenderConfig;
use quire::error::{QuireError, Result};
use quire::font::{FontContext, FontKey};
use quire::style::{Color, Edges, PageLayout, PageSize, Theme};
use quire::{render_markdown, RenderOptions, Renderer};

// ─── Helpers ────────────────────────────────────────────────────

fn small_page_options() -> RenderOptions {
    RenderOptions {
        page: PageLayout {
            page_size: PageSize::Custom {
                width: 360.0,
                height: 360.0,
            },
            margins: Edges::uniform(36.0),
        },
        compress: false,
        ..Default::default()
    }
}

fn layout(markdown: &str, options: RenderOptions) -> Vec<CanvasPage> {
    Renderer::new(options).unwrap().layout(markdown).unwrap()
}

fn all_ops(pages: &[CanvasPage]) -> impl Iterator<Item = (usize, &DrawOp)> {
    pages
        .iter()
        .enumerate()
        .flat_map(|(i, page)| page.ops.iter().map(move |op| (i, op)))
}

fn texts(pages: &[CanvasPage]) -> Vec<(usize, f64, f64, String)> {
    all_ops(pages)
        .filter_map(|(page, op)| match op {
            DrawOp::Text { x, y, text, .. } => Some((page, *x, *y, text.clone())),
            _ => None,
        })
        .collect()
}

fn png_bytes(rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb(rgb));
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(encoder, img.as_raw(), 4, 4, image::ColorType::Rgb8).unwrap();
    buf
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 50, "PDF too small to be valid");
    assert!(bytes.starts_with(b"%PDF-1.7"), "Missing PDF header");
    assert!(bytes.windows(5).any(|w| w == b"%%EOF"), "Missing %%EOF marker");
    assert!(bytes.windows(4).any(|w| w == b"xref"), "Missing xref table");
    assert!(bytes.windows(7).any(|w| w == b"trailer"), "Missing trailer");
}

const MIXED: &str = r#"# Release notes

Quire lays out **Markdown** into pages. It keeps *emphasis*, `inline code`,
[links](https://example.com) and ~~mistakes~~ in one flow.

## Changes

1. Faster tables
2. Nested lists
   - with bullets
   - and more bullets
3. Code blocks

> Quoted text wraps inside the quote and keeps its bar on every page it
> touches, even when it runs long enough to cross a page boundary.

| Feature | Status | Notes |
|:--------|:------:|------:|
| Tables  | done   | equal columns |
| Emoji   | done   | two passes |

```rust
fn main() {
    println!("hello");
}
```

---

The end.
"#;

// ─── Pipeline ───────────────────────────────────────────────────

#[test]
fn test_empty_document_is_one_blank_page() {
    let pages = layout("", RenderOptions::default());
    assert_eq!(pages.len(), 1);
    assert!(pages[0].ops.is_empty());
    let pdf = render_markdown("", &RenderOptions::default()).unwrap();
    assert_valid_pdf(&pdf);
}

#[test]
fn test_mixed_document_produces_valid_pdf() {
    let pdf = render_markdown(MIXED, &RenderOptions::default()).unwrap();
    assert_valid_pdf(&pdf);
    let compressed_len = pdf.len();
    let options = RenderOptions {
        compress: false,
        ..Default::default()
    };
    let plain = render_markdown(MIXED, &options).unwrap();
    assert_valid_pdf(&plain);
    assert!(plain.len() > compressed_len);
    let text = String::from_utf8_lossy(&plain);
    assert!(text.contains("/URI (https://example.com)"));
}

#[test]
fn test_rendering_is_deterministic() {
    let options = small_page_options();
    let first = render_markdown(MIXED, &options).unwrap();
    let second = render_markdown(MIXED, &options).unwrap();
    assert_eq!(first, second);
}

// ─── Pagination ─────────────────────────────────────────────────

#[test]
fn test_text_never_starts_outside_frame() {
    let long = MIXED.repeat(4);
    let options = small_page_options();
    let frame_top = 36.0;
    let frame_bottom = 360.0 - 36.0;
    let pages = layout(&long, options);
    assert!(pages.len() > 3);

    let fonts = FontContext::new();
    for (_, op) in all_ops(&pages) {
        if let DrawOp::Text { y, font, size, text, .. } = op {
            let line = fonts.line_height(font, *size);
            assert!(*y >= frame_top - 1e-6, "{:?} starts above the frame at {}", text, y);
            assert!(
                y + line <= frame_bottom + 1e-6,
                "{:?} at {} runs past the bottom ({})",
                text,
                y,
                frame_bottom
            );
        }
    }
}

#[test]
fn test_heading_spacing_per_level() {
    let pages = layout("# One\n\n## Two\n\n### Three\n", RenderOptions::default());
    let theme = Theme::default();
    let fonts = FontContext::new();
    let drawn: Vec<(f64, f64, String)> = all_ops(&pages)
        .filter_map(|(_, op)| match op {
            DrawOp::Text { y, size, text, .. } => Some((*y, *size, text.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(drawn.len(), 3);

    let mut expected_y = 50.0;
    for (level, (y, size, _)) in drawn.iter().enumerate() {
        let style = theme.heading(level as u8 + 1);
        assert_eq!(*size, style.font_size);
        expected_y += style.font_size * 0.8;
        assert!((y - expected_y).abs() < 1e-6, "level {} at {} (expected {})", level + 1, y, expected_y);
        let line = fonts.line_height(&FontKey::from_name(&style.font), style.font_size);
        expected_y += line + style.line_gap + style.font_size * 0.3;
    }
}

#[test]
fn test_table_grid_counts() {
    let md = "| A | B | C | D |\n|---|---|---|---|\n| 1 | 2 | 3 | 4 |\n| 5 | 6 | 7 | 8 |\n| 9 | 10 | 11 | 12 |\n";
    let pages = layout(md, RenderOptions::default());
    let theme = Theme::default();
    let (h, r) = (4, 3);
    let outlines = all_ops(&pages).filter(|(_, op)| matches!(op, DrawOp::StrokeRect { .. })).count();
    let verticals = all_ops(&pages).filter(|(_, op)| matches!(op, DrawOp::Line { .. })).count();
    let header_fills = all_ops(&pages)
        .filter(|(_, op)| matches!(op, DrawOp::FillRect { color, .. } if *color == theme.table.header_background))
        .count();
    assert_eq!(outlines, r + 1);
    assert_eq!(verticals, (r + 1) * (h - 1));
    assert_eq!(header_fills, 1);
}

#[test]
fn test_ordered_list_start_at_any_depth() {
    let md = "5. a\n6. b\n7. c\n\n- outer\n\n  5. x\n  6. y\n  7. z\n";
    let pages = layout(md, RenderOptions::default());
    let markers: Vec<(f64, String)> = texts(&pages)
        .into_iter()
        .filter(|(_, _, _, t)| t.ends_with('.'))
        .map(|(_, x, _, t)| (x, t))
        .collect();
    let labels: Vec<&str> = markers.iter().map(|(_, t)| t.as_str()).collect();
    assert_eq!(labels, vec!["5.", "6.", "7.", "5.", "6.", "7."]);
    assert!(markers[3].0 > markers[0].0, "nested list is indented");
}

// ─── Code Blocks ────────────────────────────────────────────────

#[test]
fn test_unknown_language_draws_plain_lines() {
    let options = RenderOptions {
        line_numbers: false,
        ..Default::default()
    };
    let pages = layout("```foobar123\nfirst line\n\nthird line\n```\n", options);
    let theme = Theme::default();
    let default = theme.syntax_theme().fallback_color();
    let drawn: Vec<(String, Color)> = all_ops(&pages)
        .filter_map(|(_, op)| match op {
            DrawOp::Text { text, color, .. } => Some((text.clone(), *color)),
            _ => None,
        })
        .collect();
    assert_eq!(
        drawn,
        vec![("first line".to_string(), default), ("third line".to_string(), default)]
    );
}

#[test]
fn test_code_block_spans_pages_with_monotonic_numbers() {
    let body: Vec<String> = (1..=80).map(|i| format!("value_{} = {}", i, i * 2)).collect();
    let md = format!("```python\n{}\n```\n", body.join("\n"));
    let pages = layout(&md, small_page_options());
    assert!(pages.len() >= 2);

    let gutter = Theme::default().syntax_theme().gutter;
    let numbers: Vec<(usize, u32)> = all_ops(&pages)
        .filter_map(|(page, op)| match op {
            DrawOp::Text { text, color, .. } if *color == gutter => text.parse().ok().map(|n| (page, n)),
            _ => None,
        })
        .collect();
    assert_eq!(numbers.first().map(|n| n.1), Some(1));
    assert_eq!(numbers.last().map(|n| n.1), Some(80));
    assert!(numbers.windows(2).all(|w| w[1].1 > w[0].1 && w[1].0 >= w[0].0));
    let last_on_first = numbers.iter().filter(|(p, _)| *p == 0).map(|(_, n)| *n).max();
    let first_on_second = numbers.iter().filter(|(p, _)| *p == 1).map(|(_, n)| *n).min();
    assert_eq!(first_on_second, last_on_first.map(|n| n + 1));
}

#[test]
fn test_highlighted_code_uses_palette_colors() {
    let pages = layout("```rust\n// note\nlet x = \"s\";\n```\n", RenderOptions::default());
    let palette = Theme::default().syntax_theme();
    let comment = palette.color_for(Some("comment"));
    let string = palette.color_for(Some("string"));
    let colors: Vec<(String, Color)> = all_ops(&pages)
        .filter_map(|(_, op)| match op {
            DrawOp::Text { text, color, .. } => Some((text.clone(), *color)),
            _ => None,
        })
        .collect();
    assert!(colors.iter().any(|(t, c)| t.contains("note") && *c == comment), "{:?}", colors);
    assert!(colors.iter().any(|(t, c)| t.contains('s') && *c == string), "{:?}", colors);
}

// ─── Emoji ──────────────────────────────────────────────────────

#[test]
fn test_color_emoji_placement_follows_text() {
    let png = png_bytes([255, 200, 0]);
    let source = move |emoji: &str| -> Result<Vec<u8>> {
        if emoji == "🎉" {
            Ok(png.clone())
        } else {
            Err(QuireError::Image("missing".to_string()))
        }
    };
    let renderer = Renderer::new(RenderOptions::default()).unwrap().with_emoji_source(source);
    let pages = renderer.layout("Hi 🎉 there").unwrap();

    let images: Vec<quire::canvas::Rect> = all_ops(&pages)
        .filter_map(|(_, op)| match op {
            DrawOp::Image { rect, .. } => Some(*rect),
            _ => None,
        })
        .collect();
    assert_eq!(images.len(), 1);

    let theme = Theme::default();
    let fonts = FontContext::new();
    let key = FontKey::from_name(&theme.body.font);
    let lead = 50.0 + fonts.measure_string("Hi", &key, theme.body.font_size);
    let (placeholder_x, placeholder_w) = all_ops(&pages)
        .find_map(|(_, op)| match op {
            DrawOp::Text { x, text, width, .. } if text.starts_with('\u{00A0}') => Some((*x, *width)),
            _ => None,
        })
        .expect("placeholder text");
    assert!(placeholder_x >= lead - 1e-6);
    assert!(images[0].x >= placeholder_x - 1e-6);
    assert!(images[0].x + images[0].width <= placeholder_x + placeholder_w + 1e-6);
}

#[test]
fn test_missing_raster_falls_back_to_monochrome() {
    let source = |_: &str| -> Result<Vec<u8>> { Err(QuireError::Image("none".to_string())) };
    let renderer = Renderer::new(RenderOptions::default()).unwrap().with_emoji_source(source);
    let flag = "🏳\u{FE0F}\u{200D}🌈";
    let pages = renderer.layout(&format!("Hi {}", flag)).unwrap();

    assert_eq!(all_ops(&pages).filter(|(_, op)| matches!(op, DrawOp::Image { .. })).count(), 0);
    let label = quire::emoji::fallback_label(flag);
    assert_eq!(label, "[1f3f3-200d-1f308]");
    let flag_draws = texts(&pages).into_iter().filter(|(_, _, _, t)| *t == label).count();
    assert_eq!(flag_draws, 1);
}

#[test]
fn test_default_options_draw_emoji_as_labels() {
    let options = RenderOptions {
        compress: false,
        ..Default::default()
    };
    let family = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
    let pages = layout(&format!("Family {} here", family), options.clone());
    assert_eq!(pages[0].text(), "Family [1f468-200d-1f469-200d-1f467] here");

    let pdf = render_markdown(&format!("Family {} here", family), &options).unwrap();
    let content = String::from_utf8_lossy(&pdf);
    assert!(content.contains("([1f468-200d-1f469-200d-1f467]) Tj"), "label not in content stream");
    assert!(!content.contains("(?"), "unencodable glyphs leaked into the content stream");
}

// ─── Images ─────────────────────────────────────────────────────

#[test]
fn test_image_block_from_relative_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("dot.png"), png_bytes([0, 0, 255])).unwrap();
    let options = RenderOptions {
        image_base_path: Some(dir.path().to_path_buf()),
        compress: false,
        ..Default::default()
    };
    let pages = layout("![dot](dot.png)\n\n![gone](nope.png)\n", options.clone());
    assert_eq!(all_ops(&pages).filter(|(_, op)| matches!(op, DrawOp::Image { .. })).count(), 1);
    assert!(pages[0].text().contains("[Image: gone]"));

    let pdf = render_markdown("![dot](dot.png)", &options).unwrap();
    assert!(String::from_utf8_lossy(&pdf).contains("/Subtype /Image"));
}

#[test]
fn test_custom_image_resolver() {
    let png = png_bytes([1, 2, 3]);
    let resolver = move |src: &str| -> Result<Vec<u8>> {
        assert_eq!(src, "asset://logo");
        Ok(png.clone())
    };
    let renderer = Renderer::new(RenderOptions::default()).unwrap().with_image_resolver(resolver);
    let pages = renderer.layout("![logo](asset://logo)").unwrap();
    assert!(matches!(pages[0].ops[0], DrawOp::Image { .. }));
}

// ─── Configuration ──────────────────────────────────────────────

#[test]
fn test_config_drives_render() {
    let config = RenderConfig::from_json(
        r#"{
            "theme": "Academic",
            "page": { "pageSize": "A5" },
            "metadata": { "title": "Config Test", "author": "Someone" },
            "compress": false
        }"#,
    )
    .unwrap();
    let options = config.into_options();
    assert_eq!(options.theme.name, "Academic");
    let pdf = render_markdown("# Title", &options).unwrap();
    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains("/MediaBox [0 0 419.53 595.28]"));
    assert!(text.contains("/Title (Config Test)"));
    assert!(text.contains("/Author (Someone)"));
}

#[test]
fn test_missing_emoji_font_is_io_error() {
    let options = RenderOptions {
        emoji_font: Some("does/not/exist.ttf".into()),
        ..Default::default()
    };
    match Renderer::new(options) {
        Err(QuireError::Io { path, .. }) => assert!(path.ends_with("exist.ttf")),
        Err(other) => panic!("expected io error, got {}", other),
        Ok(_) => panic!("expected io error"),
    }
}
