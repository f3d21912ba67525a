//! Bullet and ordered lists, nested to any depth.
//!
//! Every level indents by [`LIST_INDENT`]. The marker starts the item's
//! line and the item's first paragraph continues the same flow, so wrapped
//! lines hang back under the marker. Later blocks of the item, nested
//! lists included, are drawn one level further in.

use crate::canvas::{Canvas, Cursor, TextOptions};
use crate::error::Result;
use crate::model::{Block, List, ListItem};

use super::inline::{self, FlowStart};
use super::{Column, LayoutEngine};

/// Horizontal step per nesting level.
pub const LIST_INDENT: f64 = 20.0;

/// Marker text for the item at `index`.
///
/// ```
/// use quire::layout::list::marker;
/// use quire::model::{List, ListItem};
///
/// let list = List { ordered: true, start: 5, items: vec![ListItem::default(); 3] };
/// assert_eq!(marker(&list, 2), "7.");
/// ```
pub fn marker(list: &List, index: usize) -> String {
    let base = if list.ordered {
        format!("{}.", list.start.saturating_add(index as u64))
    } else {
        "\u{2022}".to_string()
    };
    match list.items.get(index).and_then(|item| item.task) {
        Some(checked) => {
            let check = if checked { "[x]" } else { "[ ]" };
            if list.ordered {
                format!("{} {}", base, check)
            } else {
                check.to_string()
            }
        }
        None => base,
    }
}

pub fn layout_list<C: Canvas + ?Sized>(
    engine: &LayoutEngine<'_>,
    canvas: &mut C,
    cursor: &mut Cursor,
    list: &List,
    column: Column,
    depth: usize,
) -> Result<()> {
    for (index, item) in list.items.iter().enumerate() {
        layout_item(engine, canvas, cursor, list, item, index, column, depth)?;
        cursor.advance(engine.body_line(canvas) * 0.2);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn layout_item<C: Canvas + ?Sized>(
    engine: &LayoutEngine<'_>,
    canvas: &mut C,
    cursor: &mut Cursor,
    list: &List,
    item: &ListItem,
    index: usize,
    column: Column,
    depth: usize,
) -> Result<()> {
    let body = &engine.theme().body;
    let style = LayoutEngine::run_style(body);
    let indent = LIST_INDENT * depth as f64;
    let line = column.inset(indent);

    cursor.ensure_space(canvas, body.font_size * 2.0)?;
    let opts = TextOptions {
        continued: true,
        at: Some((line.x, cursor.y)),
        width: Some(line.width),
        line_gap: body.line_gap,
    };
    canvas.draw_text(cursor, &marker(list, index), &style, &opts)?;
    canvas.draw_text(cursor, " ", &style, &TextOptions::continued(true))?;

    let mut children = item.children.iter().peekable();
    match children.peek().and_then(|id| engine.block(**id)) {
        Some(Block::Paragraph { content }) => {
            let mut text_style = style.clone();
            if column.italic {
                text_style.font.key = text_style.font.key.styled(false, true);
            }
            inline::draw_run(engine, canvas, cursor, content, &text_style, body.line_gap, FlowStart::Continue)?;
            children.next();
        }
        _ => canvas.end_flow(cursor),
    }

    let hanging = column.inset(indent + LIST_INDENT);
    for id in children {
        match engine.block(*id) {
            Some(Block::List(nested)) => layout_list(engine, canvas, cursor, nested, column, depth + 1)?,
            Some(_) => engine.layout_block(canvas, cursor, *id, hanging)?,
            None => log::trace!("skipping dangling list child {:?}", id),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasPage, DrawOp, Frame, PdfCanvas};
    use crate::font::FontContext;
    use crate::layout::LayoutOptions;
    use crate::model::parse::parse_markdown;
    use crate::resources::Resources;
    use crate::style::{Edges, PageLayout, PageSize, Theme};

    fn render(markdown: &str) -> Vec<CanvasPage> {
        let fonts = FontContext::new();
        let doc = parse_markdown(markdown);
        let theme = Theme::default();
        let resources = Resources::empty();
        let options = LayoutOptions::default();
        let engine = LayoutEngine::new(&doc, &theme, &resources, &options);
        let frame = Frame::from_layout(&PageLayout {
            page_size: PageSize::Custom {
                width: 400.0,
                height: 600.0,
            },
            margins: Edges::uniform(40.0),
        });
        let mut canvas = PdfCanvas::new(&fonts, frame);
        engine.layout(&mut canvas).unwrap();
        canvas.into_pages()
    }

    fn texts(page: &CanvasPage) -> Vec<(f64, f64, String)> {
        page.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { x, y, text, .. } => Some((*x, *y, text.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_marker_forms() {
        let mut list = List {
            ordered: false,
            start: 1,
            items: vec![ListItem::default(), ListItem { children: vec![], task: Some(true) }],
        };
        assert_eq!(marker(&list, 0), "\u{2022}");
        assert_eq!(marker(&list, 1), "[x]");
        list.ordered = true;
        list.start = 9;
        assert_eq!(marker(&list, 0), "9.");
        assert_eq!(marker(&list, 1), "10. [x]");
    }

    #[test]
    fn test_ordered_start_numbers_items() {
        let pages = render("5. one\n6. two\n7. three\n");
        let t = texts(&pages[0]);
        let markers: Vec<&str> = t
            .iter()
            .map(|(_, _, s)| s.as_str())
            .filter(|s| s.ends_with('.'))
            .collect();
        assert_eq!(markers, vec!["5.", "6.", "7."]);
        // marker, space and text share one line
        assert_eq!(t[0].1, t[1].1);
        assert!(t[3].1 > t[0].1);
    }

    #[test]
    fn test_nested_list_indents_one_level() {
        let pages = render("- outer\n  - inner\n- next\n");
        let t = texts(&pages[0]);
        let bullets: Vec<f64> = t
            .iter()
            .filter(|(_, _, s)| s.starts_with('\u{2022}'))
            .map(|(x, _, _)| *x)
            .collect();
        assert_eq!(bullets, vec![40.0, 40.0 + LIST_INDENT, 40.0]);
        let inner_y = t.iter().find(|(_, _, s)| s.contains("inner")).map(|(_, y, _)| *y);
        let outer_y = t.iter().find(|(_, _, s)| s.contains("outer")).map(|(_, y, _)| *y);
        assert!(inner_y > outer_y);
    }

    #[test]
    fn test_nested_ordered_list_keeps_its_own_start() {
        let pages = render("- a\n\n  5. x\n  6. y\n  7. z\n");
        let markers: Vec<String> = texts(&pages[0])
            .into_iter()
            .map(|(_, _, s)| s)
            .filter(|s| s.ends_with('.'))
            .collect();
        assert_eq!(markers, vec!["5.", "6.", "7."]);
    }

    #[test]
    fn test_item_with_code_block_uses_hanging_column() {
        let pages = render("- item\n\n  ```\n  code\n  ```\n");
        let code_x = texts(&pages[0])
            .into_iter()
            .find(|(_, _, s)| s == "code")
            .map(|(x, _, _)| x)
            .unwrap();
        assert!(code_x > 40.0 + LIST_INDENT);
    }
}
