//! Fixed-grid tables.
//!
//! Columns share the column width equally and every row has the same
//! height: one body line plus cell padding. Cell text longer than its cell
//! wraps inside the cell and is clipped at the row's bottom edge. Rows never
//! split; a row that does not fit moves to the next page, and the header is
//! not repeated there.

use crate::canvas::{Canvas, Cursor, Rect, RunStyle, Stroke, TextAlign};
use crate::emoji::EmojiOverlay;
use crate::error::Result;
use crate::model::{plain_text, Alignment, InlineRun, Table};

use super::{Column, LayoutEngine};

const BORDER_WIDTH: f64 = 0.5;

fn text_align(alignment: Alignment) -> TextAlign {
    match alignment {
        Alignment::Center => TextAlign::Center,
        Alignment::Right => TextAlign::Right,
        Alignment::None | Alignment::Left => TextAlign::Left,
    }
}

struct Grid {
    x: f64,
    width: f64,
    col_width: f64,
    row_height: f64,
    columns: usize,
}

pub fn layout_table<C: Canvas + ?Sized>(
    engine: &LayoutEngine<'_>,
    canvas: &mut C,
    cursor: &mut Cursor,
    table: &Table,
    column: Column,
) -> Result<()> {
    let columns = table.column_count();
    if columns == 0 {
        log::trace!("skipping table without columns");
        return Ok(());
    }
    let theme = engine.theme();
    let style = &theme.table;
    let grid = Grid {
        x: column.x,
        width: column.width,
        col_width: column.width / columns as f64,
        row_height: theme.body.font_size + style.cell_padding * 2.0 + 4.0,
        columns,
    };
    let body = LayoutEngine::run_style(&theme.body);
    let mut header = body.clone();
    header.font.key = header.font.key.styled(true, false);
    let mut overlay = EmojiOverlay::new(engine.resources().emoji_atlas(), engine.options().emoji_font.as_deref());

    cursor.ensure_space(canvas, grid.row_height * 2.0)?;
    canvas.fill_rect(
        cursor.page,
        Rect::new(grid.x, cursor.y, grid.width, grid.row_height),
        style.header_background,
    )?;
    draw_row(engine, canvas, &mut overlay, cursor, &grid, &table.header, &table.alignments, &header)?;

    for row in &table.rows {
        cursor.ensure_space(canvas, grid.row_height)?;
        draw_row(engine, canvas, &mut overlay, cursor, &grid, row, &table.alignments, &body)?;
    }

    cursor.return_to_margin();
    cursor.advance(engine.body_line(canvas) * 0.5);
    Ok(())
}

/// Draw one row's cells and grid lines at the cursor, then move below it.
/// Missing trailing cells are left empty; cells past the header's column
/// count are dropped.
#[allow(clippy::too_many_arguments)]
fn draw_row<C: Canvas + ?Sized>(
    engine: &LayoutEngine<'_>,
    canvas: &mut C,
    overlay: &mut EmojiOverlay<'_>,
    cursor: &mut Cursor,
    grid: &Grid,
    cells: &[InlineRun],
    alignments: &[Alignment],
    style: &RunStyle,
) -> Result<()> {
    let pad = engine.theme().table.cell_padding;
    let y = cursor.y;
    for (i, cell) in cells.iter().take(grid.columns).enumerate() {
        let text = plain_text(cell);
        if text.is_empty() {
            continue;
        }
        let rect = Rect::new(
            grid.x + i as f64 * grid.col_width + pad,
            y + pad,
            (grid.col_width - pad * 2.0).max(0.0),
            (grid.row_height - pad * 2.0).max(0.0),
        );
        let align = text_align(alignments.get(i).copied().unwrap_or_default());
        overlay.draw_cell(canvas, cursor.page, rect, &text, style, align)?;
    }

    let stroke = Stroke {
        color: engine.theme().table.border_color,
        width: BORDER_WIDTH,
    };
    canvas.stroke_rect(cursor.page, Rect::new(grid.x, y, grid.width, grid.row_height), stroke)?;
    for i in 1..grid.columns {
        let x = grid.x + i as f64 * grid.col_width;
        canvas.stroke_line(cursor.page, (x, y), (x, y + grid.row_height), stroke)?;
    }
    cursor.advance(grid.row_height);
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

    fn render(markdown: &str, height: f64) -> Vec<CanvasPage> {
        let fonts = FontContext::new();
        let doc = parse_markdown(markdown);
        let theme = Theme::default();
        let resources = Resources::empty();
        let options = LayoutOptions::default();
        let engine = LayoutEngine::new(&doc, &theme, &resources, &options);
        let frame = Frame::from_layout(&PageLayout {
            page_size: PageSize::Custom { width: 400.0, height },
            margins: Edges::uniform(40.0),
        });
        let mut canvas = PdfCanvas::new(&fonts, frame);
        engine.layout(&mut canvas).unwrap();
        canvas.into_pages()
    }

    fn count(pages: &[CanvasPage], pred: impl Fn(&DrawOp) -> bool) -> usize {
        pages.iter().flat_map(|p| p.ops.iter()).filter(|op| pred(op)).count()
    }

    const TABLE: &str = "| A | B | C |\n|---|:-:|--:|\n| 1 | 2 | 3 |\n| 4 | 5 | 6 |\n";

    #[test]
    fn test_grid_lines_and_single_header_fill() {
        let pages = render(TABLE, 600.0);
        let theme = Theme::default();
        assert_eq!(count(&pages, |op| matches!(op, DrawOp::StrokeRect { .. })), 3);
        assert_eq!(count(&pages, |op| matches!(op, DrawOp::Line { .. })), 3 * 2);
        assert_eq!(
            count(&pages, |op| matches!(op, DrawOp::FillRect { color, .. } if *color == theme.table.header_background)),
            1
        );
    }

    #[test]
    fn test_header_is_bold_and_alignment_honored() {
        let pages = render(TABLE, 600.0);
        let texts: Vec<(f64, String, bool)> = pages[0]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { x, text, font, .. } => Some((*x, text.clone(), font.is_bold())),
                _ => None,
            })
            .collect();
        assert!(texts[..3].iter().all(|(_, _, bold)| *bold));
        assert!(texts[3..].iter().all(|(_, _, bold)| !*bold));

        let col_width = 320.0 / 3.0;
        let pad = Theme::default().table.cell_padding;
        // left, center, right
        assert_eq!(texts[3].0, 40.0 + pad);
        let two = texts[4].0;
        assert!(two > 40.0 + col_width + pad && two < 40.0 + col_width * 1.5);
        let three = texts[5].0;
        assert!(three > 40.0 + col_width * 2.5);
    }

    #[test]
    fn test_rows_move_to_next_page_without_header() {
        let mut md = String::from("| H |\n|---|\n");
        for i in 0..30 {
            md.push_str(&format!("| row {} |\n", i));
        }
        let pages = render(&md, 300.0);
        assert!(pages.len() > 1);
        let theme = Theme::default();
        let fills_on_second = pages[1]
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::FillRect { color, .. } if *color == theme.table.header_background))
            .count();
        assert_eq!(fills_on_second, 0);
        assert_eq!(count(&pages, |op| matches!(op, DrawOp::StrokeRect { .. })), 31);
        for page in &pages {
            for op in &page.ops {
                if let DrawOp::StrokeRect { rect, .. } = op {
                    assert!(rect.y + rect.height <= 260.0 + 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_long_cell_text_is_clipped_to_row() {
        let md = format!("| A |\n|---|\n| {} |\n", "word ".repeat(80));
        let pages = render(&md, 600.0);
        let theme = Theme::default();
        let pad = theme.table.cell_padding;
        let row_h = theme.body.font_size + pad * 2.0 + 4.0;
        let body_row_top = 40.0 + row_h;
        for op in &pages[0].ops {
            if let DrawOp::Text { y, .. } = op {
                assert!(*y < body_row_top + row_h);
            }
        }
    }
}
