//! Markdown to [`Document`] using pulldown-cmark.
//!
//! pulldown-cmark produces a flat event stream; this module folds it back
//! into the block arena. Two stacks drive the fold: one for open block
//! containers (blockquotes, lists, items, tables) and one for open inline
//! frames (a paragraph or heading plus the emphasis/link spans nested in it).

use pulldown_cmark::{
    Alignment as CmarkAlignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};

use super::{Alignment, Block, BlockId, Document, Inline, InlineRun, List, ListItem, Table};

/// Parse CommonMark + GFM (tables, strikethrough, task lists) into a document.
pub fn parse_markdown(markdown: &str) -> Document {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = TreeBuilder::default();
    for event in Parser::new_ext(markdown, options) {
        builder.event(event);
    }
    builder.finish()
}

enum Container {
    Blockquote(Vec<BlockId>),
    List { ordered: bool, start: u64, items: Vec<ListItem> },
    Item(ListItem),
    Table(TableState),
}

#[derive(Default)]
struct TableState {
    alignments: Vec<Alignment>,
    header: Vec<InlineRun>,
    rows: Vec<Vec<InlineRun>>,
    row: Vec<InlineRun>,
}

enum FrameKind {
    Paragraph,
    /// A paragraph opened by bare text in a tight list item.
    Implicit,
    Heading(u8),
    Cell,
    Emphasis,
    Strong,
    Strikethrough,
    Link(String),
    Image(String),
}

struct Frame {
    kind: FrameKind,
    run: InlineRun,
}

#[derive(Default)]
struct TreeBuilder {
    doc: Document,
    containers: Vec<Container>,
    frames: Vec<Frame>,
    code: Option<(Option<String>, String)>,
    html: Option<String>,
}

impl TreeBuilder {
    fn event(&mut self, event: Event<'_>) {
        if let Some((_, buf)) = self.code.as_mut() {
            match event {
                Event::End(TagEnd::CodeBlock) => self.finish_code_block(),
                Event::Text(text) => buf.push_str(&text),
                _ => {}
            }
            return;
        }
        if let Some(buf) = self.html.as_mut() {
            match event {
                Event::End(TagEnd::HtmlBlock) => {
                    let html = self.html.take().unwrap_or_default();
                    self.emit(Block::RawHtml { html });
                }
                Event::Html(html) | Event::Text(html) => buf.push_str(&html),
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(end) => self.end(end),
            Event::Text(text) => self.push_inline(Inline::Text(text.into_string())),
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::InlineHtml(html) => self.push_inline(Inline::Raw(html.into_string())),
            Event::Html(html) => self.emit(Block::RawHtml {
                html: html.into_string(),
            }),
            Event::SoftBreak => self.push_inline(Inline::Text(" ".to_string())),
            Event::HardBreak => self.push_inline(Inline::LineBreak),
            Event::Rule => self.emit(Block::HorizontalRule),
            Event::TaskListMarker(checked) => {
                if let Some(Container::Item(item)) = self.containers.last_mut() {
                    item.task = Some(checked);
                }
            }
            Event::FootnoteReference(label) => {
                self.push_inline(Inline::Raw(format!("[^{}]", label)))
            }
            other => log::trace!("skipping markdown event {:?}", other),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.open_block_frame(FrameKind::Paragraph),
            Tag::Heading { level, .. } => self.open_block_frame(FrameKind::Heading(heading_level(level))),
            Tag::CodeBlock(kind) => {
                self.close_implicit();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::HtmlBlock => {
                self.close_implicit();
                self.html = Some(String::new());
            }
            Tag::BlockQuote(..) => {
                self.close_implicit();
                self.containers.push(Container::Blockquote(Vec::new()));
            }
            Tag::List(start) => {
                self.close_implicit();
                self.containers.push(Container::List {
                    ordered: start.is_some(),
                    start: start.unwrap_or(1),
                    items: Vec::new(),
                });
            }
            Tag::Item => self.containers.push(Container::Item(ListItem::default())),
            Tag::Table(alignments) => {
                self.close_implicit();
                self.containers.push(Container::Table(TableState {
                    alignments: alignments.into_iter().map(alignment).collect(),
                    ..Default::default()
                }));
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(Container::Table(table)) = self.containers.last_mut() {
                    table.row.clear();
                }
            }
            Tag::TableCell => self.frames.push(Frame {
                kind: FrameKind::Cell,
                run: Vec::new(),
            }),
            Tag::Emphasis => self.open_span(FrameKind::Emphasis),
            Tag::Strong => self.open_span(FrameKind::Strong),
            Tag::Strikethrough => self.open_span(FrameKind::Strikethrough),
            Tag::Link { dest_url, .. } => self.open_span(FrameKind::Link(dest_url.into_string())),
            Tag::Image { dest_url, .. } => self.open_span(FrameKind::Image(dest_url.into_string())),
            other => log::trace!("skipping markdown tag {:?}", other),
        }
    }

    fn end(&mut self, end: TagEnd) {
        match end {
            TagEnd::Paragraph | TagEnd::Heading(_) => self.close_block_frame(),
            TagEnd::BlockQuote { .. } => {
                self.close_implicit();
                if let Some(Container::Blockquote(children)) = self.containers.pop() {
                    self.emit(Block::Blockquote { children });
                }
            }
            TagEnd::Item => {
                self.close_implicit();
                if let Some(Container::Item(item)) = self.containers.pop() {
                    if let Some(Container::List { items, .. }) = self.containers.last_mut() {
                        items.push(item);
                    }
                }
            }
            TagEnd::List(_) => {
                self.close_implicit();
                if let Some(Container::List {
                    ordered,
                    start,
                    items,
                }) = self.containers.pop()
                {
                    self.emit(Block::List(List {
                        ordered,
                        start,
                        items,
                    }));
                }
            }
            TagEnd::TableCell => {
                if let Some(frame) = self.frames.pop() {
                    if let Some(Container::Table(table)) = self.containers.last_mut() {
                        table.row.push(frame.run);
                    }
                }
            }
            TagEnd::TableHead => {
                if let Some(Container::Table(table)) = self.containers.last_mut() {
                    table.header = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(Container::Table(table)) = self.containers.last_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(Container::Table(state)) = self.containers.pop() {
                    let mut alignments = state.alignments;
                    alignments.resize(state.header.len(), Alignment::None);
                    self.emit(Block::Table(Table {
                        header: state.header,
                        rows: state.rows,
                        alignments,
                    }));
                }
            }
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::Image => self.close_span(),
            _ => {}
        }
    }

    fn open_block_frame(&mut self, kind: FrameKind) {
        self.close_implicit();
        self.frames.push(Frame {
            kind,
            run: Vec::new(),
        });
    }

    fn open_span(&mut self, kind: FrameKind) {
        if self.frames.is_empty() {
            self.open_block_frame(FrameKind::Implicit);
        }
        self.frames.push(Frame {
            kind,
            run: Vec::new(),
        });
    }

    fn push_inline(&mut self, inline: Inline) {
        if self.frames.is_empty() {
            self.open_block_frame(FrameKind::Implicit);
        }
        if let Some(frame) = self.frames.last_mut() {
            match (frame.run.last_mut(), &inline) {
                (Some(Inline::Text(prev)), Inline::Text(next)) => prev.push_str(next),
                _ => frame.run.push(inline),
            }
        }
    }

    fn close_span(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let inline = match frame.kind {
            FrameKind::Emphasis => match single(frame.run) {
                Ok(Inline::Bold(inner)) => Inline::BoldItalic(inner),
                Ok(other) => Inline::Italic(vec![other]),
                Err(run) => Inline::Italic(run),
            },
            FrameKind::Strong => match single(frame.run) {
                Ok(Inline::Italic(inner)) => Inline::BoldItalic(inner),
                Ok(other) => Inline::Bold(vec![other]),
                Err(run) => Inline::Bold(run),
            },
            FrameKind::Strikethrough => Inline::Strikethrough(frame.run),
            FrameKind::Link(href) => Inline::Link {
                href,
                label: frame.run,
            },
            FrameKind::Image(url) => Inline::Image {
                url,
                alt: super::plain_text(&frame.run),
            },
            // Not a span; put it back untouched.
            kind => {
                self.frames.push(Frame {
                    kind,
                    run: frame.run,
                });
                return;
            }
        };
        if let Some(parent) = self.frames.last_mut() {
            parent.run.push(inline);
        }
    }

    /// Close the innermost paragraph/heading, discarding unbalanced spans.
    fn close_block_frame(&mut self) {
        while let Some(frame) = self.frames.pop() {
            match frame.kind {
                FrameKind::Paragraph | FrameKind::Implicit => {
                    let block = match image_only(&frame.run) {
                        Some((url, alt)) => Block::Image { url, alt },
                        None => Block::Paragraph { content: frame.run },
                    };
                    self.emit(block);
                    return;
                }
                FrameKind::Heading(level) => {
                    self.emit(Block::Heading {
                        level,
                        content: frame.run,
                    });
                    return;
                }
                FrameKind::Cell => {
                    self.frames.push(frame);
                    return;
                }
                _ => {}
            }
        }
    }

    fn close_implicit(&mut self) {
        if matches!(
            self.frames.first(),
            Some(Frame {
                kind: FrameKind::Implicit,
                ..
            })
        ) {
            self.close_block_frame();
        }
    }

    fn finish_code_block(&mut self) {
        if let Some((language, mut text)) = self.code.take() {
            if text.ends_with('\n') {
                text.pop();
            }
            self.emit(Block::CodeBlock { language, text });
        }
    }

    /// Attach a finished block to the innermost open container.
    fn emit(&mut self, block: Block) {
        let id = self.doc.alloc(block);
        match self.containers.last_mut() {
            Some(Container::Blockquote(children)) => children.push(id),
            Some(Container::Item(item)) => item.children.push(id),
            Some(Container::List { items, .. }) => items.push(ListItem {
                children: vec![id],
                task: None,
            }),
            Some(Container::Table(_)) => {}
            None => self.doc.push_root(id),
        }
    }

    fn finish(mut self) -> Document {
        self.close_implicit();
        self.doc
    }
}

fn single(mut run: InlineRun) -> Result<Inline, InlineRun> {
    if run.len() == 1 {
        if let Some(inline) = run.pop() {
            return Ok(inline);
        }
    }
    Err(run)
}

/// A paragraph holding nothing but one image becomes an image block.
fn image_only(run: &[Inline]) -> Option<(String, String)> {
    let mut images = run.iter().filter(|inline| match inline {
        Inline::Text(t) => !t.trim().is_empty(),
        _ => true,
    });
    match (images.next(), images.next()) {
        (Some(Inline::Image { url, alt }), None) => Some((url.clone(), alt.clone())),
        _ => None,
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn alignment(a: CmarkAlignment) -> Alignment {
    match a {
        CmarkAlignment::None => Alignment::None,
        CmarkAlignment::Left => Alignment::Left,
        CmarkAlignment::Center => Alignment::Center,
        CmarkAlignment::Right => Alignment::Right,
    }
}
