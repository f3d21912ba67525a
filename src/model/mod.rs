//! # Document Model
//!
//! The input representation for the layout engine: the block/inline tree a
//! Markdown parser produces.
//!
//! Blocks live in an arena owned by [`Document`] and refer to their children
//! by [`BlockId`]. Blockquotes and list items hold ids rather than owned
//! subtrees, so arbitrarily deep nesting never needs recursive ownership.
//! Inline content is small and strictly nested, so it stays an owned tree.

pub mod parse;

use serde::{Deserialize, Serialize};

/// Index of a block inside its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub usize);

/// A parsed document. Immutable once built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    blocks: Vec<Block>,
    roots: Vec<BlockId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block to the arena and return its id. The block is not a root
    /// until [`Document::push_root`] is called with the id.
    pub fn alloc(&mut self, block: Block) -> BlockId {
        self.blocks.push(block);
        BlockId(self.blocks.len() - 1)
    }

    pub fn push_root(&mut self, id: BlockId) {
        self.roots.push(id);
    }

    /// Top-level blocks in document order.
    pub fn roots(&self) -> &[BlockId] {
        &self.roots
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.0)
    }

    /// Top-level blocks, resolved.
    pub fn root_blocks(&self) -> impl Iterator<Item = &Block> {
        self.roots.iter().filter_map(|id| self.get(*id))
    }

    /// Every block in the arena, nested ones included.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// A block-level node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    Heading {
        /// 1 through 6.
        level: u8,
        content: InlineRun,
    },
    Paragraph {
        content: InlineRun,
    },
    CodeBlock {
        language: Option<String>,
        text: String,
    },
    Blockquote {
        children: Vec<BlockId>,
    },
    List(List),
    Table(Table),
    HorizontalRule,
    Image {
        url: String,
        alt: String,
    },
    /// Raw HTML. Kept so the tree is faithful, never drawn.
    RawHtml {
        html: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub ordered: bool,
    /// Number of the first item. Ignored for bullet lists.
    pub start: u64,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub children: Vec<BlockId>,
    /// GFM task marker: `Some(true)` for `[x]`, `Some(false)` for `[ ]`.
    #[serde(default)]
    pub task: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub header: Vec<InlineRun>,
    pub rows: Vec<Vec<InlineRun>>,
    /// One entry per header column.
    pub alignments: Vec<Alignment>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.header.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

pub type InlineRun = Vec<Inline>;

/// An inline span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Inline {
    Text(String),
    Bold(InlineRun),
    Italic(InlineRun),
    BoldItalic(InlineRun),
    Strikethrough(InlineRun),
    Code(String),
    Link { href: String, label: InlineRun },
    LineBreak,
    /// An image inside running text; drawn as its alt text.
    Image { url: String, alt: String },
    /// A span the layout has no special handling for (inline HTML,
    /// footnote references). Drawn as its raw text.
    Raw(String),
}

impl Inline {
    pub fn text(s: impl Into<String>) -> Self {
        Inline::Text(s.into())
    }
}

/// Concatenated visible text of a run, styles dropped.
pub fn plain_text(run: &[Inline]) -> String {
    let mut out = String::new();
    collect_text(run, &mut out);
    out
}

fn collect_text(run: &[Inline], out: &mut String) {
    for inline in run {
        match inline {
            Inline::Text(s) | Inline::Code(s) | Inline::Raw(s) => out.push_str(s),
            Inline::Bold(inner)
            | Inline::Italic(inner)
            | Inline::BoldItalic(inner)
            | Inline::Strikethrough(inner) => collect_text(inner, out),
            Inline::Link { href, label } => {
                if label.is_empty() {
                    out.push_str(href);
                } else {
                    collect_text(label, out);
                }
            }
            Inline::LineBreak => out.push('\n'),
            Inline::Image { alt, .. } => out.push_str(alt),
        }
    }
}

/// Document metadata written to the PDF Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_roots_and_children() {
        let mut doc = Document::new();
        let para = doc.alloc(Block::Paragraph {
            content: vec![Inline::text("quoted")],
        });
        let quote = doc.alloc(Block::Blockquote {
            children: vec![para],
        });
        doc.push_root(quote);

        assert_eq!(doc.roots(), &[quote]);
        assert_eq!(doc.blocks().len(), 2);
        match doc.root_blocks().next() {
            Some(Block::Blockquote { children }) => {
                assert!(matches!(doc.get(children[0]), Some(Block::Paragraph { .. })));
            }
            other => panic!("expected blockquote, got {:?}", other),
        };
    }

    #[test]
    fn test_plain_text_flattens_styles() {
        let run = vec![
            Inline::text("a "),
            Inline::Bold(vec![Inline::Italic(vec![Inline::text("b")])]),
            Inline::Code(" c".to_string()),
            Inline::Link {
                href: "https://x.test".to_string(),
                label: vec![],
            },
        ];
        assert_eq!(plain_text(&run), "a b chttps://x.test");
    }

    #[test]
    fn test_block_serializes_with_type_tag() {
        let json = serde_json::to_string(&Block::HorizontalRule).unwrap();
        assert_eq!(json, r#"{"type":"horizontalRule"}"#);
    }
}
