//! # Syntax Highlighting
//!
//! A tokenizer turns source text into a tree of classified tokens. Layout
//! only needs flat per-line `(kind, text)` pairs, so the tree is flattened
//! (the innermost kind wins) and re-split at newlines.
//!
//! Token kinds are short class names (`keyword`, `string`, `comment`,
//! `class-name`, ...) that index the theme's [`SyntaxTheme`] palette. A kind
//! may hold several space-separated names, tried in order.
//!
//! [`SyntectTokenizer`] is the bundled tokenizer. It maps TextMate scopes
//! from syntect's default grammars onto the kind names.

use std::sync::LazyLock;

use syntect::parsing::{ParseState, Scope, ScopeStack, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::style::{Color, SyntaxTheme};

/// A node in a tokenizer's output tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenNode {
    /// Unclassified text.
    Text(String),
    /// Classified content; children may carry their own, narrower kinds.
    Token { kind: String, children: Vec<TokenNode> },
}

impl TokenNode {
    pub fn token(kind: &str, text: &str) -> Self {
        TokenNode::Token {
            kind: kind.to_string(),
            children: vec![TokenNode::Text(text.to_string())],
        }
    }
}

/// One run of a highlighted line.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatToken {
    pub kind: Option<String>,
    pub text: String,
}

impl FlatToken {
    pub fn plain(text: &str) -> Self {
        Self {
            kind: None,
            text: text.to_string(),
        }
    }
}

pub trait SyntaxTokenizer {
    /// Tokenize `source` as `language`. `None` means the language is unknown.
    fn tokenize(&self, source: &str, language: &str) -> Option<Vec<TokenNode>>;
}

/// Where token colors come from.
pub trait TokenPalette {
    fn color_for(&self, kind: &str) -> Color;
    /// Color of unclassified text.
    fn default_color(&self) -> Color;
}

impl TokenPalette for SyntaxTheme {
    fn color_for(&self, kind: &str) -> Color {
        SyntaxTheme::color_for(self, Some(kind))
    }

    fn default_color(&self) -> Color {
        self.fallback_color()
    }
}

/// Flatten a token tree. A child's kind overrides its parent's; text
/// directly under a token takes the token's kind.
pub fn flatten(nodes: &[TokenNode]) -> Vec<FlatToken> {
    let mut out = Vec::new();
    flatten_into(nodes, None, &mut out);
    out
}

fn flatten_into(nodes: &[TokenNode], parent: Option<&str>, out: &mut Vec<FlatToken>) {
    for node in nodes {
        match node {
            TokenNode::Text(text) => out.push(FlatToken {
                kind: parent.map(str::to_string),
                text: text.clone(),
            }),
            TokenNode::Token { kind, children } => flatten_into(children, Some(kind), out),
        }
    }
}

/// Re-split flat tokens at newlines. A token spanning a newline becomes one
/// piece per line, each keeping the kind. Empty pieces are dropped, so an
/// empty source line is an empty vector.
pub fn split_lines(tokens: Vec<FlatToken>) -> Vec<Vec<FlatToken>> {
    let mut lines: Vec<Vec<FlatToken>> = vec![Vec::new()];
    for token in tokens {
        let mut parts = token.text.split('\n').peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() {
                if let Some(line) = lines.last_mut() {
                    line.push(FlatToken {
                        kind: token.kind.clone(),
                        text: part.to_string(),
                    });
                }
            }
            if parts.peek().is_some() {
                lines.push(Vec::new());
            }
        }
    }
    lines
}

/// One unstyled token per non-empty line.
pub fn plain_lines(code: &str) -> Vec<Vec<FlatToken>> {
    code.split('\n')
        .map(|line| {
            if line.is_empty() {
                Vec::new()
            } else {
                vec![FlatToken::plain(line)]
            }
        })
        .collect()
}

/// Tokenize code into per-line runs, degrading to [`plain_lines`] when
/// there is no tokenizer, no language, or the language is unknown.
pub fn tokenize_to_lines(
    tokenizer: Option<&dyn SyntaxTokenizer>,
    code: &str,
    language: Option<&str>,
) -> Vec<Vec<FlatToken>> {
    let (Some(tokenizer), Some(language)) = (tokenizer, language) else {
        return plain_lines(code);
    };
    match tokenizer.tokenize(code, language) {
        Some(tree) => split_lines(flatten(&tree)),
        None => {
            log::debug!("no grammar for '{}'; drawing plain text", language);
            plain_lines(code)
        }
    }
}

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Tokenizer backed by syntect's bundled Sublime grammars.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntectTokenizer;

impl SyntectTokenizer {
    pub fn new() -> Self {
        Self
    }
}

impl SyntaxTokenizer for SyntectTokenizer {
    fn tokenize(&self, source: &str, language: &str) -> Option<Vec<TokenNode>> {
        let syntax_set = &*SYNTAX_SET;
        let syntax = syntax_set.find_syntax_by_token(language)?;
        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut nodes: Vec<TokenNode> = Vec::new();

        for line in LinesWithEndings::from(source) {
            let ops = match state.parse_line(line, syntax_set) {
                Ok(ops) => ops,
                Err(e) => {
                    log::warn!("highlighting '{}' failed: {}", language, e);
                    return None;
                }
            };
            let mut start = 0;
            for (pos, op) in ops {
                if pos > start {
                    push_run(&mut nodes, kind_for_stack(&stack), &line[start..pos]);
                    start = pos;
                }
                if stack.apply(&op).is_err() {
                    return None;
                }
            }
            if start < line.len() {
                push_run(&mut nodes, kind_for_stack(&stack), &line[start..]);
            }
        }
        Some(nodes)
    }
}

/// Append text, merging with the previous node when the kind matches.
fn push_run(nodes: &mut Vec<TokenNode>, kind: Option<&'static str>, text: &str) {
    match (nodes.last_mut(), kind) {
        (Some(TokenNode::Text(prev)), None) => prev.push_str(text),
        (Some(TokenNode::Token { kind: prev, children }), Some(kind)) if prev == kind => {
            if let Some(TokenNode::Text(last)) = children.last_mut() {
                last.push_str(text);
            }
        }
        (_, None) => nodes.push(TokenNode::Text(text.to_string())),
        (_, Some(kind)) => nodes.push(TokenNode::token(kind, text)),
    }
}

/// Kind of the innermost scope that maps to one.
fn kind_for_stack(stack: &ScopeStack) -> Option<&'static str> {
    stack.as_slice().iter().rev().find_map(kind_for_scope)
}

/// TextMate scope prefixes and the token kind each maps to. Earlier, more
/// specific prefixes win.
const SCOPE_KINDS: &[(&str, &str)] = &[
    ("comment", "comment"),
    ("punctuation.definition.comment", "comment"),
    ("string.regexp", "regex"),
    ("constant.character.escape", "string"),
    ("string", "string"),
    ("punctuation.definition.string", "string"),
    ("constant.numeric", "number"),
    ("constant.language", "boolean"),
    ("keyword.control", "control-flow keyword"),
    ("keyword.operator", "operator"),
    ("keyword", "keyword"),
    ("storage.type.annotation", "annotation"),
    ("storage", "keyword"),
    ("meta.annotation", "annotation"),
    ("entity.name.function", "function"),
    ("support.function", "function"),
    ("variable.function", "function"),
    ("entity.name.type", "class-name"),
    ("entity.name.class", "class-name"),
    ("entity.name.struct", "class-name"),
    ("entity.name.enum", "class-name"),
    ("entity.other.inherited-class", "class-name"),
    ("support.type.property-name", "property"),
    ("support.type", "class-name"),
    ("support.class", "class-name"),
    ("support.constant", "builtin"),
    ("variable.language", "builtin"),
    ("variable.parameter", "parameter"),
    ("entity.other.attribute-name", "property"),
    ("variable.other.member", "property"),
    ("meta.property-name", "property"),
    ("punctuation", "punctuation"),
];

fn kind_for_scope(scope: &Scope) -> Option<&'static str> {
    let name = scope.build_string();
    SCOPE_KINDS
        .iter()
        .find(|(prefix, _)| {
            name == *prefix
                || (name.starts_with(prefix) && name.as_bytes().get(prefix.len()) == Some(&b'.'))
        })
        .map(|(_, kind)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_innermost_kind_wins() {
        let tree = vec![
            TokenNode::Text("let ".to_string()),
            TokenNode::Token {
                kind: "string".to_string(),
                children: vec![
                    TokenNode::Text("\"a".to_string()),
                    TokenNode::token("interpolation", "${x}"),
                ],
            },
        ];
        let flat = flatten(&tree);
        assert_eq!(flat[0].kind, None);
        assert_eq!(flat[1].kind.as_deref(), Some("string"));
        assert_eq!(flat[2].kind.as_deref(), Some("interpolation"));
    }

    #[test]
    fn test_split_lines_keeps_kind_across_newline() {
        let flat = vec![
            FlatToken {
                kind: Some("comment".to_string()),
                text: "/* a\nb */".to_string(),
            },
            FlatToken::plain("\n\nx"),
        ];
        let lines = split_lines(flat);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], vec![FlatToken { kind: Some("comment".to_string()), text: "/* a".to_string() }]);
        assert_eq!(lines[1], vec![FlatToken { kind: Some("comment".to_string()), text: "b */".to_string() }]);
        assert!(lines[2].is_empty());
        assert_eq!(lines[3], vec![FlatToken::plain("x")]);
    }

    #[test]
    fn test_unknown_language_is_plain() {
        let tokenizer = SyntectTokenizer::new();
        let lines = tokenize_to_lines(Some(&tokenizer), "a b\n\nc", Some("foobar123"));
        assert_eq!(
            lines,
            vec![vec![FlatToken::plain("a b")], vec![], vec![FlatToken::plain("c")]]
        );
    }

    #[test]
    fn test_syntect_classifies_rust() {
        let tokenizer = SyntectTokenizer::new();
        let lines = tokenize_to_lines(Some(&tokenizer), "fn main() {\n    // hi\n    let s = \"x\";\n}", Some("rust"));
        assert_eq!(lines.len(), 4);
        let kinds: Vec<&str> = lines
            .iter()
            .flatten()
            .filter_map(|t| t.kind.as_deref())
            .collect();
        assert!(kinds.iter().any(|k| k.contains("keyword")), "kinds: {:?}", kinds);
        assert!(kinds.contains(&"comment"));
        assert!(kinds.contains(&"string"));

        let text: String = lines[2].iter().map(|t| t.text.as_str()).collect();
        assert_eq!(text, "    let s = \"x\";");
    }

    #[test]
    fn test_scope_prefix_matching() {
        let scope = Scope::new("keyword.control.rust").unwrap();
        assert_eq!(kind_for_scope(&scope), Some("control-flow keyword"));
        let scope = Scope::new("keywordish").unwrap();
        assert_eq!(kind_for_scope(&scope), None);
    }

    #[test]
    fn test_palette_fallbacks() {
        let theme = crate::style::themes::light_syntax_theme(&crate::style::Theme::default().code_block);
        let keyword = TokenPalette::color_for(&theme, "keyword");
        assert_eq!(TokenPalette::color_for(&theme, "control-flow keyword"), theme.tokens["control-flow"]);
        assert_eq!(TokenPalette::color_for(&theme, "nonsense keyword"), keyword);
        assert_eq!(TokenPalette::color_for(&theme, "nonsense"), theme.default_color());
    }
}
