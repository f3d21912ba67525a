//! Built-in themes.
//!
//! `Default` is a neutral grey theme without a syntax palette. The other four
//! ship their own palettes for highlighted code.

use std::collections::BTreeMap;

use super::*;

/// Display names of the built-in themes, in presentation order.
pub const THEME_NAMES: [&str; 5] = ["Default", "Modern", "Academic", "Minimal", "Ocean"];

/// Look up a built-in theme by name, ignoring case.
pub fn by_name(name: &str) -> Option<Theme> {
    match name.trim().to_ascii_lowercase().as_str() {
        "default" => Some(default_theme()),
        "modern" => Some(modern()),
        "academic" => Some(academic()),
        "minimal" => Some(minimal()),
        "ocean" => Some(ocean()),
        _ => None,
    }
}

fn headings(font: &str, sizes: [f64; 6], colors: [&str; 6]) -> [TextStyle; 6] {
    std::array::from_fn(|i| TextStyle::new(font, sizes[i], colors[i]))
}

fn inline_code(color: &str, background: &str, font_size: f64) -> CodeStyle {
    CodeStyle {
        font: "Courier".to_string(),
        font_size,
        color: Color::hex(color),
        background: Color::hex(background),
    }
}

fn code_block(color: &str, background: &str, padding: f64) -> CodeBlockStyle {
    CodeBlockStyle {
        font: "Courier".to_string(),
        font_size: 9.0,
        color: Color::hex(color),
        background: Color::hex(background),
        padding,
    }
}

fn blockquote(border: &str, width: f64, italic: bool, indent: f64) -> BlockquoteStyle {
    BlockquoteStyle {
        border_color: Color::hex(border),
        border_width: width,
        italic,
        indent,
    }
}

fn table(header: &str, border: &str, cell_padding: f64) -> TableStyle {
    TableStyle {
        header_background: Color::hex(header),
        border_color: Color::hex(border),
        cell_padding,
    }
}

/// Colors for one palette, in the order [`palette`] expects them.
struct PaletteColors<'a> {
    comment: &'a str,
    keyword: &'a str,
    control_flow: &'a str,
    builtin: &'a str,
    function: &'a str,
    string: &'a str,
    regex: &'a str,
    number: &'a str,
    operator: &'a str,
    punctuation: &'a str,
    property: &'a str,
    text: &'a str,
}

/// Expand the handful of distinct colors a palette uses into the full
/// token-kind table, grouping kinds that always share a color.
fn palette(c: PaletteColors<'_>) -> BTreeMap<String, Color> {
    let groups: [(&[&str], &str); 12] = [
        (&["comment", "prolog", "doctype", "cdata"], c.comment),
        (&["keyword", "boolean", "null", "undefined"], c.keyword),
        (&["control-flow"], c.control_flow),
        (&["builtin", "class-name"], c.builtin),
        (
            &["function", "function-variable", "annotation", "generic-function"],
            c.function,
        ),
        (
            &["string", "template-string", "template-punctuation"],
            c.string,
        ),
        (&["regex"], c.regex),
        (&["number"], c.number),
        (&["operator"], c.operator),
        (&["punctuation"], c.punctuation),
        (&["parameter", "property", "literal-property"], c.property),
        (&["default"], c.text),
    ];
    groups
        .iter()
        .flat_map(|(kinds, color)| kinds.iter().map(move |k| (k.to_string(), Color::hex(color))))
        .collect()
}

fn syntax(background: &str, gutter: &str, colors: PaletteColors<'_>) -> SyntaxTheme {
    SyntaxTheme {
        background: Color::hex(background),
        gutter: Color::hex(gutter),
        default_text: Color::hex(colors.text),
        tokens: palette(colors),
    }
}

/// Light palette used for themes that do not define their own. It sits on
/// the code-block background and uses the code-block text color as default.
pub fn light_syntax_theme(block: &CodeBlockStyle) -> SyntaxTheme {
    let text = block.color.to_hex();
    let mut theme = syntax(
        "#f5f5f5",
        "#999999",
        PaletteColors {
            comment: "#6a737d",
            keyword: "#d73a49",
            control_flow: "#d73a49",
            builtin: "#6f42c1",
            function: "#6f42c1",
            string: "#032f62",
            regex: "#22863a",
            number: "#005cc5",
            operator: "#d73a49",
            punctuation: &text,
            property: "#005cc5",
            text: &text,
        },
    );
    theme.background = block.background;
    theme
}

pub fn default_theme() -> Theme {
    Theme {
        name: "Default".to_string(),
        headings: headings(
            "Helvetica-Bold",
            [28.0, 22.0, 18.0, 16.0, 14.0, 12.0],
            ["#1a1a1a", "#2a2a2a", "#3a3a3a", "#4a4a4a", "#5a5a5a", "#6a6a6a"],
        ),
        body: TextStyle::new("Helvetica", 11.0, "#333333").with_line_gap(4.0),
        inline_code: inline_code("#c7254e", "#f9f2f4", 10.0),
        code_block: code_block("#333333", "#f5f5f5", 8.0),
        blockquote: blockquote("#3498db", 3.0, true, 20.0),
        link_color: Color::hex("#2980b9"),
        rule_color: Color::hex("#cccccc"),
        table: table("#f0f0f0", "#cccccc", 6.0),
        syntax: None,
    }
}

/// Clean sans-serif with teal accents.
pub fn modern() -> Theme {
    Theme {
        name: "Modern".to_string(),
        headings: headings(
            "Helvetica-Bold",
            [30.0, 23.0, 18.0, 15.0, 13.0, 11.0],
            ["#0d7377", "#14919b", "#0d7377", "#14919b", "#0d7377", "#14919b"],
        ),
        body: TextStyle::new("Helvetica", 11.0, "#2d3436").with_line_gap(5.0),
        inline_code: inline_code("#e17055", "#ffeaa7", 10.0),
        code_block: code_block("#2d3436", "#dfe6e9", 10.0),
        blockquote: blockquote("#0d7377", 3.0, true, 20.0),
        link_color: Color::hex("#0984e3"),
        rule_color: Color::hex("#b2bec3"),
        table: table("#dfe6e9", "#b2bec3", 7.0),
        syntax: Some(syntax(
            "#2d3436",
            "#636e72",
            PaletteColors {
                comment: "#636e72",
                keyword: "#0984e3",
                control_flow: "#6c5ce7",
                builtin: "#00cec9",
                function: "#fdcb6e",
                string: "#55efc4",
                regex: "#fd79a8",
                number: "#ffeaa7",
                operator: "#dfe6e9",
                punctuation: "#b2bec3",
                property: "#74b9ff",
                text: "#dfe6e9",
            },
        )),
    }
}

/// Serif fonts, formal look.
pub fn academic() -> Theme {
    Theme {
        name: "Academic".to_string(),
        headings: headings(
            "Times-Bold",
            [26.0, 21.0, 17.0, 15.0, 13.0, 11.0],
            ["#1a1a2e", "#16213e", "#1a1a2e", "#16213e", "#1a1a2e", "#16213e"],
        ),
        body: TextStyle::new("Times-Roman", 12.0, "#1a1a2e").with_line_gap(4.0),
        inline_code: inline_code("#6c3483", "#f4ecf7", 10.0),
        code_block: code_block("#1a1a2e", "#f2f3f4", 8.0),
        blockquote: blockquote("#6c3483", 2.0, true, 24.0),
        link_color: Color::hex("#2e4057"),
        rule_color: Color::hex("#aab7b8"),
        table: table("#eaecee", "#aab7b8", 6.0),
        syntax: Some(syntax(
            "#1a1a2e",
            "#7f8c8d",
            PaletteColors {
                comment: "#7f8c8d",
                keyword: "#6c3483",
                control_flow: "#8e44ad",
                builtin: "#2e86c1",
                function: "#d4ac0d",
                string: "#27ae60",
                regex: "#c0392b",
                number: "#e67e22",
                operator: "#d5d8dc",
                punctuation: "#aab7b8",
                property: "#5dade2",
                text: "#d5d8dc",
            },
        )),
    }
}

/// Lots of whitespace, muted greys.
pub fn minimal() -> Theme {
    Theme {
        name: "Minimal".to_string(),
        headings: headings(
            "Helvetica-Bold",
            [26.0, 20.0, 16.0, 14.0, 12.0, 11.0],
            ["#000000", "#111111", "#222222", "#333333", "#444444", "#555555"],
        ),
        body: TextStyle::new("Helvetica", 10.0, "#444444").with_line_gap(5.0),
        inline_code: inline_code("#555555", "#f7f7f7", 9.0),
        code_block: code_block("#444444", "#fafafa", 10.0),
        blockquote: blockquote("#cccccc", 2.0, false, 18.0),
        link_color: Color::hex("#555555"),
        rule_color: Color::hex("#e0e0e0"),
        table: table("#fafafa", "#e0e0e0", 8.0),
        syntax: Some(syntax(
            "#f8f8f8",
            "#999999",
            PaletteColors {
                comment: "#999999",
                keyword: "#333333",
                control_flow: "#333333",
                builtin: "#555555",
                function: "#333333",
                string: "#666666",
                regex: "#777777",
                number: "#444444",
                operator: "#333333",
                punctuation: "#666666",
                property: "#555555",
                text: "#333333",
            },
        )),
    }
}

/// Deep blue palette.
pub fn ocean() -> Theme {
    Theme {
        name: "Ocean".to_string(),
        headings: headings(
            "Helvetica-Bold",
            [28.0, 22.0, 18.0, 16.0, 14.0, 12.0],
            ["#1b4f72", "#1a5276", "#21618c", "#2874a6", "#2e86c1", "#3498db"],
        ),
        body: TextStyle::new("Helvetica", 11.0, "#2c3e50").with_line_gap(4.0),
        inline_code: inline_code("#c0392b", "#eaf2f8", 10.0),
        code_block: code_block("#2c3e50", "#eaf2f8", 8.0),
        blockquote: blockquote("#2980b9", 3.0, true, 20.0),
        link_color: Color::hex("#2471a3"),
        rule_color: Color::hex("#aed6f1"),
        table: table("#d4e6f1", "#85c1e9", 6.0),
        syntax: Some(syntax(
            "#1b2631",
            "#5d6d7e",
            PaletteColors {
                comment: "#5d6d7e",
                keyword: "#5dade2",
                control_flow: "#af7ac5",
                builtin: "#48c9b0",
                function: "#f7dc6f",
                string: "#82e0aa",
                regex: "#f1948a",
                number: "#f0b27a",
                operator: "#d6eaf8",
                punctuation: "#aed6f1",
                property: "#85c1e9",
                text: "#d6eaf8",
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_named_theme_resolves() {
        for name in THEME_NAMES {
            let theme = by_name(name).unwrap();
            assert_eq!(theme.name, name);
        }
        assert!(by_name("OCEAN").is_some());
        assert!(by_name("solarized").is_none());
    }

    #[test]
    fn test_palettes_have_default_entry() {
        for name in &THEME_NAMES[1..] {
            let palette = by_name(name).unwrap().syntax.unwrap();
            assert!(palette.tokens.contains_key("default"), "{} lacks default", name);
            assert!(palette.tokens.contains_key("comment"));
        }
    }

    #[test]
    fn test_light_palette_follows_code_block() {
        let theme = default_theme();
        let palette = theme.syntax_theme();
        assert_eq!(palette.background, theme.code_block.background);
        assert_eq!(palette.default_text, theme.code_block.color);
    }
}
