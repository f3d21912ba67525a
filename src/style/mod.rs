//! # Theme & Page Style
//!
//! Every visual decision the layout engine makes comes from a [`Theme`]: fonts,
//! sizes and colors for each block kind, plus an optional palette for syntax
//! highlighted code. A theme is an immutable value. Callers who want to tweak
//! one or two fields supply a [`ThemeOverride`], which is merged field by field
//! into a complete base theme before layout starts, so the engine never sees a
//! partially specified style.
//!
//! Page geometry lives here too: [`PageLayout`] pairs a [`PageSize`] with the
//! printable margins.

pub mod themes;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque RGB color, read from and written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb`. Anything else falls back to black.
    pub fn hex(hex: &str) -> Self {
        Self::parse(hex).unwrap_or(Color::BLACK)
    }

    /// Strict variant of [`Color::hex`] used when reading configuration.
    pub fn parse(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let (r, g, b) = match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
                (r, g, b)
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                (r, g, b)
            }
            _ => return None,
        };
        Some(Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        })
    }

    pub fn to_hex(&self) -> String {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value).ok_or_else(|| format!("invalid hex color '{}'", value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

// ── Block styles ───────────────────────────────────────────────

/// Font, size and color for running text (body and headings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    /// A standard PDF font name (`Helvetica-Bold`, `Times-Roman`) or the
    /// family of a registered custom font.
    pub font: String,
    pub font_size: f64,
    pub color: Color,
    /// Extra leading added below each wrapped line.
    #[serde(default)]
    pub line_gap: f64,
}

impl TextStyle {
    pub fn new(font: &str, font_size: f64, color: &str) -> Self {
        Self {
            font: font.to_string(),
            font_size,
            color: Color::hex(color),
            line_gap: 0.0,
        }
    }

    pub fn with_line_gap(mut self, line_gap: f64) -> Self {
        self.line_gap = line_gap;
        self
    }
}

/// Inline code spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeStyle {
    pub font: String,
    pub font_size: f64,
    pub color: Color,
    pub background: Color,
}

/// Fenced and indented code blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlockStyle {
    pub font: String,
    pub font_size: f64,
    pub color: Color,
    pub background: Color,
    pub padding: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockquoteStyle {
    pub border_color: Color,
    pub border_width: f64,
    pub italic: bool,
    pub indent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStyle {
    pub header_background: Color,
    pub border_color: Color,
    pub cell_padding: f64,
}

/// Palette for highlighted code.
///
/// `tokens` maps token kinds (`keyword`, `string`, `comment`, ...) to colors.
/// The `default` entry, when present, colors tokens whose kind has no entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntaxTheme {
    pub background: Color,
    /// Line-number color.
    pub gutter: Color,
    pub default_text: Color,
    #[serde(default)]
    pub tokens: BTreeMap<String, Color>,
}

impl SyntaxTheme {
    /// Resolve the color for a token kind.
    ///
    /// Kinds may be space separated (`"keyword control-flow"`); the first part
    /// with a palette entry wins.
    pub fn color_for(&self, kind: Option<&str>) -> Color {
        if let Some(kind) = kind {
            for part in kind.split(' ') {
                if let Some(color) = self.tokens.get(part) {
                    return *color;
                }
            }
        }
        self.fallback_color()
    }

    /// Color for unclassified text.
    pub fn fallback_color(&self) -> Color {
        self.tokens
            .get("default")
            .copied()
            .unwrap_or(self.default_text)
    }
}

// ── Theme ──────────────────────────────────────────────────────

/// A complete, fully resolved theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub name: String,
    /// Heading styles, h1 first.
    pub headings: [TextStyle; 6],
    pub body: TextStyle,
    pub inline_code: CodeStyle,
    pub code_block: CodeBlockStyle,
    pub blockquote: BlockquoteStyle,
    pub link_color: Color,
    pub rule_color: Color,
    pub table: TableStyle,
    /// Palette for highlighted code. Themes without one highlight against
    /// a light palette derived from the code-block style.
    #[serde(default)]
    pub syntax: Option<SyntaxTheme>,
}

impl Default for Theme {
    fn default() -> Self {
        themes::default_theme()
    }
}

impl Theme {
    /// Heading style for a level, clamped to 1..=6.
    pub fn heading(&self, level: u8) -> &TextStyle {
        let idx = level.clamp(1, 6) as usize - 1;
        &self.headings[idx]
    }

    /// The palette code blocks are drawn with.
    pub fn syntax_theme(&self) -> SyntaxTheme {
        self.syntax
            .clone()
            .unwrap_or_else(|| themes::light_syntax_theme(&self.code_block))
    }

    /// Merge a partial override into this theme.
    pub fn with_override(mut self, patch: &ThemeOverride) -> Theme {
        let heading_patches = [
            &patch.h1, &patch.h2, &patch.h3, &patch.h4, &patch.h5, &patch.h6,
        ];
        for (style, heading_patch) in self.headings.iter_mut().zip(heading_patches) {
            if let Some(p) = heading_patch {
                p.apply(style);
            }
        }
        if let Some(p) = &patch.body {
            p.apply(&mut self.body);
        }
        if let Some(p) = &patch.inline_code {
            p.apply(&mut self.inline_code);
        }
        if let Some(p) = &patch.code_block {
            p.apply(&mut self.code_block);
        }
        if let Some(p) = &patch.blockquote {
            p.apply(&mut self.blockquote);
        }
        if let Some(p) = &patch.table {
            p.apply(&mut self.table);
        }
        if let Some(c) = patch.link_color {
            self.link_color = c;
        }
        if let Some(c) = patch.rule_color {
            self.rule_color = c;
        }
        if let Some(p) = &patch.syntax {
            let mut syntax = self.syntax_theme();
            p.apply(&mut syntax);
            self.syntax = Some(syntax);
        }
        self
    }
}

// ── Overrides ──────────────────────────────────────────────────

/// Copy every `Some` field of a patch onto the target.
macro_rules! overlay {
    ($patch:expr, $target:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(v) = &$patch.$field {
                $target.$field = v.clone();
            }
        )+
    };
}

/// A partial theme. Every field is optional; present fields replace the
/// corresponding field of the base theme and absent ones keep it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeOverride {
    pub h1: Option<TextStyleOverride>,
    pub h2: Option<TextStyleOverride>,
    pub h3: Option<TextStyleOverride>,
    pub h4: Option<TextStyleOverride>,
    pub h5: Option<TextStyleOverride>,
    pub h6: Option<TextStyleOverride>,
    pub body: Option<TextStyleOverride>,
    pub inline_code: Option<CodeStyleOverride>,
    pub code_block: Option<CodeBlockStyleOverride>,
    pub blockquote: Option<BlockquoteStyleOverride>,
    pub link_color: Option<Color>,
    pub rule_color: Option<Color>,
    pub table: Option<TableStyleOverride>,
    pub syntax: Option<SyntaxThemeOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyleOverride {
    pub font: Option<String>,
    pub font_size: Option<f64>,
    pub color: Option<Color>,
    pub line_gap: Option<f64>,
}

impl TextStyleOverride {
    pub fn apply(&self, target: &mut TextStyle) {
        overlay!(self, target; font, font_size, color, line_gap);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeStyleOverride {
    pub font: Option<String>,
    pub font_size: Option<f64>,
    pub color: Option<Color>,
    pub background: Option<Color>,
}

impl CodeStyleOverride {
    pub fn apply(&self, target: &mut CodeStyle) {
        overlay!(self, target; font, font_size, color, background);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeBlockStyleOverride {
    pub font: Option<String>,
    pub font_size: Option<f64>,
    pub color: Option<Color>,
    pub background: Option<Color>,
    pub padding: Option<f64>,
}

impl CodeBlockStyleOverride {
    pub fn apply(&self, target: &mut CodeBlockStyle) {
        overlay!(self, target; font, font_size, color, background, padding);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockquoteStyleOverride {
    pub border_color: Option<Color>,
    pub border_width: Option<f64>,
    pub italic: Option<bool>,
    pub indent: Option<f64>,
}

impl BlockquoteStyleOverride {
    pub fn apply(&self, target: &mut BlockquoteStyle) {
        overlay!(self, target; border_color, border_width, italic, indent);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableStyleOverride {
    pub header_background: Option<Color>,
    pub border_color: Option<Color>,
    pub cell_padding: Option<f64>,
}

impl TableStyleOverride {
    pub fn apply(&self, target: &mut TableStyle) {
        overlay!(self, target; header_background, border_color, cell_padding);
    }
}

/// Partial syntax palette. Token entries are added to (not substituted for)
/// the base palette.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyntaxThemeOverride {
    pub background: Option<Color>,
    pub gutter: Option<Color>,
    pub default_text: Option<Color>,
    pub tokens: BTreeMap<String, Color>,
}

impl SyntaxThemeOverride {
    pub fn apply(&self, target: &mut SyntaxTheme) {
        overlay!(self, target; background, gutter, default_text);
        target
            .tokens
            .extend(self.tokens.iter().map(|(k, v)| (k.clone(), *v)));
    }
}

// ── Page geometry ──────────────────────────────────────────────

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PageSizeRepr", into = "PageSizeRepr")]
pub enum PageSize {
    A3,
    A4,
    A5,
    #[default]
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a3" => Ok(PageSize::A3),
            "a4" => Ok(PageSize::A4),
            "a5" => Ok(PageSize::A5),
            "letter" => Ok(PageSize::Letter),
            "legal" => Ok(PageSize::Legal),
            "tabloid" | "ledger" => Ok(PageSize::Tabloid),
            other => Err(format!(
                "unknown page size '{}' (expected A3, A4, A5, Letter, Legal or Tabloid)",
                other
            )),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::A3 => write!(f, "A3"),
            PageSize::A4 => write!(f, "A4"),
            PageSize::A5 => write!(f, "A5"),
            PageSize::Letter => write!(f, "Letter"),
            PageSize::Legal => write!(f, "Legal"),
            PageSize::Tabloid => write!(f, "Tabloid"),
            PageSize::Custom { width, height } => write!(f, "{}x{}", width, height),
        }
    }
}

/// On-disk form of a page size: a name or explicit dimensions.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PageSizeRepr {
    Named(String),
    Custom { width: f64, height: f64 },
}

impl TryFrom<PageSizeRepr> for PageSize {
    type Error = String;

    fn try_from(repr: PageSizeRepr) -> Result<Self, Self::Error> {
        match repr {
            PageSizeRepr::Named(name) => name.parse(),
            PageSizeRepr::Custom { width, height } if width > 0.0 && height > 0.0 => {
                Ok(PageSize::Custom { width, height })
            }
            PageSizeRepr::Custom { .. } => Err("page dimensions must be positive".to_string()),
        }
    }
}

impl From<PageSize> for PageSizeRepr {
    fn from(size: PageSize) -> Self {
        match size {
            PageSize::Custom { width, height } => PageSizeRepr::Custom { width, height },
            named => PageSizeRepr::Named(named.to_string()),
        }
    }
}

/// Edge values (top, right, bottom, left) in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }
}

/// Page size plus printable margins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageLayout {
    pub page_size: PageSize,
    pub margins: Edges,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            page_size: PageSize::Letter,
            margins: Edges::uniform(50.0),
        }
    }
}

impl PageLayout {
    /// Width available to content between the left and right margins.
    pub fn content_width(&self) -> f64 {
        let (width, _) = self.page_size.dimensions();
        width - self.margins.left - self.margins.right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_forms() {
        let short = Color::hex("#fff");
        assert_eq!(short, Color::WHITE);
        let long = Color::hex("#3498db");
        assert!((long.r - 0x34 as f64 / 255.0).abs() < 1e-9);
        assert_eq!(long.to_hex(), "#3498db");
        assert_eq!(Color::hex("not-a-color"), Color::BLACK);
        assert!(Color::parse("#12345").is_none());
    }

    #[test]
    fn test_color_serde_as_hex_string() {
        let c: Color = serde_json::from_str("\"#c7254e\"").unwrap();
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"#c7254e\"");
        assert!(serde_json::from_str::<Color>("\"#zzzzzz\"").is_err());
    }

    #[test]
    fn test_heading_level_clamped() {
        let theme = Theme::default();
        assert_eq!(theme.heading(0).font_size, theme.heading(1).font_size);
        assert_eq!(theme.heading(9).font_size, theme.heading(6).font_size);
        assert_eq!(theme.heading(1).font_size, 28.0);
    }

    #[test]
    fn test_override_merges_field_by_field() {
        let patch: ThemeOverride = serde_json::from_str(
            r##"{ "h1": { "color": "#ff0000" }, "body": { "fontSize": 13 }, "linkColor": "#00ff00" }"##,
        )
        .unwrap();
        let theme = Theme::default().with_override(&patch);
        assert_eq!(theme.headings[0].color, Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(theme.headings[0].font_size, 28.0);
        assert_eq!(theme.headings[0].font, "Helvetica-Bold");
        assert_eq!(theme.body.font_size, 13.0);
        assert_eq!(theme.body.font, "Helvetica");
        assert_eq!(theme.link_color, Color::rgb(0.0, 1.0, 0.0));
        assert_eq!(theme.table, Theme::default().table);
    }

    #[test]
    fn test_syntax_override_extends_tokens() {
        let base = themes::by_name("modern").unwrap();
        let keyword_before = base.syntax.as_ref().unwrap().tokens["keyword"];
        let mut patch = ThemeOverride::default();
        let mut syntax = SyntaxThemeOverride::default();
        syntax.tokens.insert("string".to_string(), Color::hex("#010203"));
        patch.syntax = Some(syntax);
        let merged = base.with_override(&patch);
        let palette = merged.syntax.unwrap();
        assert_eq!(palette.tokens["string"], Color::hex("#010203"));
        assert_eq!(palette.tokens["keyword"], keyword_before);
    }

    #[test]
    fn test_color_for_space_separated_kinds() {
        let palette = themes::by_name("ocean").unwrap().syntax.unwrap();
        assert_eq!(
            palette.color_for(Some("unknown keyword")),
            palette.tokens["keyword"]
        );
        assert_eq!(palette.color_for(Some("nothing-here")), palette.tokens["default"]);
        assert_eq!(palette.color_for(None), palette.tokens["default"]);
    }

    #[test]
    fn test_page_size_parsing() {
        assert_eq!("a4".parse::<PageSize>().unwrap(), PageSize::A4);
        assert_eq!("LETTER".parse::<PageSize>().unwrap(), PageSize::Letter);
        assert!("B7".parse::<PageSize>().is_err());

        let layout: PageLayout =
            serde_json::from_str(r#"{ "pageSize": { "width": 300, "height": 400 } }"#).unwrap();
        assert_eq!(layout.page_size.dimensions(), (300.0, 400.0));
        assert_eq!(layout.margins, Edges::uniform(50.0));
    }

    #[test]
    fn test_default_layout_is_letter_with_50pt_margins() {
        let layout = PageLayout::default();
        assert_eq!(layout.page_size.dimensions(), (612.0, 792.0));
        assert!((layout.content_width() - 512.0).abs() < 1e-9);
    }

    #[test]
    fn test_syntax_palette_fields() {
        let palette = Theme::default().syntax_theme();
        let json = serde_json::to_value(&palette).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["background", "defaultText", "gutter", "tokens"]);
    }
}
