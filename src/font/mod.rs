//! # Font Management
//!
//! Maps font names from the theme onto PDF fonts and measures text with them.
//!
//! The standard PDF fonts (Helvetica, Times, Courier) need no embedding and
//! are always available. Custom TrueType fonts, typically an emoji font for
//! monochrome emoji, are registered at runtime with their raw bytes; their
//! metrics come from ttf-parser and the PDF writer embeds them whole.

pub mod metrics;

pub use metrics::StandardFontMetrics;

use std::collections::HashMap;

use crate::error::{QuireError, Result};

/// Identifies one face: family + weight + style.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontKey {
    pub family: String,
    pub weight: u32,
    pub italic: bool,
}

impl FontKey {
    pub fn new(family: &str, weight: u32, italic: bool) -> Self {
        Self {
            family: family.to_string(),
            weight,
            italic,
        }
    }

    /// Parse a PostScript-style font name such as `Helvetica-BoldOblique`
    /// or `Times-Roman`. Unrecognised names become a regular-weight family.
    pub fn from_name(name: &str) -> Self {
        let (family, style) = match name.split_once('-') {
            Some((family, style)) if is_style_suffix(style) => (family, style),
            _ => (name, ""),
        };
        let bold = style.contains("Bold");
        let italic = style.contains("Oblique") || style.contains("Italic");
        Self::new(family, if bold { 700 } else { 400 }, italic)
    }

    /// The same family with bold and/or italic switched on. Flags only ever
    /// add style, so a bold heading stays bold inside `*emphasis*`.
    pub fn styled(&self, bold: bool, italic: bool) -> Self {
        Self {
            family: self.family.clone(),
            weight: if bold { self.weight.max(700) } else { self.weight },
            italic: self.italic || italic,
        }
    }

    pub fn is_bold(&self) -> bool {
        self.weight >= 600
    }
}

fn is_style_suffix(style: &str) -> bool {
    matches!(
        style,
        "Roman" | "Bold" | "Italic" | "Oblique" | "BoldItalic" | "BoldOblique" | "Regular"
    )
}

#[derive(Debug, Clone)]
pub enum FontData {
    /// One of the standard PDF fonts. No embedding needed.
    Standard(StandardFont),
    /// A TrueType/OpenType font that needs to be embedded.
    Custom {
        data: Vec<u8>,
        metrics: CustomFontMetrics,
    },
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    pub fn ascent(&self, font_size: f64) -> f64 {
        self.ascender as f64 / self.units_per_em as f64 * font_size
    }

    pub fn line_height(&self, font_size: f64) -> f64 {
        let units = self.ascender as f64 - self.descender as f64 + self.line_gap as f64;
        units / self.units_per_em as f64 * font_size
    }

    /// Parse metrics from font data using ttf-parser.
    ///
    /// Every codepoint of every Unicode cmap subtable is recorded, which
    /// covers the supplementary planes emoji live in.
    pub fn from_font_data(data: &[u8]) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, 0).ok()?;
        let units_per_em = face.units_per_em();

        let mut codepoints = Vec::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if subtable.is_unicode() {
                    subtable.codepoints(|cp| codepoints.push(cp));
                }
            }
        }

        let mut advance_widths = HashMap::new();
        for ch in codepoints.into_iter().filter_map(char::from_u32) {
            if let Some(glyph_id) = face.glyph_index(ch) {
                let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                advance_widths.insert(ch, advance);
            }
        }

        let default_advance = match advance_widths.get(&' ') {
            Some(&w) if w > 0 => w,
            _ => units_per_em / 2,
        };

        Some(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            line_gap: face.line_gap(),
        })
    }
}

/// The standard PDF fonts the theme can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }
}

/// Maps font keys to font data, falling back to Helvetica.
pub struct FontRegistry {
    fonts: HashMap<FontKey, FontData>,
    fallback: [FontData; 4],
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();

        let standard_mappings = [
            (("Helvetica", 400, false), StandardFont::Helvetica),
            (("Helvetica", 700, false), StandardFont::HelveticaBold),
            (("Helvetica", 400, true), StandardFont::HelveticaOblique),
            (("Helvetica", 700, true), StandardFont::HelveticaBoldOblique),
            (("Times", 400, false), StandardFont::TimesRoman),
            (("Times", 700, false), StandardFont::TimesBold),
            (("Times", 400, true), StandardFont::TimesItalic),
            (("Times", 700, true), StandardFont::TimesBoldItalic),
            (("Courier", 400, false), StandardFont::Courier),
            (("Courier", 700, false), StandardFont::CourierBold),
            (("Courier", 400, true), StandardFont::CourierOblique),
            (("Courier", 700, true), StandardFont::CourierBoldOblique),
        ];

        for ((family, weight, italic), font) in standard_mappings {
            fonts.insert(FontKey::new(family, weight, italic), FontData::Standard(font));
        }

        Self {
            fonts,
            fallback: [
                FontData::Standard(StandardFont::Helvetica),
                FontData::Standard(StandardFont::HelveticaBold),
                FontData::Standard(StandardFont::HelveticaOblique),
                FontData::Standard(StandardFont::HelveticaBoldOblique),
            ],
        }
    }

    /// Look up a font, falling back to Helvetica if not found.
    pub fn resolve(&self, key: &FontKey) -> &FontData {
        if let Some(font) = self.fonts.get(key) {
            return font;
        }

        // Try with normalized weight (snap to 400 or 700)
        let snapped_weight = if key.is_bold() { 700 } else { 400 };
        let snapped = FontKey::new(&key.family, snapped_weight, key.italic);
        if let Some(font) = self.fonts.get(&snapped) {
            return font;
        }

        // A custom family registered only in its regular face
        let regular = FontKey::new(&key.family, 400, false);
        if let Some(font @ FontData::Custom { .. }) = self.fonts.get(&regular) {
            return font;
        }

        let idx = (key.is_bold() as usize) | ((key.italic as usize) << 1);
        &self.fallback[idx]
    }

    /// Whether the family has at least one registered face.
    pub fn has_family(&self, family: &str) -> bool {
        self.fonts.keys().any(|k| k.family == family)
    }

    /// Register a custom TrueType/OpenType font.
    pub fn register(&mut self, family: &str, weight: u32, italic: bool, data: Vec<u8>) -> Result<()> {
        let metrics = CustomFontMetrics::from_font_data(&data).ok_or_else(|| {
            QuireError::Font(format!("'{}' is not a parseable TrueType/OpenType font", family))
        })?;
        log::debug!(
            "registered font '{}' ({} glyph widths)",
            family,
            metrics.advance_widths.len()
        );
        self.fonts.insert(
            FontKey::new(family, weight, italic),
            FontData::Custom { data, metrics },
        );
        Ok(())
    }
}

/// Shared font context used by layout and PDF serialization.
/// Provides text measurement with real glyph metrics.
#[derive(Default)]
pub struct FontContext {
    registry: FontRegistry,
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
        }
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, key: &FontKey, font_size: f64) -> f64 {
        match self.registry.resolve(key) {
            FontData::Standard(std_font) => std_font.metrics().char_width(ch, font_size),
            FontData::Custom { metrics, .. } => metrics.char_width(ch, font_size),
        }
    }

    /// Measure the width of a string in points.
    pub fn measure_string(&self, text: &str, key: &FontKey, font_size: f64) -> f64 {
        match self.registry.resolve(key) {
            FontData::Standard(std_font) => std_font.metrics().measure_string(text, font_size),
            FontData::Custom { metrics, .. } => {
                text.chars().map(|ch| metrics.char_width(ch, font_size)).sum()
            }
        }
    }

    /// Distance from the top of a line to its baseline.
    pub fn ascent(&self, key: &FontKey, font_size: f64) -> f64 {
        match self.registry.resolve(key) {
            FontData::Standard(std_font) => std_font.metrics().ascent(font_size),
            FontData::Custom { metrics, .. } => metrics.ascent(font_size),
        }
    }

    /// Natural line height of the face at this size, without extra leading.
    pub fn line_height(&self, key: &FontKey, font_size: f64) -> f64 {
        match self.registry.resolve(key) {
            FontData::Standard(std_font) => std_font.metrics().line_height(font_size),
            FontData::Custom { metrics, .. } => metrics.line_height(font_size),
        }
    }

    /// Resolve a font key to its font data.
    pub fn resolve(&self, key: &FontKey) -> &FontData {
        self.registry.resolve(key)
    }

    /// Access the underlying font registry.
    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }

    /// Access the underlying font registry mutably.
    pub fn registry_mut(&mut self) -> &mut FontRegistry {
        &mut self.registry
    }
}
