//! Advance widths for the standard PDF fonts.
//!
//! Values are the AFM widths (1/1000 em) for printable ASCII, 0x20..=0x7E.
//! Oblique and italic faces reuse the upright widths; the difference is
//! below what matters for wrapping.

use super::StandardFont;

const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    278, 278, 564, 564, 564, 444, 921,
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    333, 278, 333, 469, 500, 333,
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    480, 200, 480, 541,
];

const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 570, 570, 570, 500, 930,
    722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944,
    722, 778, 611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667,
    333, 278, 333, 581, 500, 333,
    500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833,
    556, 500, 556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444,
    394, 220, 394, 520,
];

/// Width table and vertical metrics for one standard face.
#[derive(Debug, Clone, Copy)]
pub struct StandardFontMetrics {
    ascii: Option<&'static [u16; 95]>,
    /// Width used for everything without a table entry (and for every glyph
    /// of a monospaced face).
    default_width: u16,
    ascent: i16,
    descent: i16,
    line_gap: i16,
    /// Widths of the common non-ASCII punctuation, in order:
    /// bullet, en dash, em dash, single quotes, double quotes, ellipsis.
    punctuation: [u16; 6],
}

impl StandardFontMetrics {
    /// Advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        self.units(ch) as f64 / 1000.0 * font_size
    }

    pub fn measure_string(&self, text: &str, font_size: f64) -> f64 {
        let units: u32 = text.chars().map(|ch| self.units(ch) as u32).sum();
        units as f64 / 1000.0 * font_size
    }

    /// Distance from the top of the line box to the baseline.
    pub fn ascent(&self, font_size: f64) -> f64 {
        self.ascent as f64 / 1000.0 * font_size
    }

    /// Ascent + descent + gap: the distance between consecutive baselines.
    pub fn line_height(&self, font_size: f64) -> f64 {
        (self.ascent - self.descent + self.line_gap) as f64 / 1000.0 * font_size
    }

    fn units(&self, ch: char) -> u16 {
        let cp = ch as u32;
        if let Some(table) = self.ascii {
            if (0x20..=0x7E).contains(&cp) {
                return table[(cp - 0x20) as usize];
            }
            if ch == '\u{00A0}' {
                return table[0];
            }
        } else {
            return self.default_width;
        }
        match ch {
            '\u{2022}' => self.punctuation[0],
            '\u{2013}' => self.punctuation[1],
            '\u{2014}' => self.punctuation[2],
            '\u{2018}' | '\u{2019}' | '\u{201A}' => self.punctuation[3],
            '\u{201C}' | '\u{201D}' | '\u{201E}' => self.punctuation[4],
            '\u{2026}' => self.punctuation[5],
            _ => self.default_width,
        }
    }
}

impl StandardFont {
    pub fn metrics(&self) -> StandardFontMetrics {
        let helvetica = StandardFontMetrics {
            ascii: Some(&HELVETICA),
            default_width: 556,
            ascent: 718,
            descent: -207,
            line_gap: 231,
            punctuation: [350, 556, 1000, 222, 333, 1000],
        };
        let times = StandardFontMetrics {
            ascii: Some(&TIMES_ROMAN),
            default_width: 500,
            ascent: 683,
            descent: -217,
            line_gap: 216,
            punctuation: [350, 500, 1000, 333, 444, 1000],
        };
        let courier = StandardFontMetrics {
            ascii: None,
            default_width: 600,
            ascent: 629,
            descent: -157,
            line_gap: 269,
            punctuation: [600; 6],
        };
        match self {
            StandardFont::Helvetica | StandardFont::HelveticaOblique => helvetica,
            StandardFont::HelveticaBold | StandardFont::HelveticaBoldOblique => StandardFontMetrics {
                ascii: Some(&HELVETICA_BOLD),
                default_width: 611,
                ..helvetica
            },
            StandardFont::TimesRoman | StandardFont::TimesItalic => times,
            StandardFont::TimesBold | StandardFont::TimesBoldItalic => StandardFontMetrics {
                ascii: Some(&TIMES_BOLD),
                punctuation: [350, 500, 1000, 333, 500, 1000],
                ..times
            },
            StandardFont::Courier
            | StandardFont::CourierBold
            | StandardFont::CourierOblique
            | StandardFont::CourierBoldOblique => courier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helvetica_space_width() {
        let m = StandardFont::Helvetica.metrics();
        assert!((m.char_width(' ', 12.0) - 3.336).abs() < 0.001);
        assert!((m.char_width('\u{00A0}', 12.0) - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_courier_is_monospaced() {
        let m = StandardFont::Courier.metrics();
        assert_eq!(m.measure_string("iiii", 10.0), m.measure_string("WWWW", 10.0));
        assert!((m.measure_string("abc", 10.0) - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_height_exceeds_font_size() {
        for font in [StandardFont::Helvetica, StandardFont::TimesRoman, StandardFont::Courier] {
            let m = font.metrics();
            assert!(m.line_height(10.0) > 10.0);
            assert!(m.ascent(10.0) < 10.0);
        }
    }
}
