//! # Emoji
//!
//! Finds emoji sequences in text and splits the text into emoji and
//! non-emoji runs, so layout can switch to an emoji font or overlay color
//! rasters.
//!
//! A single emoji "unit" is one of:
//!
//! - a regional-indicator pair (flags)
//! - a tag sequence (subdivision flags such as England)
//! - a keycap sequence (`1️⃣`)
//! - a ZWJ sequence of emoji elements, where an element is a
//!   presentation-default emoji, a text-default pictograph forced to emoji
//!   presentation with VS16, or a modifier base with a skin tone
//!
//! Adjacent units merge into one run when segmenting.

pub mod overlay;

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::error::{QuireError, Result};
use crate::image_loader::{decode_image, LoadedImage};

pub use overlay::{fallback_label, EmojiOverlay, EmojiPlacement};

static EMOJI_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let element = concat!(
        r"(?:\p{Emoji_Presentation}\x{FE0F}?\p{Emoji_Modifier}?",
        r"|\p{Extended_Pictographic}\x{FE0F}\p{Emoji_Modifier}?",
        r"|\p{Emoji_Modifier_Base}\p{Emoji_Modifier})",
    );
    let joined = r"(?:\p{Extended_Pictographic}\x{FE0F}?\p{Emoji_Modifier}?)";
    let pattern = format!(
        concat!(
            r"[\x{{1F1E6}}-\x{{1F1FF}}]{{2}}",
            r"|\x{{1F3F4}}[\x{{E0020}}-\x{{E007E}}]+\x{{E007F}}",
            r"|[0-9#*]\x{{FE0F}}?\x{{20E3}}",
            r"|{element}(?:\x{{200D}}{joined})*",
        ),
        element = element,
        joined = joined,
    );
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        // Only reachable if the regex build lacks Unicode emoji tables.
        Err(e) => {
            log::warn!("emoji pattern unavailable ({}); emoji detection disabled", e);
            None
        }
    }
});

fn matches(text: &str) -> impl Iterator<Item = regex::Match<'_>> {
    EMOJI_RE
        .as_ref()
        .into_iter()
        .flat_map(move |re| re.find_iter(text))
}

/// One run of a segmented string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub is_emoji: bool,
}

/// Split text into alternating emoji / non-emoji runs.
///
/// ```
/// use quire::emoji::split_emoji_segments;
/// let segs = split_emoji_segments("Hello 🎉🔥 world");
/// assert_eq!(segs.len(), 3);
/// assert_eq!(segs[1].text, "🎉🔥");
/// assert!(segs[1].is_emoji);
/// ```
pub fn split_emoji_segments(text: &str) -> Vec<Segment<'_>> {
    let mut segments: Vec<Segment<'_>> = Vec::new();
    let mut last = 0;
    let mut emoji_start = None;

    for m in matches(text) {
        if m.start() > last {
            if let Some(start) = emoji_start.take() {
                segments.push(Segment {
                    text: &text[start..last],
                    is_emoji: true,
                });
            }
            segments.push(Segment {
                text: &text[last..m.start()],
                is_emoji: false,
            });
        }
        emoji_start.get_or_insert(m.start());
        last = m.end();
    }
    if let Some(start) = emoji_start {
        segments.push(Segment {
            text: &text[start..last],
            is_emoji: true,
        });
    }
    if last < text.len() {
        segments.push(Segment {
            text: &text[last..],
            is_emoji: false,
        });
    }
    segments
}

pub fn contains_emoji(text: &str) -> bool {
    EMOJI_RE.as_ref().is_some_and(|re| re.is_match(text))
}

/// Individual emoji units in order, without merging.
pub fn emoji_units(text: &str) -> impl Iterator<Item = &str> {
    matches(text).map(|m| m.as_str())
}

/// Twemoji asset name: lowercase hex codepoints joined by `-`, VS16 dropped.
///
/// ```
/// use quire::emoji::twemoji_codepoints;
/// assert_eq!(twemoji_codepoints("🎉"), "1f389");
/// assert_eq!(twemoji_codepoints("❤️"), "2764");
/// ```
pub fn twemoji_codepoints(emoji: &str) -> String {
    emoji
        .chars()
        .filter(|&ch| ch != '\u{FE0F}')
        .map(|ch| format!("{:x}", ch as u32))
        .collect::<Vec<_>>()
        .join("-")
}

/// Produces a color raster (PNG or JPEG bytes) for one emoji.
pub trait EmojiRasterSource {
    fn render(&self, emoji: &str) -> Result<Vec<u8>>;
}

impl<F> EmojiRasterSource for F
where
    F: Fn(&str) -> Result<Vec<u8>>,
{
    fn render(&self, emoji: &str) -> Result<Vec<u8>> {
        self(emoji)
    }
}

/// Reads pre-rendered PNGs named by [`twemoji_codepoints`] from a directory,
/// e.g. a checkout of the Twemoji `72x72` assets.
#[derive(Debug, Clone)]
pub struct DirectoryEmojiSource {
    dir: PathBuf,
}

impl DirectoryEmojiSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl EmojiRasterSource for DirectoryEmojiSource {
    fn render(&self, emoji: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(format!("{}.png", twemoji_codepoints(emoji)));
        std::fs::read(&path).map_err(|e| QuireError::io(path, e))
    }
}

/// Emoji → decoded raster lookup, built once per render before layout.
#[derive(Debug, Clone, Default)]
pub struct EmojiAtlas {
    rasters: HashMap<String, Arc<LoadedImage>>,
}

impl EmojiAtlas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `text` for unique emoji and render each through `source`.
    /// Emoji that fail to render or decode are left out; they fall back to
    /// monochrome glyphs at draw time.
    pub fn build(text: &str, source: &dyn EmojiRasterSource) -> Self {
        let unique: BTreeSet<&str> = emoji_units(text).collect();
        let mut atlas = Self::new();
        for emoji in unique {
            match source.render(emoji).and_then(|bytes| decode_image(&bytes)) {
                Ok(image) => atlas.insert(emoji, image),
                Err(e) => log::debug!("no color raster for {:?}: {}", emoji, e),
            }
        }
        log::debug!("emoji atlas holds {} rasters", atlas.len());
        atlas
    }

    pub fn insert(&mut self, emoji: &str, image: LoadedImage) {
        self.rasters.insert(emoji.to_string(), Arc::new(image));
    }

    pub fn get(&self, emoji: &str) -> Option<&Arc<LoadedImage>> {
        self.rasters.get(emoji)
    }

    pub fn len(&self) -> usize {
        self.rasters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rasters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emoji_texts(text: &str) -> Vec<&str> {
        split_emoji_segments(text)
            .into_iter()
            .filter(|s| s.is_emoji)
            .map(|s| s.text)
            .collect()
    }

    #[test]
    fn test_plain_text_has_no_segments_marked() {
        let segs = split_emoji_segments("plain 123 #tag *x*");
        assert_eq!(segs.len(), 1);
        assert!(!segs[0].is_emoji);
        assert!(!contains_emoji("© ® ™ 1 #"));
    }

    #[test]
    fn test_empty_text() {
        assert!(split_emoji_segments("").is_empty());
    }

    #[test]
    fn test_adjacent_emoji_merge() {
        let segs = split_emoji_segments("Hello 🎉🔥 world");
        assert_eq!(
            segs,
            vec![
                Segment { text: "Hello ", is_emoji: false },
                Segment { text: "🎉🔥", is_emoji: true },
                Segment { text: " world", is_emoji: false },
            ]
        );
        assert_eq!(emoji_units("🎉🔥").count(), 2);
    }

    #[test]
    fn test_sequences_stay_whole() {
        // ZWJ family, skin tone, keycap, flag, tag flag, VS16 heart
        let family = "👨\u{200D}👩\u{200D}👧";
        let wave = "👋🏽";
        let keycap = "1\u{FE0F}\u{20E3}";
        let flag = "🇯🇵";
        let england = "🏴\u{E0067}\u{E0062}\u{E0065}\u{E006E}\u{E0067}\u{E007F}";
        let heart = "❤\u{FE0F}";
        for unit in [family, wave, keycap, flag, england, heart] {
            let text = format!("a {} b", unit);
            assert_eq!(emoji_texts(&text), vec![unit], "unit {:?}", unit);
            assert_eq!(emoji_units(&text).collect::<Vec<_>>(), vec![unit]);
        }
    }

    #[test]
    fn test_rainbow_flag_is_one_unit() {
        let rainbow = "🏳\u{FE0F}\u{200D}🌈";
        let text = format!("Hi {}", rainbow);
        let units: Vec<&str> = emoji_units(&text).collect();
        assert_eq!(units, vec![rainbow]);
    }

    #[test]
    fn test_text_default_without_vs16_is_text() {
        assert!(!contains_emoji("\u{2764}"));
        assert!(contains_emoji("\u{2764}\u{FE0F}"));
    }

    #[test]
    fn test_twemoji_codepoints() {
        assert_eq!(twemoji_codepoints("🎉"), "1f389");
        assert_eq!(
            twemoji_codepoints("👨\u{200D}👩\u{200D}👧\u{200D}👦"),
            "1f468-200d-1f469-200d-1f467-200d-1f466"
        );
        assert_eq!(twemoji_codepoints("🏳\u{FE0F}\u{200D}🌈"), "1f3f3-200d-1f308");
    }

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 200, 0, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgba8)
            .unwrap();
        buf
    }

    #[test]
    fn test_atlas_skips_failures() {
        let png = tiny_png();
        let source = move |emoji: &str| -> Result<Vec<u8>> {
            if emoji == "🎉" {
                Ok(png.clone())
            } else {
                Err(QuireError::Image("not found".to_string()))
            }
        };
        let atlas = EmojiAtlas::build("Party 🎉 🎉 and 🔥", &source);
        assert_eq!(atlas.len(), 1);
        assert!(atlas.get("🎉").is_some());
        assert!(atlas.get("🔥").is_none());
    }

    #[test]
    fn test_directory_source_uses_twemoji_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2764.png"), tiny_png()).unwrap();

        let source = DirectoryEmojiSource::new(dir.path());
        assert!(source.render("❤\u{FE0F}").is_ok());
        assert!(source.render("🎉").is_err());
    }
}
