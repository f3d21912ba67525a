//! JSON render configuration.
//!
//! Every field is optional. Absent fields keep the [`RenderOptions`]
//! defaults, so an empty object `{}` is a valid config.
//!
//! ```json
//! {
//!   "theme": "Ocean",
//!   "themeOverrides": { "body": { "fontSize": 12 }, "linkColor": "#0066cc" },
//!   "page": { "pageSize": "A4", "margins": { "top": 72, "right": 72, "bottom": 72, "left": 72 } },
//!   "syntaxHighlighting": true,
//!   "lineNumbers": false,
//!   "emojiImages": "assets/twemoji/72x72",
//!   "metadata": { "title": "Notes" }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{QuireError, Result};
use crate::model::Metadata;
use crate::style::{themes, PageLayout, Theme, ThemeOverride};
use crate::RenderOptions;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    /// Name of a built-in theme.
    pub theme: Option<String>,
    /// Partial theme merged over the named one.
    pub theme_overrides: Option<ThemeOverride>,
    pub page: Option<PageLayout>,
    pub syntax_highlighting: Option<bool>,
    pub line_numbers: Option<bool>,
    /// TrueType font used for monochrome emoji.
    pub emoji_font: Option<PathBuf>,
    /// Directory of Twemoji-named PNGs; enables color emoji.
    pub emoji_images: Option<PathBuf>,
    /// Directory relative image paths are resolved against.
    pub image_base_path: Option<PathBuf>,
    pub metadata: Metadata,
    /// Deflate content streams (on by default).
    pub compress: Option<bool>,
}

impl RenderConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| QuireError::io(path, e))?;
        let mut config = Self::from_json(&json)?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Make relative paths relative to `dir` (the config file's directory).
    fn resolve_paths(&mut self, dir: &Path) {
        for path in [&mut self.emoji_font, &mut self.emoji_images, &mut self.image_base_path]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        }
    }

    /// Resolve the named theme. Unknown names fall back to the default
    /// theme with a warning.
    pub fn base_theme(&self) -> Theme {
        match self.theme.as_deref() {
            None => Theme::default(),
            Some(name) => themes::by_name(name).unwrap_or_else(|| {
                log::warn!(
                    "unknown theme '{}' (available: {}); using Default",
                    name,
                    themes::THEME_NAMES.join(", ")
                );
                Theme::default()
            }),
        }
    }

    pub fn into_options(self) -> RenderOptions {
        let mut theme = self.base_theme();
        if let Some(patch) = &self.theme_overrides {
            theme = theme.with_override(patch);
        }
        let defaults = RenderOptions::default();
        RenderOptions {
            theme,
            page: self.page.unwrap_or(defaults.page),
            highlight: self.syntax_highlighting.unwrap_or(defaults.highlight),
            line_numbers: self.line_numbers.unwrap_or(defaults.line_numbers),
            emoji_font: self.emoji_font,
            emoji_images: self.emoji_images,
            image_base_path: self.image_base_path,
            metadata: self.metadata,
            compress: self.compress.unwrap_or(defaults.compress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Color, PageSize};

    #[test]
    fn test_empty_config_is_defaults() {
        let options = RenderConfig::from_json("{}").unwrap().into_options();
        assert_eq!(options, RenderOptions::default());
    }

    #[test]
    fn test_theme_and_overrides_merge() {
        let config = RenderConfig::from_json(
            r##"{
                "theme": "ocean",
                "themeOverrides": { "body": { "fontSize": 13 }, "linkColor": "#0066cc" },
                "page": { "pageSize": "A4" },
                "lineNumbers": false
            }"##,
        )
        .unwrap();
        let options = config.into_options();
        let ocean = themes::ocean();
        assert_eq!(options.theme.name, "Ocean");
        assert_eq!(options.theme.body.font_size, 13.0);
        assert_eq!(options.theme.body.font, ocean.body.font);
        assert_eq!(options.theme.link_color, Color::hex("#0066cc"));
        assert_eq!(options.page.page_size, PageSize::A4);
        assert!(!options.line_numbers);
        assert!(options.highlight);
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let config = RenderConfig {
            theme: Some("Neon".to_string()),
            ..Default::default()
        };
        assert_eq!(config.base_theme().name, "Default");
    }

    #[test]
    fn test_bad_color_is_config_error_with_hint() {
        let err = RenderConfig::from_json(r#"{ "themeOverrides": { "linkColor": "blue" } }"#).unwrap_err();
        assert!(matches!(err, QuireError::Config { .. }));
        assert!(err.to_string().contains("Hint"));
    }

    #[test]
    fn test_load_resolves_paths_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quire.json");
        std::fs::write(&path, r#"{ "emojiImages": "twemoji", "imageBasePath": "/abs/images" }"#).unwrap();
        let config = RenderConfig::load(&path).unwrap();
        assert_eq!(config.emoji_images, Some(dir.path().join("twemoji")));
        assert_eq!(config.image_base_path, Some(PathBuf::from("/abs/images")));
    }
}
