//! Structured error types for the quire renderer.
//!
//! Only configuration, I/O, font and canvas failures surface here. Missing
//! images, missing emoji rasters and unknown languages degrade in place and
//! are logged instead of returned.

use std::path::PathBuf;

use thiserror::Error;

/// The unified error type returned by all public quire API functions.
#[derive(Debug, Error)]
pub enum QuireError {
    /// A JSON configuration or theme file failed to parse.
    #[error("Failed to parse configuration: {source}{}", hint_suffix(.hint))]
    Config {
        #[source]
        source: serde_json::Error,
        hint: String,
    },
    /// A file named by the caller could not be read or written.
    #[error("Failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Image bytes could not be decoded into something embeddable.
    #[error("Image error: {0}")]
    Image(String),
    /// A font could not be loaded, parsed, or embedded.
    #[error("Font error: {0}")]
    Font(String),
    /// Layout or PDF generation failed.
    #[error("Render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, QuireError>;

impl QuireError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        QuireError::Io {
            path: path.into(),
            source,
        }
    }
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for QuireError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the configuration schema. Check field names, hex colors and page sizes.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        QuireError::Config { source: e, hint }
    }
}
