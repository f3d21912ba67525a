//! Everything layout needs from the outside world, acquired up front.
//!
//! Layout is synchronous and never does I/O. Before it runs, [`Resources`]
//! walks the document once, resolves and decodes every block image, and
//! builds the emoji atlas from the source text. Failures are logged and
//! leave a gap that layout fills with a text fallback.

use std::collections::HashMap;
use std::sync::Arc;

use crate::emoji::{EmojiAtlas, EmojiRasterSource};
use crate::image_loader::{decode_image, ImageResolver, LoadedImage};
use crate::model::{Block, Document};

/// Decoded images keyed by their source reference, plus the emoji atlas.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    images: HashMap<String, Arc<LoadedImage>>,
    emoji: Option<EmojiAtlas>,
}

impl Resources {
    /// No images and monochrome emoji.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_emoji_atlas(atlas: EmojiAtlas) -> Self {
        Self {
            images: HashMap::new(),
            emoji: Some(atlas),
        }
    }

    /// Resolve every image block of `document` and, when an emoji source is
    /// given, build the atlas for the emoji in `source_text`.
    pub fn gather(
        document: &Document,
        source_text: &str,
        images: &dyn ImageResolver,
        emoji: Option<&dyn EmojiRasterSource>,
    ) -> Self {
        let mut resources = Self::empty();
        for block in document.blocks() {
            let Block::Image { url, .. } = block else {
                continue;
            };
            if resources.images.contains_key(url) {
                continue;
            }
            match images.resolve(url).and_then(|bytes| decode_image(&bytes)) {
                Ok(image) => resources.insert_image(url, image),
                Err(e) => log::warn!("image '{}' unavailable: {}", url, e),
            }
        }
        if let Some(source) = emoji {
            resources.emoji = Some(EmojiAtlas::build(source_text, source));
        }
        log::debug!("gathered {} images", resources.images.len());
        resources
    }

    pub fn insert_image(&mut self, src: &str, image: LoadedImage) {
        self.images.insert(src.to_string(), Arc::new(image));
    }

    pub fn image(&self, src: &str) -> Option<&Arc<LoadedImage>> {
        self.images.get(src)
    }

    /// The atlas, when color emoji are enabled.
    pub fn emoji_atlas(&self) -> Option<&EmojiAtlas> {
        self.emoji.as_ref()
    }
}
