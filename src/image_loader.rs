//! # Image Loading and Decoding
//!
//! Resolves image references (data URIs, file paths) to bytes and prepares
//! them for PDF embedding. JPEG images pass through without re-encoding
//! (PDF supports DCTDecode natively). PNG images are decoded to RGB pixels
//! with a separate alpha channel for SMask transparency.
//!
//! Resolution goes through the [`ImageResolver`] trait so callers can plug in
//! their own acquisition (HTTP, asset bundles, rasterized SVG). The crate
//! itself never touches the network.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder, ImageFormat};

use crate::error::{QuireError, Result};

/// A fully decoded/loaded image ready for PDF embedding.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded directly with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded RGB pixels + optional alpha channel.
    Decoded {
        /// width * height * 3 bytes (RGB)
        rgb: Vec<u8>,
        /// width * height bytes (grayscale alpha). None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

/// Turns an image reference from the document into raw PNG/JPEG bytes.
pub trait ImageResolver {
    fn resolve(&self, src: &str) -> Result<Vec<u8>>;
}

impl<F> ImageResolver for F
where
    F: Fn(&str) -> Result<Vec<u8>>,
{
    fn resolve(&self, src: &str) -> Result<Vec<u8>> {
        self(src)
    }
}

/// Resolves `data:image/...;base64,` URIs and local paths. Relative paths are
/// taken relative to `base_path` (the current directory when unset).
#[derive(Debug, Clone, Default)]
pub struct FileImageResolver {
    pub base_path: Option<PathBuf>,
}

impl FileImageResolver {
    pub fn new(base_path: Option<PathBuf>) -> Self {
        Self { base_path }
    }

    fn path_for(&self, src: &str) -> PathBuf {
        let path = Path::new(src.strip_prefix("file://").unwrap_or(src));
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ImageResolver for FileImageResolver {
    fn resolve(&self, src: &str) -> Result<Vec<u8>> {
        if src.starts_with("data:") {
            return decode_data_uri(src);
        }
        if src.starts_with("http://") || src.starts_with("https://") {
            return Err(QuireError::Image(format!(
                "remote image '{}' needs a custom resolver",
                src
            )));
        }
        let path = self.path_for(src);
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
        {
            return Err(QuireError::Image(format!(
                "SVG image '{}' must be rasterized before embedding",
                src
            )));
        }
        std::fs::read(&path).map_err(|e| QuireError::io(path, e))
    }
}

/// Decode the payload of a base64 data URI.
fn decode_data_uri(src: &str) -> Result<Vec<u8>> {
    let (header, payload) = src
        .split_once(',')
        .ok_or_else(|| QuireError::Image("Invalid data URI: missing comma".to_string()))?;
    if header.starts_with("data:image/svg") {
        return Err(QuireError::Image(
            "SVG data URIs must be rasterized before embedding".to_string(),
        ));
    }
    if !header.ends_with(";base64") {
        return Err(QuireError::Image(
            "Only base64 data URIs are supported".to_string(),
        ));
    }
    base64_decode(payload)
}

fn base64_decode(input: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| QuireError::Image(format!("Base64 decode error: {}", e)))
}

/// Decode PNG or JPEG bytes into an embeddable image. The format comes from
/// the leading magic bytes, never from the file name.
pub fn decode_image(data: &[u8]) -> Result<LoadedImage> {
    match image::guess_format(data) {
        Ok(ImageFormat::Jpeg) => passthrough_jpeg(data),
        Ok(ImageFormat::Png) => decode_png(data),
        Ok(other) => Err(QuireError::Image(format!(
            "unsupported image format {:?} (expected JPEG or PNG)",
            other
        ))),
        Err(_) => Err(QuireError::Image("unrecognized image data".to_string())),
    }
}

/// Keep the JPEG bytes as they are; only the header is read for the size
/// and component count.
fn passthrough_jpeg(data: &[u8]) -> Result<LoadedImage> {
    let decoder = JpegDecoder::new(Cursor::new(data))
        .map_err(|e| QuireError::Image(format!("bad JPEG header: {}", e)))?;
    let (width_px, height_px) = decoder.dimensions();
    let color_space = match decoder.color_type() {
        ColorType::L8 | ColorType::L16 => JpegColorSpace::DeviceGray,
        _ => JpegColorSpace::DeviceRGB,
    };
    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space,
        },
        width_px,
        height_px,
    })
}

/// Decode to RGBA and split off the alpha plane, dropping it when every
/// pixel is opaque.
fn decode_png(data: &[u8]) -> Result<LoadedImage> {
    let rgba = image::load_from_memory_with_format(data, ImageFormat::Png)
        .map_err(|e| QuireError::Image(format!("PNG decode failed: {}", e)))?
        .into_rgba8();
    let (width_px, height_px) = rgba.dimensions();

    let raw = rgba.as_raw();
    let mut rgb = Vec::with_capacity(raw.len() / 4 * 3);
    let mut alpha = Vec::with_capacity(raw.len() / 4);
    for px in raw.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
        alpha.push(px[3]);
    }
    let alpha = alpha.iter().any(|&a| a != u8::MAX).then_some(alpha);

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded { rgb, alpha },
        width_px,
        height_px,
    })
}
