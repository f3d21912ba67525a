//! # PDF Serializer
//!
//! Takes the pages recorded by the canvas and writes a valid PDF file.
//!
//! This is a from-scratch PDF 1.7 writer. The subset needed for documents
//! made of text runs, rectangles, rules and raster images is small enough
//! to write by hand, and doing so keeps the output byte-for-byte
//! deterministic: no timestamps, no random IDs, fonts and images numbered in
//! a fixed order.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, etc.)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! ## Font Embedding
//!
//! Standard PDF fonts (Helvetica, Times, Courier) use simple Type1 references
//! with WinAnsiEncoding. Custom TrueType fonts are embedded whole as
//! CIDFontType2 with Identity-H encoding, producing 5 PDF objects per font:
//! FontFile2, FontDescriptor, CIDFont, ToUnicode CMap, and the root Type0
//! dictionary.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>
use std::sync::Arc;

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::canvas::{CanvasPage, DrawOp, Rect, Stroke};
use crate::error::{QuireError, Result};
use crate::font::{FontContext, FontData, FontKey};
use crate::image_loader::{ImagePixelData, JpegColorSpace, LoadedImage};
use crate::model::Metadata;
use crate::style::Color;

pub struct PdfWriter {
    compress: bool,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Embedding data for a custom TrueType font.
struct CustomFontEmbedData {
    /// Maps characters to glyph IDs in the embedded font.
    char_to_gid: HashMap<char, u16>,
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Font resources in /F0, /F1, ... order with their object ids.
    font_objects: Vec<(FontKey, usize)>,
    /// Embedding data for custom fonts, keyed by FontKey.
    custom_font_data: HashMap<FontKey, CustomFontEmbedData>,
    /// Distinct images in first-use order with their XObject ids (/Im0, /Im1, ...).
    image_objects: Vec<(Arc<LoadedImage>, usize)>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }

    fn font_index(&self, key: &FontKey) -> usize {
        self.font_objects
            .iter()
            .position(|(k, _)| k == key)
            .unwrap_or(0)
    }

    fn image_index(&self, image: &Arc<LoadedImage>) -> Option<usize> {
        self.image_objects
            .iter()
            .position(|(known, _)| Arc::ptr_eq(known, image))
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self { compress: true }
    }

    /// A writer that stores content streams uncompressed, which makes the
    /// drawing operators readable in the output.
    pub fn uncompressed() -> Self {
        Self { compress: false }
    }

    /// Write laid-out pages to a PDF byte vector.
    pub fn write(&self, pages: &[CanvasPage], metadata: &Metadata, fonts: &FontContext) -> Result<Vec<u8>> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
            custom_font_data: HashMap::new(),
            image_objects: Vec::new(),
        };

        // Reserve object IDs:
        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        // 3+ = fonts, images, then per page: annotations, content, page
        builder.push(vec![]);
        builder.push(vec![]);
        builder.push(vec![]);

        self.register_fonts(&mut builder, pages, fonts)?;
        self.register_images(&mut builder, pages);

        let mut page_obj_ids: Vec<usize> = Vec::new();

        for page in pages {
            let content = self.build_content_stream(page, &builder);
            let content_obj_id = builder.push(self.stream_object(content.as_bytes()));

            let annot_ids: Vec<usize> = Self::link_annotations(page)
                .into_iter()
                .map(|annot| builder.push(annot.into_bytes()))
                .collect();

            let font_resources = self.build_font_resource_dict(&builder.font_objects);
            let xobject_resources = self.build_xobject_resource_dict(page, &builder);
            let resources = if xobject_resources.is_empty() {
                format!("/Font << {} >>", font_resources)
            } else {
                format!(
                    "/Font << {} >> /XObject << {} >>",
                    font_resources, xobject_resources
                )
            };
            let annots = if annot_ids.is_empty() {
                String::new()
            } else {
                let refs: Vec<String> = annot_ids.iter().map(|id| format!("{} 0 R", id)).collect();
                format!(" /Annots [{}]", refs.join(" "))
            };
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >>{} >>",
                page.width, page.height, content_obj_id, resources, annots
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        // Write Catalog (object 1)
        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        // Write Pages tree (object 2)
        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        // Info dictionary (metadata)
        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title ({}) ", Self::escape_pdf_string(title));
        }
        if let Some(ref author) = metadata.author {
            let _ = write!(info, "/Author ({}) ", Self::escape_pdf_string(author));
        }
        if let Some(ref subject) = metadata.subject {
            let _ = write!(info, "/Subject ({}) ", Self::escape_pdf_string(subject));
        }
        let _ = write!(
            info,
            "/Producer (quire {}) /Creator (quire) >>",
            env!("CARGO_PKG_VERSION")
        );
        let info_obj_id = builder.push(info.into_bytes());

        log::debug!(
            "writing {} pages, {} fonts, {} images",
            pages.len(),
            builder.font_objects.len(),
            builder.image_objects.len()
        );
        Ok(self.serialize(&builder, info_obj_id))
    }

    fn stream_object(&self, content: &[u8]) -> Vec<u8> {
        let mut data: Vec<u8> = Vec::new();
        if self.compress {
            let compressed = compress_to_vec_zlib(content, 6);
            let _ = write!(
                data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            data.extend_from_slice(&compressed);
        } else {
            let _ = write!(data, "<< /Length {} >>\nstream\n", content.len());
            data.extend_from_slice(content);
        }
        data.extend_from_slice(b"\nendstream");
        data
    }

    /// Build the PDF content stream for a single page.
    fn build_content_stream(&self, page: &CanvasPage, builder: &PdfBuilder) -> String {
        let mut stream = String::new();
        for op in &page.ops {
            self.write_op(&mut stream, op, page.height, builder);
        }
        stream
    }

    fn write_op(&self, stream: &mut String, op: &DrawOp, page_height: f64, builder: &PdfBuilder) {
        match op {
            DrawOp::Text {
                x,
                baseline,
                width,
                text,
                font,
                size,
                color,
                underline,
                strike,
                ..
            } => {
                let idx = builder.font_index(font);
                let pdf_y = page_height - baseline;
                let _ = write!(
                    stream,
                    "BT\n{} rg\n/F{} {:.1} Tf\n{:.2} {:.2} Td\n",
                    Self::color_operands(color),
                    idx,
                    size,
                    x,
                    pdf_y
                );
                let _ = writeln!(stream, "{} Tj\nET", self.encode_text(text, font, builder));

                let thickness = (size * 0.05).max(0.5);
                if *underline {
                    let uy = pdf_y - size * 0.12;
                    Self::write_line(stream, *color, thickness, (*x, uy), (x + width, uy));
                }
                if *strike {
                    let sy = pdf_y + size * 0.28;
                    Self::write_line(stream, *color, thickness, (*x, sy), (x + width, sy));
                }
            }

            DrawOp::FillRect { rect, color } => {
                let (x, y, w, h) = Self::flip_rect(rect, page_height);
                let _ = write!(
                    stream,
                    "q\n{} rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                    Self::color_operands(color),
                    x,
                    y,
                    w,
                    h
                );
            }

            DrawOp::StrokeRect { rect, stroke } => {
                let (x, y, w, h) = Self::flip_rect(rect, page_height);
                let _ = write!(
                    stream,
                    "q\n{} RG\n{:.2} w\n{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
                    Self::color_operands(&stroke.color),
                    stroke.width,
                    x,
                    y,
                    w,
                    h
                );
            }

            DrawOp::Line { from, to, stroke } => {
                let Stroke { color, width } = *stroke;
                Self::write_line(
                    stream,
                    color,
                    width,
                    (from.0, page_height - from.1),
                    (to.0, page_height - to.1),
                );
            }

            DrawOp::Image { rect, image } => {
                let (x, y, w, h) = Self::flip_rect(rect, page_height);
                match builder.image_index(image) {
                    Some(img_idx) => {
                        let _ = write!(
                            stream,
                            "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                            w, h, x, y, img_idx
                        );
                    }
                    None => {
                        // Fallback: grey placeholder if the image was never registered
                        let _ = write!(
                            stream,
                            "q\n0.9 0.9 0.9 rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                            x, y, w, h
                        );
                    }
                }
            }
        }
    }

    fn color_operands(color: &Color) -> String {
        format!("{:.3} {:.3} {:.3}", color.r, color.g, color.b)
    }

    /// Convert a top-left rect into PDF's bottom-left (x, y, w, h).
    fn flip_rect(rect: &Rect, page_height: f64) -> (f64, f64, f64, f64) {
        (
            rect.x,
            page_height - rect.y - rect.height,
            rect.width,
            rect.height,
        )
    }

    /// Stroke a line given in PDF coordinates.
    fn write_line(stream: &mut String, color: Color, width: f64, from: (f64, f64), to: (f64, f64)) {
        let _ = write!(
            stream,
            "q\n{} RG\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
            Self::color_operands(&color),
            width,
            from.0,
            from.1,
            to.0,
            to.1
        );
    }

    /// Encode a text fragment as a PDF string operand for its font.
    fn encode_text(&self, text: &str, font: &FontKey, builder: &PdfBuilder) -> String {
        if let Some(embed) = builder.custom_font_data.get(font) {
            let mut hex = String::from("<");
            for ch in text.chars() {
                let gid = embed.char_to_gid.get(&ch).copied().unwrap_or(0);
                let _ = write!(hex, "{:04X}", gid);
            }
            hex.push('>');
            return hex;
        }

        let mut text_str = String::from("(");
        for ch in text.chars() {
            let b = Self::unicode_to_winansi(ch).unwrap_or(b'?');
            match b {
                b'\\' => text_str.push_str("\\\\"),
                b'(' => text_str.push_str("\\("),
                b')' => text_str.push_str("\\)"),
                0x20..=0x7E => text_str.push(b as char),
                _ => {
                    // Use octal escape for bytes outside ASCII printable range
                    let _ = write!(text_str, "\\{:03o}", b);
                }
            }
        }
        text_str.push(')');
        text_str
    }

    /// URI link annotations for every linked text fragment on a page.
    fn link_annotations(page: &CanvasPage) -> Vec<String> {
        page.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text {
                    x,
                    baseline,
                    width,
                    size,
                    link: Some(uri),
                    ..
                } => {
                    let bottom = page.height - baseline - size * 0.25;
                    let top = page.height - baseline + size * 0.85;
                    Some(format!(
                        "<< /Type /Annot /Subtype /Link /Rect [{:.2} {:.2} {:.2} {:.2}] \
                         /Border [0 0 0] /A << /Type /Action /S /URI /URI ({}) >> >>",
                        x,
                        bottom,
                        x + width,
                        top,
                        Self::escape_pdf_string(uri)
                    ))
                }
                _ => None,
            })
            .collect()
    }

    /// Register fonts used across all pages. Each distinct key gets its own
    /// PDF font object, numbered in key order.
    fn register_fonts(&self, builder: &mut PdfBuilder, pages: &[CanvasPage], fonts: &FontContext) -> Result<()> {
        let mut font_chars: BTreeMap<FontKey, BTreeSet<char>> = BTreeMap::new();
        for page in pages {
            for op in &page.ops {
                if let DrawOp::Text { font, text, .. } = op {
                    font_chars
                        .entry(font.clone())
                        .or_default()
                        .extend(text.chars());
                }
            }
        }

        // Always have at least Helvetica
        if font_chars.is_empty() {
            font_chars.insert(FontKey::new("Helvetica", 400, false), BTreeSet::new());
        }

        for (key, used_chars) in &font_chars {
            match fonts.resolve(key) {
                FontData::Standard(std_font) => {
                    let font_dict = format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                         /Encoding /WinAnsiEncoding >>",
                        std_font.pdf_name()
                    );
                    let obj_id = builder.push(font_dict.into_bytes());
                    builder.font_objects.push((key.clone(), obj_id));
                }
                FontData::Custom { data, .. } => {
                    let type0_obj_id = Self::write_custom_font_objects(builder, key, data, used_chars)?;
                    builder.font_objects.push((key.clone(), type0_obj_id));
                }
            }
        }

        Ok(())
    }

    /// Create XObjects for every distinct image, in first-use order.
    fn register_images(&self, builder: &mut PdfBuilder, pages: &[CanvasPage]) {
        for page in pages {
            for op in &page.ops {
                if let DrawOp::Image { image, .. } = op {
                    if builder.image_index(image).is_none() {
                        let xobj_id = Self::write_image_xobject(builder, image);
                        builder.image_objects.push((Arc::clone(image), xobj_id));
                    }
                }
            }
        }
    }

    /// Push an image as an XObject (plus an SMask object for PNG alpha) and
    /// return the id of the main object.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        let (w, h) = (image.width_px, image.height_px);
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                let space = match color_space {
                    JpegColorSpace::DeviceRGB => "/DeviceRGB",
                    JpegColorSpace::DeviceGray => "/DeviceGray",
                };
                builder.push(image_stream(w, h, space, "/DCTDecode", data, ""))
            }
            ImagePixelData::Decoded { rgb, alpha } => {
                let smask = alpha.as_ref().map(|alpha| {
                    let packed = compress_to_vec_zlib(alpha, 6);
                    builder.push(image_stream(w, h, "/DeviceGray", "/FlateDecode", &packed, ""))
                });
                let extra = smask.map(|id| format!(" /SMask {} 0 R", id)).unwrap_or_default();
                let packed = compress_to_vec_zlib(rgb, 6);
                builder.push(image_stream(w, h, "/DeviceRGB", "/FlateDecode", &packed, &extra))
            }
        }
    }

    /// Build the /XObject resource dict entries for the images a page uses.
    fn build_xobject_resource_dict(&self, page: &CanvasPage, builder: &PdfBuilder) -> String {
        let used: BTreeSet<usize> = page
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Image { image, .. } => builder.image_index(image),
                _ => None,
            })
            .collect();
        used.iter()
            .map(|&idx| format!("/Im{} {} 0 R", idx, builder.image_objects[idx].1))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Write the 5 CIDFont PDF objects for a custom TrueType font.
    /// Returns the object ID of the Type0 root font dictionary.
    fn write_custom_font_objects(
        builder: &mut PdfBuilder,
        key: &FontKey,
        ttf_data: &[u8],
        used_chars: &BTreeSet<char>,
    ) -> Result<usize> {
        let face = ttf_parser::Face::parse(ttf_data, 0).map_err(|e| {
            QuireError::Font(format!(
                "Failed to parse TTF data for font '{}': {}",
                key.family, e
            ))
        })?;

        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();

        let char_to_gid: HashMap<char, u16> = used_chars
            .iter()
            .filter_map(|&ch| face.glyph_index(ch).map(|gid| (ch, gid.0)))
            .collect();

        let pdf_font_name = Self::sanitize_font_name(&key.family, key.weight, key.italic);

        // 1. FontFile2 stream: the whole font, compressed
        let compressed_ttf = compress_to_vec_zlib(ttf_data, 6);
        let mut fontfile2_data: Vec<u8> = Vec::new();
        let _ = write!(
            fontfile2_data,
            "<< /Length {} /Length1 {} /Filter /FlateDecode >>\nstream\n",
            compressed_ttf.len(),
            ttf_data.len()
        );
        fontfile2_data.extend_from_slice(&compressed_ttf);
        fontfile2_data.extend_from_slice(b"\nendstream");
        let fontfile2_id = builder.push(fontfile2_data);

        // 2. FontDescriptor
        let bbox = face.global_bounding_box();
        let scale = 1000.0 / units_per_em as f64;
        let bbox_str = format!(
            "[{} {} {} {}]",
            (bbox.x_min as f64 * scale) as i32,
            (bbox.y_min as f64 * scale) as i32,
            (bbox.x_max as f64 * scale) as i32,
            (bbox.y_max as f64 * scale) as i32,
        );
        let cap_height = face.capital_height().unwrap_or(ascender) as f64 * scale;
        let stem_v = if key.is_bold() { 120 } else { 80 };

        let font_descriptor_dict = format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
             /FontBBox {} /ItalicAngle {} \
             /Ascent {} /Descent {} /CapHeight {} /StemV {} \
             /FontFile2 {} 0 R >>",
            pdf_font_name,
            bbox_str,
            if key.italic { -12 } else { 0 },
            (ascender as f64 * scale) as i32,
            (descender as f64 * scale) as i32,
            cap_height as i32,
            stem_v,
            fontfile2_id,
        );
        let font_descriptor_id = builder.push(font_descriptor_dict.into_bytes());

        // 3. CIDFont dictionary (DescendantFont)
        let w_array = Self::build_w_array(&char_to_gid, &face, units_per_em);
        let default_width = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .map(|adv| (adv as f64 * scale) as u32)
            .unwrap_or(1000);
        let cidfont_dict = format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {} 0 R /DW {} /W {} \
             /CIDToGIDMap /Identity >>",
            pdf_font_name, font_descriptor_id, default_width, w_array,
        );
        let cidfont_id = builder.push(cidfont_dict.into_bytes());

        // 4. ToUnicode CMap
        let cmap_content = Self::build_tounicode_cmap(&char_to_gid, &pdf_font_name);
        let compressed_cmap = compress_to_vec_zlib(cmap_content.as_bytes(), 6);
        let mut tounicode_data: Vec<u8> = Vec::new();
        let _ = write!(
            tounicode_data,
            "<< /Length {} /Filter /FlateDecode >>\nstream\n",
            compressed_cmap.len()
        );
        tounicode_data.extend_from_slice(&compressed_cmap);
        tounicode_data.extend_from_slice(b"\nendstream");
        let tounicode_id = builder.push(tounicode_data);

        // 5. Type0 font dictionary (the root, referenced by /Resources)
        let type0_dict = format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} \
             /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] \
             /ToUnicode {} 0 R >>",
            pdf_font_name, cidfont_id, tounicode_id,
        );
        let type0_id = builder.push(type0_dict.into_bytes());

        builder
            .custom_font_data
            .insert(key.clone(), CustomFontEmbedData { char_to_gid });

        Ok(type0_id)
    }

    /// Build the /W array for per-glyph widths in CIDFont.
    /// Format: [gid [width] gid [width] ...]
    fn build_w_array(char_to_gid: &HashMap<char, u16>, face: &ttf_parser::Face, units_per_em: u16) -> String {
        let scale = 1000.0 / units_per_em as f64;

        let gids: BTreeSet<u16> = char_to_gid.values().copied().collect();
        let mut result = String::from("[");
        for gid in gids {
            let advance = face
                .glyph_hor_advance(ttf_parser::GlyphId(gid))
                .unwrap_or(0);
            let _ = write!(result, " {} [{}]", gid, (advance as f64 * scale) as u32);
        }
        result.push_str(" ]");
        result
    }

    /// Build a ToUnicode CMap for text extraction/copy-paste support.
    fn build_tounicode_cmap(char_to_gid: &HashMap<char, u16>, font_name: &str) -> String {
        // Invert the mapping: gid → unicode, sorted for stable output
        let gid_to_unicode: BTreeMap<u16, char> =
            char_to_gid.iter().map(|(&ch, &gid)| (gid, ch)).collect();

        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo\n");
        cmap.push_str("<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n");
        cmap.push_str("<0000> <FFFF>\n");
        cmap.push_str("endcodespacerange\n");

        let entries: Vec<(u16, char)> = gid_to_unicode.into_iter().collect();
        // beginbfchar blocks hold at most 100 entries
        for chunk in entries.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for &(gid, ch) in chunk {
                // UTF-16BE, so emoji outside the BMP become surrogate pairs
                let mut units = [0u16; 2];
                let utf16: String = ch
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{:04X}", u))
                    .collect();
                let _ = writeln!(cmap, "<{:04X}> <{}>", gid, utf16);
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\n");
        cmap.push_str("end\n");

        cmap
    }

    /// Sanitize a font name for use as a PDF name object.
    /// Strips spaces and special characters, appends weight/style suffixes.
    fn sanitize_font_name(family: &str, weight: u32, italic: bool) -> String {
        let mut name: String = family
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();

        if name.is_empty() {
            name = "CustomFont".to_string();
        }
        if weight >= 700 {
            name.push_str("-Bold");
        }
        if italic {
            name.push_str("-Italic");
        }

        name
    }

    fn build_font_resource_dict(&self, font_objects: &[(FontKey, usize)]) -> String {
        font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Escape special characters in a PDF string.
    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// Map a Unicode codepoint to a WinAnsiEncoding byte value.
    ///
    /// WinAnsiEncoding is based on Windows-1252. Most codepoints in
    /// 0x20..=0x7E and 0xA0..=0xFF map directly. The 0x80..=0x9F range
    /// contains special mappings for smart quotes, bullets, dashes, etc.
    fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        match cp {
            0x20AC => Some(0x80), // Euro sign
            0x201A => Some(0x82), // Single low-9 quotation mark
            0x0192 => Some(0x83), // Latin small letter f with hook
            0x201E => Some(0x84), // Double low-9 quotation mark
            0x2026 => Some(0x85), // Horizontal ellipsis
            0x2020 => Some(0x86), // Dagger
            0x2021 => Some(0x87), // Double dagger
            0x02C6 => Some(0x88), // Modifier letter circumflex accent
            0x2030 => Some(0x89), // Per mille sign
            0x0160 => Some(0x8A), // Latin capital letter S with caron
            0x2039 => Some(0x8B), // Single left-pointing angle quotation
            0x0152 => Some(0x8C), // Latin capital ligature OE
            0x017D => Some(0x8E), // Latin capital letter Z with caron
            0x2018 => Some(0x91), // Left single quotation mark
            0x2019 => Some(0x92), // Right single quotation mark
            0x201C => Some(0x93), // Left double quotation mark
            0x201D => Some(0x94), // Right double quotation mark
            0x2022 => Some(0x95), // Bullet
            0x2013 => Some(0x96), // En dash
            0x2014 => Some(0x97), // Em dash
            0x02DC => Some(0x98), // Small tilde
            0x2122 => Some(0x99), // Trade mark sign
            0x0161 => Some(0x9A), // Latin small letter s with caron
            0x203A => Some(0x9B), // Single right-pointing angle quotation
            0x0153 => Some(0x9C), // Latin small ligature oe
            0x017E => Some(0x9E), // Latin small letter z with caron
            0x0178 => Some(0x9F), // Latin capital letter Y with diaeresis
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        // Header
        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let header = format!("{} 0 obj\n", i);
            output.extend_from_slice(header.as_bytes());
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}

/// An 8-bit image XObject with an already-encoded stream body.
fn image_stream(width: u32, height: u32, color_space: &str, filter: &str, body: &[u8], extra: &str) -> Vec<u8> {
    let mut obj = format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} \
         /BitsPerComponent 8 /Filter {} /Length {}{} >>\nstream\n",
        width,
        height,
        color_space,
        filter,
        body.len(),
        extra
    )
    .into_bytes();
    obj.extend_from_slice(body);
    obj.extend_from_slice(b"\nendstream");
    obj
}
