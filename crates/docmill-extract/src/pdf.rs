//! PDF extractor.
//!
//! Uses lopdf for per-page text and embedded images. Pages are units; images
//! come from each page's XObject resources, not from rendered regions.

use async_trait::async_trait;
use docmill_core::{
    file_stem, total_elapsed, DocumentContent, DocumentExtractor, DocumentMetadata,
    DocumentRecord, ExtractError, ExtractedImage, FileKind, UnitKind, NO_TEXT_FOUND,
    PDF_TABLES_UNSUPPORTED,
};
use flate2::read::ZlibDecoder;
use lopdf::{Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::unit::{UnitProcessor, UnitSource, UnitText};

const OVERALL_SUMMARY: &str = "PDF extraction complete.";

/// Extractor for PDF files.
pub struct PdfExtractor {
    processor: Arc<UnitProcessor>,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    #[must_use]
    pub fn new(processor: Arc<UnitProcessor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl DocumentExtractor for PdfExtractor {
    fn kind(&self) -> FileKind {
        FileKind::Pdf
    }

    async fn extract(&self, path: &Path) -> Result<DocumentRecord, ExtractError> {
        debug!("Extracting PDF: {:?}", path);
        let start = Instant::now();

        let bytes = tokio::fs::read(path).await?;
        let file_size = bytes.len() as u64;

        // Parsing is blocking
        let source = tokio::task::spawn_blocking(move || PdfSource::load(&bytes))
            .await
            .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))??;

        let page_count = source.unit_count();
        let stem = file_stem(path);
        let pages = self.processor.process(&stem, Box::new(source)).await?;

        Ok(DocumentRecord {
            metadata: DocumentMetadata {
                file_name: file_name(path),
                file_type: FileKind::Pdf,
                file_size,
                unit_count: page_count,
                rows_extracted: None,
            },
            content: DocumentContent::Pages(pages),
            overall_summary: OVERALL_SUMMARY.to_string(),
            total_time_taken: total_elapsed(start.elapsed()),
        })
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Loaded PDF with its pages in document order.
pub struct PdfSource {
    doc: Document,
    pages: Vec<(u32, ObjectId)>,
}

impl PdfSource {
    /// Parse a PDF from memory.
    pub fn load(bytes: &[u8]) -> Result<Self, ExtractError> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| ExtractError::Parse(format!("invalid PDF: {e}")))?;
        let pages = doc.get_pages().into_iter().collect();
        Ok(Self { doc, pages })
    }

    /// Image XObjects reachable from a page's resources, including resources
    /// inherited from the page tree. A page without `/XObject` has none.
    fn image_streams(&self, page_id: ObjectId) -> Vec<(ObjectId, &Stream)> {
        let (inline, inherited) = self.doc.get_page_resources(page_id);
        let resources = inline.into_iter().chain(
            inherited
                .into_iter()
                .filter_map(|id| self.doc.get_dictionary(id).ok()),
        );

        let mut seen = HashSet::new();
        let mut streams = Vec::new();
        for resources in resources {
            let Some(xobjects) = resources
                .get(b"XObject")
                .ok()
                .and_then(|obj| self.doc.dereference(obj).ok())
                .and_then(|(_, obj)| obj.as_dict().ok())
            else {
                continue;
            };

            for (_, value) in xobjects.iter() {
                let Ok(id) = value.as_reference() else {
                    continue;
                };
                let Some(stream) = self.doc.get_object(id).ok().and_then(|o| o.as_stream().ok())
                else {
                    continue;
                };
                let is_image = stream
                    .dict
                    .get(b"Subtype")
                    .and_then(Object::as_name)
                    .is_ok_and(|name| name == b"Image");
                if is_image && seen.insert(id) {
                    streams.push((id, stream));
                }
            }
        }
        streams
    }
}

impl UnitSource for PdfSource {
    fn unit_kind(&self) -> UnitKind {
        UnitKind::Page
    }

    fn unit_count(&self) -> usize {
        self.pages.len()
    }

    fn unit_text(&mut self, index: usize) -> Result<UnitText, ExtractError> {
        let (page_num, _) = self.pages[index];
        let text = match self.doc.extract_text(&[page_num]) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Failed to extract text from page {}: {}", page_num, e);
                String::new()
            }
        };
        Ok(UnitText {
            text,
            blocks: Vec::new(),
        })
    }

    fn unit_images(&mut self, index: usize) -> Result<Vec<ExtractedImage>, ExtractError> {
        let (page_num, page_id) = self.pages[index];

        Ok(self
            .image_streams(page_id)
            .into_iter()
            .filter_map(|(id, stream)| match decode_image_stream(&self.doc, stream) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!("Skipping image {:?} on page {}: {}", id, page_num, e);
                    None
                }
            })
            .collect())
    }

    fn empty_text(&self) -> &'static str {
        NO_TEXT_FOUND
    }

    fn tables_notice(&self) -> Option<&'static str> {
        Some(PDF_TABLES_UNSUPPORTED)
    }
}

/// Decode an image XObject into storable bytes.
fn decode_image_stream(doc: &Document, stream: &Stream) -> Result<ExtractedImage, String> {
    let filters = stream_filters(stream);

    let (data, ext) = if filters.iter().any(|f| f == "DCTDecode") {
        // JPEG, stored as-is
        (stream.content.clone(), "jpg")
    } else if filters.iter().any(|f| f == "JPXDecode") {
        (stream.content.clone(), "jp2")
    } else if filters.iter().any(|f| f == "FlateDecode") {
        (decode_flate_image(doc, stream)?, "png")
    } else {
        return Err(format!("unsupported image filter: {filters:?}"));
    };

    Ok(ExtractedImage {
        data,
        ext: ext.to_string(),
    })
}

fn stream_filters(stream: &Stream) -> Vec<String> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).into_owned()],
        Ok(Object::Array(names)) => names
            .iter()
            .filter_map(|n| n.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .collect(),
        _ => Vec::new(),
    }
}

/// Color space family name: `/DeviceRGB`, or the first entry of an array
/// such as `[/ICCBased 12 0 R]`.
fn color_space(doc: &Document, stream: &Stream) -> Option<String> {
    let (_, cs) = doc.dereference(stream.dict.get(b"ColorSpace").ok()?).ok()?;
    let name = match cs {
        Object::Name(name) => name,
        Object::Array(items) => items.first()?.as_name().ok()?,
        _ => return None,
    };
    Some(String::from_utf8_lossy(name).into_owned())
}

/// Inflate raw samples and re-encode them as PNG.
fn decode_flate_image(doc: &Document, stream: &Stream) -> Result<Vec<u8>, String> {
    let dimension = |key: &[u8]| {
        stream
            .dict
            .get(key)
            .and_then(Object::as_i64)
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
    };
    let width = dimension(b"Width").ok_or_else(|| "invalid width".to_string())?;
    let height = dimension(b"Height").ok_or_else(|| "invalid height".to_string())?;

    let bits = stream
        .dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    if bits != 8 {
        return Err(format!("unsupported bits per component: {bits}"));
    }

    let mut decoder = ZlibDecoder::new(stream.content.as_slice());
    let mut samples = Vec::new();
    decoder
        .read_to_end(&mut samples)
        .map_err(|e| format!("Decompression failed: {e}"))?;

    let color_space = color_space(doc, stream).unwrap_or_else(|| "DeviceRGB".to_string());
    let pixels = u64::from(width) * u64::from(height);
    let channels = match color_space.as_str() {
        "DeviceRGB" | "RGB" | "CalRGB" => 3,
        "DeviceGray" | "Gray" | "CalGray" => 1,
        "DeviceCMYK" | "CMYK" => 4,
        other => {
            debug!("Color space '{}', inferring channels from sample count", other);
            match samples.len() as u64 / pixels.max(1) {
                1 => 1,
                4 => 4,
                _ => 3,
            }
        }
    };

    let img = match channels {
        1 => image::GrayImage::from_raw(width, height, samples)
            .map(image::DynamicImage::ImageLuma8),
        4 => image::RgbImage::from_raw(width, height, cmyk_to_rgb(&samples))
            .map(image::DynamicImage::ImageRgb8),
        _ => image::RgbImage::from_raw(width, height, samples)
            .map(image::DynamicImage::ImageRgb8),
    }
    .ok_or_else(|| format!("sample buffer does not match {width}x{height} {color_space}"))?;

    let mut png = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {e}"))?;
    Ok(png)
}

/// Convert CMYK bytes to RGB.
#[allow(clippy::many_single_char_names)]
fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((cmyk.len() / 4) * 3);
    for chunk in cmyk.chunks_exact(4) {
        let [c, m, y, k] = [chunk[0], chunk[1], chunk[2], chunk[3]].map(|v| f32::from(v) / 255.0);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        rgb.extend([
            (255.0 * (1.0 - c) * (1.0 - k)) as u8,
            (255.0 * (1.0 - m) * (1.0 - k)) as u8,
            (255.0 * (1.0 - y) * (1.0 - k)) as u8,
        ]);
    }
    rgb
}
