//! Text recognition engines.
//!
//! Recognizers receive PNG bytes produced by [`normalize_to_png`], so every
//! engine sees the same 8-bit RGB input regardless of how the image was
//! stored in the source document.

use docmill_core::{OcrError, TextRecognizer};
use std::io::Cursor;

/// Decode any supported image format and re-encode it as RGB PNG.
pub fn normalize_to_png(data: &[u8]) -> Result<Vec<u8>, OcrError> {
    let img = image::load_from_memory(data).map_err(|e| OcrError::Decode(e.to_string()))?;
    let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());

    let mut png = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| OcrError::Decode(format!("PNG encoding failed: {e}")))?;
    Ok(png)
}

/// Recognizer that never finds text. Every image is routed to captioning.
pub struct NoopRecognizer;

impl NoopRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoopRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for NoopRecognizer {
    fn name(&self) -> &str {
        "noop"
    }

    fn recognize(&self, _png: &[u8]) -> Result<String, OcrError> {
        Ok(String::new())
    }
}

/// Tesseract OCR engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct TesseractRecognizer {
    datapath: Option<std::path::PathBuf>,
    language: String,
}

#[cfg(feature = "ocr")]
impl TesseractRecognizer {
    /// Use the system tessdata directory.
    #[must_use]
    pub fn new(language: &str) -> Self {
        Self {
            datapath: None,
            language: language.to_string(),
        }
    }

    /// Use an explicit tessdata directory.
    #[must_use]
    pub fn with_datapath(mut self, datapath: impl Into<std::path::PathBuf>) -> Self {
        self.datapath = Some(datapath.into());
        self
    }
}

#[cfg(feature = "ocr")]
impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("eng")
    }
}

#[cfg(feature = "ocr")]
impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, png: &[u8]) -> Result<String, OcrError> {
        let datapath = match &self.datapath {
            Some(p) => Some(
                p.to_str()
                    .ok_or_else(|| OcrError::Init("Invalid tessdata path".into()))?,
            ),
            None => None,
        };

        let tess = tesseract::Tesseract::new(datapath, Some(&self.language))
            .map_err(|e| OcrError::Init(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(png)
            .map_err(|e| OcrError::Recognition(format!("{e:?}")))?;

        tess.get_text()
            .map_err(|e| OcrError::Recognition(format!("{e:?}")))
    }
}
