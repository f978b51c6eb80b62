//! Core types for docmill.
//!
//! ## Input classification
//! - [`FileKind`]: The four supported document kinds
//! - [`UnitKind`]: Structural unit names used in artifact file names
//!
//! ## Output records
//! - [`DocumentRecord`]: One fully processed input file
//! - [`DocumentContent`]: Format-specific unit list
//! - [`UnitRecord`]: A page or slide with its images and summary
//! - [`SheetRow`]: A non-blank spreadsheet row
//! - [`ContentBlock`]: A structural markdown block
//!
//! ## Images
//! - [`ExtractedImage`]: Raw image bytes pulled out of a document
//! - [`ImageEnrichment`]: Text-recognition XOR captioning result for one image
//! - [`BackfillRecord`]: Vision record written by the re-describe pass

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Text recorded for a page with no extractable text.
pub const NO_TEXT_FOUND: &str = "No text found.";

/// Summary recorded for a slide with no text.
pub const NO_TEXT_TO_SUMMARIZE: &str = "No text to summarize.";

/// Summary recorded when the backend could not produce one.
pub const NO_SUMMARY_AVAILABLE: &str = "No summary available.";

/// Notice recorded in place of PDF tables.
pub const PDF_TABLES_UNSUPPORTED: &str = "Table extraction is not supported for PDF pages.";

// ============================================================================
// Classification
// ============================================================================

/// Supported document kinds, recognized by lowercase file extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Markdown,
    Spreadsheet,
    Presentation,
}

impl FileKind {
    /// All kinds, in dispatch order.
    pub const ALL: [FileKind; 4] = [
        FileKind::Pdf,
        FileKind::Markdown,
        FileKind::Spreadsheet,
        FileKind::Presentation,
    ];

    /// Classify a path by its extension, ignoring case. Unknown extensions
    /// yield `None`.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::from_extension(&ext)
    }

    /// Classify a lowercase extension (without the dot).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "md" => Some(Self::Markdown),
            "xlsx" => Some(Self::Spreadsheet),
            "pptx" => Some(Self::Presentation),
            _ => None,
        }
    }

    /// The extension this kind is recognized by.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "md",
            Self::Spreadsheet => "xlsx",
            Self::Presentation => "pptx",
        }
    }

    /// Stable name used as `metadata.file_type`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
            Self::Spreadsheet => "spreadsheet",
            Self::Presentation => "presentation",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural unit that carries images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Page,
    Slide,
}

impl UnitKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Slide => "slide",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Document records
// ============================================================================

/// One fully processed input file, written once as `<stem>_output.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// File-level metadata
    pub metadata: DocumentMetadata,
    /// Units, serialized under a format-specific key
    #[serde(flatten)]
    pub content: DocumentContent,
    /// Document-level summary line
    pub overall_summary: String,
    /// Wall time for the whole file
    pub total_time_taken: String,
}

/// File-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Source file name (with extension)
    pub file_name: String,
    /// Document kind
    pub file_type: FileKind,
    /// Source size in bytes
    pub file_size: u64,
    /// Page, slide, sheet or block count depending on `file_type`
    pub unit_count: usize,
    /// Non-blank rows extracted (spreadsheets only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_extracted: Option<usize>,
}

/// Format-specific unit list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentContent {
    Pages(Vec<UnitRecord>),
    Slides(Vec<UnitRecord>),
    Rows(Vec<SheetRow>),
    #[serde(rename = "content")]
    Blocks(Vec<ContentBlock>),
}

impl DocumentContent {
    /// Image-bearing units, if this content has any.
    #[must_use]
    pub fn image_units(&self) -> Option<(UnitKind, &[UnitRecord])> {
        match self {
            Self::Pages(units) => Some((UnitKind::Page, units)),
            Self::Slides(units) => Some((UnitKind::Slide, units)),
            Self::Rows(_) | Self::Blocks(_) => None,
        }
    }

    /// Number of entries in the unit list.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Pages(units) | Self::Slides(units) => units.len(),
            Self::Rows(rows) => rows.len(),
            Self::Blocks(blocks) => blocks.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A page or slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// 1-indexed position in the document
    pub unit_number: u32,
    /// Unit text
    pub text: String,
    /// Individual shape texts (slides only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_blocks: Vec<String>,
    /// Table notice (PDF pages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<String>,
    /// Paths of persisted image blobs
    pub images: Vec<PathBuf>,
    /// Enrichment files produced by text recognition
    pub img_summary_files: Vec<PathBuf>,
    /// Enrichment files produced by captioning
    pub img_vision_files: Vec<PathBuf>,
    /// Summary of the unit text
    pub summary: String,
    /// Elapsed time for this unit alone
    pub time_taken: String,
}

/// A spreadsheet row with at least one non-blank cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    /// Sheet name
    pub sheet: String,
    /// 1-indexed data row number within the sheet
    pub row_number: u32,
    /// Column header to cell text, in column order
    pub row_data: IndexMap<String, String>,
}

/// A structural markdown block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    List {
        ordered: bool,
        items: Vec<String>,
    },
    CodeBlock {
        language: Option<String>,
        code: String,
    },
}

// ============================================================================
// Images
// ============================================================================

/// An image pulled out of a document unit.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    /// Raw image bytes, as stored in the document
    pub data: Vec<u8>,
    /// File extension without the dot (`png`, `jpg`, ...)
    pub ext: String,
}

impl ExtractedImage {
    /// MIME type derived from the extension.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        mime_type_for_extension(&self.ext)
    }
}

/// MIME type for an image extension.
#[must_use]
pub fn mime_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "jp2" => "image/jp2",
        "emf" => "image/emf",
        "wmf" => "image/wmf",
        _ => "application/octet-stream",
    }
}

/// Which enrichment path an image took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentRoute {
    /// Recognized text was non-empty
    TextRecognition,
    /// Recognized text was empty, the image was captioned
    Captioning,
}

/// Enrichment for one image: recognized text or a generated description,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageEnrichment {
    Ocr { ocr_text: String },
    Vision { description: String },
}

impl ImageEnrichment {
    #[must_use]
    pub fn route(&self) -> EnrichmentRoute {
        match self {
            Self::Ocr { .. } => EnrichmentRoute::TextRecognition,
            Self::Vision { .. } => EnrichmentRoute::Captioning,
        }
    }
}

/// Vision record written by the re-describe pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillRecord {
    /// Page or slide number the image belongs to
    pub page_or_slide: u32,
    /// `data:image/<ext>;base64,...` URL of the image
    pub image_base64: String,
    /// Generated description
    pub description: String,
}

// ============================================================================
// Timing
// ============================================================================

/// Format a per-unit elapsed time.
#[must_use]
pub fn unit_elapsed(elapsed: Duration) -> String {
    format!("{:.2} sec", elapsed.as_secs_f64())
}

/// Format a per-document elapsed time.
#[must_use]
pub fn total_elapsed(elapsed: Duration) -> String {
    format!("{:.2} seconds", elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_unit(number: u32) -> UnitRecord {
        UnitRecord {
            unit_number: number,
            text: "Quarterly results".to_string(),
            text_blocks: vec![],
            tables: Some(PDF_TABLES_UNSUPPORTED.to_string()),
            images: vec![PathBuf::from("out/images/report_page1_img1.png")],
            img_summary_files: vec![],
            img_vision_files: vec![PathBuf::from(
                "out/images/img_vision/report_page1_img1_vision.json",
            )],
            summary: "Results were strong.".to_string(),
            time_taken: "0.10 sec".to_string(),
        }
    }

    #[test]
    fn test_file_kind_from_path() {
        assert_eq!(FileKind::from_path(Path::new("a/b.pdf")), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_path(Path::new("notes.MD")), Some(FileKind::Markdown));
        assert_eq!(
            FileKind::from_path(Path::new("Budget.XLSX")),
            Some(FileKind::Spreadsheet)
        );
        assert_eq!(
            FileKind::from_path(Path::new("deck.pptx")),
            Some(FileKind::Presentation)
        );
    }

    #[test]
    fn test_file_kind_ignores_unknown_extensions() {
        assert_eq!(FileKind::from_path(Path::new("legacy.xls")), None);
        assert_eq!(FileKind::from_path(Path::new("legacy.ppt")), None);
        assert_eq!(FileKind::from_path(Path::new("README")), None);
        assert_eq!(FileKind::from_path(Path::new("notes.markdown")), None);
    }

    #[test]
    fn test_file_kind_extension_round_trip() {
        for kind in FileKind::ALL {
            assert_eq!(FileKind::from_extension(kind.extension()), Some(kind));
        }
    }

    #[test]
    fn test_image_enrichment_serializes_single_key() {
        let ocr = ImageEnrichment::Ocr {
            ocr_text: "TOTAL 42".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&ocr).unwrap(),
            r#"{"ocr_text":"TOTAL 42"}"#
        );

        let vision = ImageEnrichment::Vision {
            description: "A bar chart".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&vision).unwrap(),
            r#"{"description":"A bar chart"}"#
        );
    }

    #[test]
    fn test_image_enrichment_deserializes_by_shape() {
        let parsed: ImageEnrichment = serde_json::from_str(r#"{"description":"logo"}"#).unwrap();
        assert_eq!(parsed.route(), EnrichmentRoute::Captioning);

        let parsed: ImageEnrichment = serde_json::from_str(r#"{"ocr_text":"hello"}"#).unwrap();
        assert_eq!(parsed.route(), EnrichmentRoute::TextRecognition);
    }

    #[test]
    fn test_document_record_uses_format_key() {
        let record = DocumentRecord {
            metadata: DocumentMetadata {
                file_name: "report.pdf".to_string(),
                file_type: FileKind::Pdf,
                file_size: 1024,
                unit_count: 1,
                rows_extracted: None,
            },
            content: DocumentContent::Pages(vec![sample_unit(1)]),
            overall_summary: "PDF extraction complete.".to_string(),
            total_time_taken: "0.20 seconds".to_string(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("pages").is_some());
        assert_eq!(value["metadata"]["file_type"], "pdf");
        assert!(value["metadata"].get("rows_extracted").is_none());
        assert!(value["pages"][0].get("text_blocks").is_none());

        let back: DocumentRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_markdown_blocks_serialize_under_content() {
        let content = DocumentContent::Blocks(vec![
            ContentBlock::Heading {
                level: 1,
                text: "Title".to_string(),
            },
            ContentBlock::CodeBlock {
                language: Some("rust".to_string()),
                code: "fn main() {}\n".to_string(),
            },
        ]);
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value["content"][0]["type"], "heading");
        assert_eq!(value["content"][1]["type"], "code_block");
        assert_eq!(value["content"][1]["language"], "rust");
    }

    #[test]
    fn test_image_units() {
        let pages = DocumentContent::Pages(vec![sample_unit(1), sample_unit(2)]);
        let (kind, units) = pages.image_units().unwrap();
        assert_eq!(kind, UnitKind::Page);
        assert_eq!(units.len(), 2);

        assert!(DocumentContent::Rows(vec![]).image_units().is_none());
        assert!(DocumentContent::Blocks(vec![]).is_empty());
    }

    #[test]
    fn test_mime_type_for_extension() {
        assert_eq!(mime_type_for_extension("JPG"), "image/jpeg");
        assert_eq!(mime_type_for_extension("png"), "image/png");
        assert_eq!(mime_type_for_extension("xyz"), "application/octet-stream");
    }

    #[test]
    fn test_elapsed_formatting() {
        assert_eq!(unit_elapsed(Duration::from_millis(1234)), "1.23 sec");
        assert_eq!(total_elapsed(Duration::from_millis(500)), "0.50 seconds");
    }
}
