//! # docmill-extract
//!
//! Per-format extraction and image enrichment for docmill.
//!
//! ## Supported Formats
//!
//! | Extractor | Format | Units | AI calls |
//! |-----------|--------|-------|----------|
//! | [`PdfExtractor`] | `.pdf` | pages | page summaries, image enrichment |
//! | [`PresentationExtractor`] | `.pptx` | slides | slide summaries, image enrichment |
//! | [`SpreadsheetExtractor`] | `.xlsx` | non-blank rows | none |
//! | [`MarkdownExtractor`] | `.md` | structural blocks | none |
//!
//! ## Image Enrichment
//!
//! [`ImageEnricher`] decodes each embedded image, runs a [`TextRecognizer`]
//! on it and only asks the language model for a description when no text
//! was recognized. Recognition runs on the blocking pool, bounded by a
//! semaphore.
//!
//! ## Cargo Features
//!
//! - `ocr`: Enables [`TesseractRecognizer`] (requires the system Tesseract library)
//! - Without `ocr`: Only [`NoopRecognizer`] is available and every image is captioned
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docmill_extract::{ExtractorRegistry, ImageEnricher, NoopRecognizer, UnitProcessor};
//! use docmill_core::OutputLayout;
//! use std::sync::Arc;
//!
//! let enricher = Arc::new(ImageEnricher::new(Arc::new(NoopRecognizer::new()), model.clone(), 4));
//! let processor = Arc::new(UnitProcessor::new(enricher, model, OutputLayout::new("output"), true));
//! let registry = ExtractorRegistry::with_defaults(processor);
//!
//! let record = registry.extract(Path::new("PDF/report.pdf")).await?;
//! ```
//!
//! [`TextRecognizer`]: docmill_core::TextRecognizer

pub mod enrich;
pub mod markdown;
pub mod ocr;
pub mod pdf;
pub mod presentation;
pub mod registry;
pub mod spreadsheet;
pub mod unit;

#[cfg(test)]
mod fixtures;

pub use enrich::{EnrichError, ImageEnricher};
pub use markdown::MarkdownExtractor;
#[cfg(feature = "ocr")]
pub use ocr::TesseractRecognizer;
pub use ocr::{normalize_to_png, NoopRecognizer};
pub use pdf::PdfExtractor;
pub use presentation::{PresentationExtractor, ShapeKind};
pub use registry::ExtractorRegistry;
pub use spreadsheet::SpreadsheetExtractor;
pub use unit::{UnitProcessor, UnitSource, UnitText};
