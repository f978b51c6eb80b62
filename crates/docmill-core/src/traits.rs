//! Core traits for docmill components.
//!
//! - [`LanguageModel`]: Summarize text and caption images
//! - [`TextRecognizer`]: Recognize text in an image (synchronous, CPU-bound)
//! - [`DocumentExtractor`]: Turn one input file into a [`DocumentRecord`]
//!
//! Implementations are constructed with their configuration and shared
//! behind `Arc` across concurrent file tasks.

use async_trait::async_trait;
use std::path::Path;

use crate::error::{BackendError, ExtractError, OcrError};
use crate::types::{DocumentRecord, FileKind};

// ============================================================================
// Language Model
// ============================================================================

/// Text-in/text-out and image-in/text-out language-model service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Summarize a piece of text. Callers never pass empty text.
    async fn summarize(&self, text: &str) -> Result<String, BackendError>;

    /// Describe an image given its raw bytes and MIME type.
    async fn describe_image(&self, image: &[u8], mime_type: &str)
        -> Result<String, BackendError>;
}

// ============================================================================
// Text Recognition
// ============================================================================

/// Synchronous text recognition over a PNG-encoded image.
///
/// Implementations are CPU-bound; callers run them on the blocking pool.
pub trait TextRecognizer: Send + Sync {
    /// Engine name, for logs.
    fn name(&self) -> &str;

    /// Recognize text in the image. Returns an empty string when the image
    /// carries no text.
    fn recognize(&self, png: &[u8]) -> Result<String, OcrError>;
}

// ============================================================================
// Extraction
// ============================================================================

/// Extracts one document kind into a normalized record.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// The kind of document this extractor handles.
    fn kind(&self) -> FileKind;

    /// Extract a file. Any error is fatal for this file only.
    async fn extract(&self, path: &Path) -> Result<DocumentRecord, ExtractError>;
}
