//! Image classifier and enricher.
//!
//! Each image is normalized and run through text recognition first. Non-empty
//! recognized text short-circuits to an [`ImageEnrichment::Ocr`] record;
//! otherwise the image is captioned by the language model.

use docmill_core::{
    BackendError, ExtractedImage, ImageEnrichment, LanguageModel, OcrError, TextRecognizer,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::ocr::normalize_to_png;

/// Failure to enrich one image. Never fatal for the enclosing document.
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("text recognition failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("captioning failed: {0}")]
    Caption(#[from] BackendError),

    #[error("worker task failed: {0}")]
    Task(String),
}

impl From<EnrichError> for docmill_core::Error {
    fn from(e: EnrichError) -> Self {
        match e {
            EnrichError::Ocr(e) => Self::Ocr(e),
            EnrichError::Caption(e) => Self::Backend(e),
            EnrichError::Task(msg) => Self::Other(msg),
        }
    }
}

/// Routes images to text recognition or captioning.
pub struct ImageEnricher {
    recognizer: Arc<dyn TextRecognizer>,
    model: Arc<dyn LanguageModel>,
    /// Bounds concurrent decode + recognition work on the blocking pool
    ocr_permits: Semaphore,
}

impl ImageEnricher {
    /// Create a new enricher with at most `ocr_workers` concurrent recognitions.
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        model: Arc<dyn LanguageModel>,
        ocr_workers: usize,
    ) -> Self {
        Self {
            recognizer,
            model,
            ocr_permits: Semaphore::new(ocr_workers.max(1)),
        }
    }

    /// Enrich one image: recognized text if any, else a generated description.
    pub async fn enrich(&self, image: &ExtractedImage) -> Result<ImageEnrichment, EnrichError> {
        let (png, text) = self.recognize(image).await?;

        let text = text.trim();
        if !text.is_empty() {
            debug!("Image routed to text recognition ({} chars)", text.len());
            return Ok(ImageEnrichment::Ocr {
                ocr_text: text.to_string(),
            });
        }

        debug!("Image routed to captioning");
        let description = self.model.describe_image(&png, "image/png").await?;
        Ok(ImageEnrichment::Vision { description })
    }

    /// Caption an image without trying text recognition.
    pub async fn caption(&self, image: &ExtractedImage) -> Result<String, EnrichError> {
        let png = self.normalize(image).await?;
        Ok(self.model.describe_image(&png, "image/png").await?)
    }

    async fn normalize(&self, image: &ExtractedImage) -> Result<Vec<u8>, EnrichError> {
        let _permit = self
            .ocr_permits
            .acquire()
            .await
            .map_err(|e| EnrichError::Task(format!("semaphore error: {e}")))?;

        let data = image.data.clone();
        tokio::task::spawn_blocking(move || normalize_to_png(&data))
            .await
            .map_err(|e| EnrichError::Task(format!("Task join error: {e}")))?
            .map_err(EnrichError::from)
    }

    /// Normalize and recognize on the blocking pool. Returns the PNG and the
    /// raw recognized text.
    async fn recognize(&self, image: &ExtractedImage) -> Result<(Vec<u8>, String), EnrichError> {
        let _permit = self
            .ocr_permits
            .acquire()
            .await
            .map_err(|e| EnrichError::Task(format!("semaphore error: {e}")))?;

        let data = image.data.clone();
        let recognizer = Arc::clone(&self.recognizer);
        tokio::task::spawn_blocking(move || {
            let png = normalize_to_png(&data)?;
            let text = recognizer.recognize(&png)?;
            Ok::<_, OcrError>((png, text))
        })
        .await
        .map_err(|e| EnrichError::Task(format!("Task join error: {e}")))?
        .map_err(EnrichError::from)
    }
}
