//! Backend pool for bounded language-model calls.

use async_trait::async_trait;
use docmill_core::{BackendError, LanguageModel};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Wraps a [`LanguageModel`] with a concurrency limit and word chunking.
///
/// Every call to the inner backend holds one semaphore permit, so the number
/// of in-flight requests never exceeds `max_concurrent` no matter how many
/// files are being processed. Text longer than `chunk_size` words is split
/// and each chunk summarized in order; chunk summaries are joined with a
/// blank line.
pub struct BackendPool {
    /// Wrapped backend
    inner: Arc<dyn LanguageModel>,
    /// Semaphore to limit concurrent requests
    semaphore: Semaphore,
    /// Maximum concurrent requests
    max_concurrent: usize,
    /// Maximum words per summarization request
    chunk_size: usize,
}

impl BackendPool {
    /// Create a new backend pool.
    pub fn new(inner: Arc<dyn LanguageModel>, max_concurrent: usize, chunk_size: usize) -> Self {
        Self {
            inner,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Get the underlying backend.
    pub fn inner(&self) -> Arc<dyn LanguageModel> {
        Arc::clone(&self.inner)
    }

    /// Get pool statistics.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get max concurrent requests.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Get the chunk size in words.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    async fn summarize_chunk(&self, chunk: &str) -> Result<String, BackendError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| BackendError::Unavailable(format!("semaphore error: {e}")))?;

        self.inner.summarize(chunk).await
    }
}

#[async_trait]
impl LanguageModel for BackendPool {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    /// Summarize `text`, chunk by chunk. Blank input yields an empty string
    /// without calling the backend.
    async fn summarize(&self, text: &str) -> Result<String, BackendError> {
        let chunks = chunk_words(text, self.chunk_size);
        if chunks.len() > 1 {
            debug!("Summarizing {} chunks of {} words", chunks.len(), self.chunk_size);
        }

        let mut summaries = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            summaries.push(self.summarize_chunk(chunk).await?);
        }
        Ok(summaries.join("\n\n"))
    }

    async fn describe_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, BackendError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| BackendError::Unavailable(format!("semaphore error: {e}")))?;

        self.inner.describe_image(image, mime_type).await
    }
}

/// Split text into chunks of at most `size` whitespace-separated words.
#[must_use]
pub fn chunk_words(text: &str, size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(size.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}
