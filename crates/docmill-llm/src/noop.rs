//! No-op backend for offline runs.
//!
//! [`NoopBackend`] never touches the network. Summaries are the leading words
//! of the input and descriptions name the image type and size, so output is
//! deterministic across runs.

use async_trait::async_trait;
use docmill_core::{BackendError, LanguageModel};

/// Deterministic offline backend.
///
/// # Example
///
/// ```rust
/// use docmill_llm::NoopBackend;
/// use docmill_core::LanguageModel;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = NoopBackend::new();
/// let summary = backend.summarize("one two three").await?;
/// assert_eq!(summary, "one two three");
/// # Ok(())
/// # }
/// ```
pub struct NoopBackend {
    summary_words: usize,
}

impl NoopBackend {
    /// Create a backend that echoes up to 30 leading words.
    #[must_use]
    pub fn new() -> Self {
        Self { summary_words: 30 }
    }

    /// Create a backend that echoes up to `summary_words` leading words.
    #[must_use]
    pub fn with_summary_words(summary_words: usize) -> Self {
        Self { summary_words }
    }
}

impl Default for NoopBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for NoopBackend {
    fn model_name(&self) -> &str {
        "noop"
    }

    async fn summarize(&self, text: &str) -> Result<String, BackendError> {
        Ok(text
            .split_whitespace()
            .take(self.summary_words)
            .collect::<Vec<_>>()
            .join(" "))
    }

    async fn describe_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, BackendError> {
        Ok(format!("Image ({mime_type}, {} bytes)", image.len()))
    }
}
