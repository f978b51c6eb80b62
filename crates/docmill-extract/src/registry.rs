//! Extractor registry for routing files by kind.

use docmill_core::{DocumentExtractor, DocumentRecord, ExtractError, FileKind};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::markdown::MarkdownExtractor;
use crate::pdf::PdfExtractor;
use crate::presentation::PresentationExtractor;
use crate::spreadsheet::SpreadsheetExtractor;
use crate::unit::UnitProcessor;

/// Registry of document extractors, one per [`FileKind`].
pub struct ExtractorRegistry {
    extractors: HashMap<FileKind, Arc<dyn DocumentExtractor>>,
}

impl ExtractorRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Registry with the built-in extractor for every kind.
    #[must_use]
    pub fn with_defaults(processor: Arc<UnitProcessor>) -> Self {
        let mut registry = Self::new();
        registry.register(PdfExtractor::new(Arc::clone(&processor)));
        registry.register(PresentationExtractor::new(processor));
        registry.register(SpreadsheetExtractor::new());
        registry.register(MarkdownExtractor::new());
        registry
    }

    /// Register an extractor, replacing any previous one for its kind.
    pub fn register<E: DocumentExtractor + 'static>(&mut self, extractor: E) {
        self.register_arc(Arc::new(extractor));
    }

    /// Register a shared extractor.
    pub fn register_arc(&mut self, extractor: Arc<dyn DocumentExtractor>) {
        self.extractors.insert(extractor.kind(), extractor);
    }

    /// Get the extractor for a kind.
    #[must_use]
    pub fn get(&self, kind: FileKind) -> Option<Arc<dyn DocumentExtractor>> {
        self.extractors.get(&kind).cloned()
    }

    /// Kinds with a registered extractor.
    #[must_use]
    pub fn kinds(&self) -> Vec<FileKind> {
        FileKind::ALL
            .into_iter()
            .filter(|k| self.extractors.contains_key(k))
            .collect()
    }

    /// Extract a file with the extractor for its extension.
    pub async fn extract(&self, path: &Path) -> Result<DocumentRecord, ExtractError> {
        let kind = FileKind::from_path(path).ok_or_else(|| {
            ExtractError::UnsupportedType(
                path.extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        })?;
        let extractor = self
            .get(kind)
            .ok_or_else(|| ExtractError::UnsupportedType(kind.to_string()))?;

        extractor.extract(path).await
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::tests::{CountingModel, FixedRecognizer};
    use crate::enrich::ImageEnricher;
    use docmill_core::OutputLayout;
    use tempfile::tempdir;

    fn processor(layout: OutputLayout) -> Arc<UnitProcessor> {
        let model = Arc::new(CountingModel::default());
        let enricher = Arc::new(ImageEnricher::new(
            Arc::new(FixedRecognizer("")),
            model.clone(),
            1,
        ));
        Arc::new(UnitProcessor::new(enricher, model, layout, true))
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = ExtractorRegistry::new();
        assert!(registry.kinds().is_empty());
        assert!(registry.get(FileKind::Pdf).is_none());
    }

    #[test]
    fn test_defaults_cover_every_kind() {
        let registry = ExtractorRegistry::with_defaults(processor(OutputLayout::new("/tmp/out")));
        assert_eq!(registry.kinds(), FileKind::ALL.to_vec());
        for kind in FileKind::ALL {
            assert_eq!(registry.get(kind).unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_register_replaces_kind() {
        let mut registry = ExtractorRegistry::new();
        registry.register(MarkdownExtractor::new());
        registry.register(MarkdownExtractor::new());
        assert_eq!(registry.kinds(), vec![FileKind::Markdown]);
    }

    #[tokio::test]
    async fn test_extract_routes_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("README.md");
        std::fs::write(&path, "# Hello\n").unwrap();

        let mut registry = ExtractorRegistry::new();
        registry.register(MarkdownExtractor::new());

        let record = registry.extract(&path).await.unwrap();
        assert_eq!(record.metadata.file_type, FileKind::Markdown);
    }

    #[tokio::test]
    async fn test_extract_unsupported_type() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.doc");
        std::fs::write(&path, [0u8; 10]).unwrap();

        let registry = ExtractorRegistry::with_defaults(processor(OutputLayout::new(dir.path())));

        match registry.extract(&path).await.unwrap_err() {
            ExtractError::UnsupportedType(ext) => assert_eq!(ext, "doc"),
            other => panic!("Expected UnsupportedType error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extract_missing_extractor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        std::fs::write(&path, [0u8; 10]).unwrap();

        let registry = ExtractorRegistry::new();
        assert!(matches!(
            registry.extract(&path).await,
            Err(ExtractError::UnsupportedType(_))
        ));
    }
}
