//! Shared per-unit processing for page- and slide-based documents.
//!
//! A format implements [`UnitSource`] (count units, read one unit's text and
//! images) and [`UnitProcessor`] does the rest: persist image blobs, enrich
//! each image, summarize the unit text and assemble the [`UnitRecord`].

use docmill_core::{
    unit_elapsed, EnrichmentRoute, ExtractError, ExtractedImage, ImageEnrichment, LanguageModel,
    OutputLayout, UnitKind, UnitRecord, NO_SUMMARY_AVAILABLE, NO_TEXT_TO_SUMMARIZE,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::enrich::ImageEnricher;

/// Raw text read from one unit.
#[derive(Debug, Clone, Default)]
pub struct UnitText {
    /// Combined unit text
    pub text: String,
    /// Individual fragments the text was built from, if the format has them
    pub blocks: Vec<String>,
}

/// Capability set a format exposes to the [`UnitProcessor`].
///
/// Methods are synchronous; the processor calls them on the blocking pool.
/// Indexes are 0-based.
pub trait UnitSource: Send + 'static {
    /// Name used in artifact file names.
    fn unit_kind(&self) -> UnitKind;

    /// Number of units in the document.
    fn unit_count(&self) -> usize;

    /// Text of one unit. An error is fatal for the whole document.
    fn unit_text(&mut self, index: usize) -> Result<UnitText, ExtractError>;

    /// Images embedded in one unit, in document order. Images that cannot
    /// be read are skipped by the implementation.
    fn unit_images(&mut self, index: usize) -> Result<Vec<ExtractedImage>, ExtractError>;

    /// Text recorded when a unit has none.
    fn empty_text(&self) -> &'static str {
        ""
    }

    /// Fixed table notice recorded on every unit.
    fn tables_notice(&self) -> Option<&'static str> {
        None
    }
}

struct RawUnit {
    text: UnitText,
    images: Vec<ExtractedImage>,
}

/// Drives a [`UnitSource`] and produces ordered [`UnitRecord`]s.
pub struct UnitProcessor {
    enricher: Arc<ImageEnricher>,
    model: Arc<dyn LanguageModel>,
    layout: OutputLayout,
    save_images: bool,
}

impl UnitProcessor {
    /// Create a new processor writing artifacts under `layout`.
    pub fn new(
        enricher: Arc<ImageEnricher>,
        model: Arc<dyn LanguageModel>,
        layout: OutputLayout,
        save_images: bool,
    ) -> Self {
        Self {
            enricher,
            model,
            layout,
            save_images,
        }
    }

    #[must_use]
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    #[must_use]
    pub fn enricher(&self) -> &Arc<ImageEnricher> {
        &self.enricher
    }

    /// Process every unit of `source` in order.
    pub async fn process(
        &self,
        stem: &str,
        source: Box<dyn UnitSource>,
    ) -> Result<Vec<UnitRecord>, ExtractError> {
        let kind = source.unit_kind();
        let count = source.unit_count();
        let empty_text = source.empty_text();
        let tables = source.tables_notice().map(str::to_string);

        let mut records = Vec::with_capacity(count);
        let mut source = source;

        for index in 0..count {
            let start = Instant::now();
            let unit_number = u32::try_from(index + 1)
                .map_err(|_| ExtractError::Failed(format!("too many units in {stem}")))?;

            let (returned, raw) = tokio::task::spawn_blocking(move || {
                let raw = read_unit(&mut *source, index);
                (source, raw)
            })
            .await
            .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))?;
            source = returned;
            let raw = raw?;

            debug!(
                "{stem} {kind} {unit_number}: {} chars, {} images",
                raw.text.text.len(),
                raw.images.len()
            );

            let images = self.persist_images(stem, kind, unit_number, &raw.images).await;

            let (enrichments, summary) = tokio::join!(
                self.enrich_images(stem, kind, unit_number, &raw.images),
                self.summarize(stem, kind, unit_number, &raw.text.text),
            );

            let mut img_summary_files = Vec::new();
            let mut img_vision_files = Vec::new();
            for (image_index, enrichment) in enrichments {
                let route = enrichment.route();
                let path = self
                    .layout
                    .enrichment_path(stem, kind, unit_number, image_index, route);
                match write_json(&path, &enrichment).await {
                    Ok(()) => match route {
                        EnrichmentRoute::TextRecognition => img_summary_files.push(path),
                        EnrichmentRoute::Captioning => img_vision_files.push(path),
                    },
                    Err(e) => warn!(
                        "Failed to write enrichment for {stem} {kind} {unit_number} image {image_index}: {e}"
                    ),
                }
            }

            let text = if raw.text.text.trim().is_empty() {
                empty_text.to_string()
            } else {
                raw.text.text
            };

            records.push(UnitRecord {
                unit_number,
                text,
                text_blocks: raw.text.blocks,
                tables: tables.clone(),
                images,
                img_summary_files,
                img_vision_files,
                summary,
                time_taken: unit_elapsed(start.elapsed()),
            });
        }

        Ok(records)
    }

    async fn persist_images(
        &self,
        stem: &str,
        kind: UnitKind,
        unit_number: u32,
        images: &[ExtractedImage],
    ) -> Vec<PathBuf> {
        if !self.save_images {
            return Vec::new();
        }

        let mut paths = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            let path = self
                .layout
                .image_path(stem, kind, unit_number, i + 1, &image.ext);
            match tokio::fs::write(&path, &image.data).await {
                Ok(()) => paths.push(path),
                Err(e) => warn!(
                    "Failed to save {stem} {kind} {unit_number} image {}: {e}",
                    i + 1
                ),
            }
        }
        paths
    }

    /// Enrich all images concurrently. Failed images are logged and left out.
    async fn enrich_images(
        &self,
        stem: &str,
        kind: UnitKind,
        unit_number: u32,
        images: &[ExtractedImage],
    ) -> Vec<(usize, ImageEnrichment)> {
        let results = futures::future::join_all(
            images
                .iter()
                .enumerate()
                .map(|(i, image)| async move { (i + 1, self.enricher.enrich(image).await) }),
        )
        .await;

        results
            .into_iter()
            .filter_map(|(image_index, result)| match result {
                Ok(enrichment) => Some((image_index, enrichment)),
                Err(e) => {
                    warn!("Skipping {stem} {kind} {unit_number} image {image_index}: {e}");
                    None
                }
            })
            .collect()
    }

    async fn summarize(&self, stem: &str, kind: UnitKind, unit_number: u32, text: &str) -> String {
        if text.trim().is_empty() {
            return NO_TEXT_TO_SUMMARIZE.to_string();
        }

        match self.model.summarize(text).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => NO_SUMMARY_AVAILABLE.to_string(),
            Err(e) => {
                warn!("Summary unavailable for {stem} {kind} {unit_number}: {e}");
                NO_SUMMARY_AVAILABLE.to_string()
            }
        }
    }
}

fn read_unit(source: &mut dyn UnitSource, index: usize) -> Result<RawUnit, ExtractError> {
    let text = source.unit_text(index)?;
    let images = match source.unit_images(index) {
        Ok(images) => images,
        Err(e) => {
            warn!("Failed to read images of unit {}: {e}", index + 1);
            Vec::new()
        }
    };
    Ok(RawUnit { text, images })
}

/// Serialize pretty JSON and write it in one call.
pub(crate) async fn write_json<T: serde::Serialize>(
    path: &std::path::Path,
    value: &T,
) -> std::io::Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, bytes).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::enrich::tests::{CountingModel, FailingModel, FixedRecognizer};
    use crate::ocr::tests::sample_png;
    use std::sync::atomic::Ordering;
    use tempfile::tempdir;

    /// In-memory unit source.
    pub(crate) struct FakeSource {
        pub(crate) units: Vec<(String, Vec<ExtractedImage>)>,
    }

    impl UnitSource for FakeSource {
        fn unit_kind(&self) -> UnitKind {
            UnitKind::Page
        }

        fn unit_count(&self) -> usize {
            self.units.len()
        }

        fn unit_text(&mut self, index: usize) -> Result<UnitText, ExtractError> {
            Ok(UnitText {
                text: self.units[index].0.clone(),
                blocks: Vec::new(),
            })
        }

        fn unit_images(&mut self, index: usize) -> Result<Vec<ExtractedImage>, ExtractError> {
            Ok(self.units[index].1.clone())
        }

        fn empty_text(&self) -> &'static str {
            docmill_core::NO_TEXT_FOUND
        }
    }

    fn png() -> ExtractedImage {
        ExtractedImage {
            data: sample_png(),
            ext: "png".to_string(),
        }
    }

    fn processor(
        recognized: &'static str,
        model: Arc<dyn LanguageModel>,
        layout: OutputLayout,
        save_images: bool,
    ) -> UnitProcessor {
        let enricher = Arc::new(ImageEnricher::new(
            Arc::new(FixedRecognizer(recognized)),
            Arc::clone(&model),
            2,
        ));
        UnitProcessor::new(enricher, model, layout, save_images)
    }

    #[tokio::test]
    async fn test_units_are_numbered_in_order() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.ensure().unwrap();
        let model = Arc::new(CountingModel::default());
        let processor = processor("", model.clone(), layout, true);

        let source = FakeSource {
            units: vec![
                ("first page".to_string(), vec![]),
                ("second page".to_string(), vec![png()]),
                ("third".to_string(), vec![]),
            ],
        };
        let records = processor.process("doc", Box::new(source)).await.unwrap();

        let numbers: Vec<u32> = records.iter().map(|r| r.unit_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(model.summaries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_image_artifacts_follow_routing() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.ensure().unwrap();
        let model = Arc::new(CountingModel::default());
        let processor = processor("", model.clone(), layout.clone(), true);

        let source = FakeSource {
            units: vec![("chart page".to_string(), vec![png(), png()])],
        };
        let records = processor.process("doc", Box::new(source)).await.unwrap();
        let unit = &records[0];

        assert_eq!(unit.images.len(), 2);
        assert!(unit.images[0].ends_with("images/doc_page1_img1.png"));
        assert!(unit.images.iter().all(|p| p.exists()));
        assert!(unit.img_summary_files.is_empty());
        assert_eq!(unit.img_vision_files.len(), 2);
        assert_eq!(model.captions.load(Ordering::SeqCst), 2);

        let written: ImageEnrichment =
            serde_json::from_slice(&std::fs::read(&unit.img_vision_files[1]).unwrap()).unwrap();
        assert_eq!(
            written,
            ImageEnrichment::Vision {
                description: "caption (image/png)".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_ocr_route_writes_summary_file() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.ensure().unwrap();
        let model = Arc::new(CountingModel::default());
        let processor = processor("TOTAL DUE", model.clone(), layout, true);

        let source = FakeSource {
            units: vec![("scan".to_string(), vec![png()])],
        };
        let records = processor.process("doc", Box::new(source)).await.unwrap();

        assert_eq!(records[0].img_summary_files.len(), 1);
        assert!(records[0].img_vision_files.is_empty());
        assert!(records[0].img_summary_files[0]
            .ends_with("img_summary/doc_page1_img1_summary.json"));
        assert_eq!(model.captions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_unit_skips_summarizer() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.ensure().unwrap();
        let model = Arc::new(CountingModel::default());
        let processor = processor("", model.clone(), layout, true);

        let source = FakeSource {
            units: vec![("   ".to_string(), vec![])],
        };
        let records = processor.process("doc", Box::new(source)).await.unwrap();

        assert_eq!(records[0].text, docmill_core::NO_TEXT_FOUND);
        assert_eq!(records[0].summary, NO_TEXT_TO_SUMMARIZE);
        assert_eq!(model.summaries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_degrades() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.ensure().unwrap();
        let processor = processor("", Arc::new(FailingModel), layout, true);

        let source = FakeSource {
            units: vec![("some text".to_string(), vec![png()])],
        };
        let records = processor.process("doc", Box::new(source)).await.unwrap();
        let unit = &records[0];

        assert_eq!(unit.summary, NO_SUMMARY_AVAILABLE);
        // The blob is kept but has no enrichment file
        assert_eq!(unit.images.len(), 1);
        assert!(unit.img_vision_files.is_empty());
        assert!(unit.img_summary_files.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_image_does_not_stop_unit() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.ensure().unwrap();
        let model = Arc::new(CountingModel::default());
        let processor = processor("", model.clone(), layout, true);

        let broken = ExtractedImage {
            data: vec![0, 1, 2, 3],
            ext: "png".to_string(),
        };
        let source = FakeSource {
            units: vec![("text".to_string(), vec![broken, png()])],
        };
        let records = processor.process("doc", Box::new(source)).await.unwrap();
        let unit = &records[0];

        assert_eq!(unit.images.len(), 2);
        assert_eq!(unit.img_vision_files.len(), 1);
        assert!(unit.img_vision_files[0].ends_with("doc_page1_img2_vision.json"));
        assert_eq!(unit.summary, "summary of 1 words");
    }

    #[tokio::test]
    async fn test_save_images_disabled() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.ensure().unwrap();
        let model = Arc::new(CountingModel::default());
        let processor = processor("", model.clone(), layout.clone(), false);

        let source = FakeSource {
            units: vec![("text".to_string(), vec![png()])],
        };
        let records = processor.process("doc", Box::new(source)).await.unwrap();

        assert!(records[0].images.is_empty());
        assert_eq!(records[0].img_vision_files.len(), 1);
        assert!(!layout.images_dir().join("doc_page1_img1.png").exists());
    }
}
