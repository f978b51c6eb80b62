//! Post-hoc image re-describer.
//!
//! Rescans existing `*_output.json` records and captions every image they
//! reference, regardless of how the image was routed originally. Each result
//! overwrites the image's vision file as a [`BackfillRecord`] with the image
//! inlined as a base64 data URL.

use docmill_core::{
    file_stem, BackfillRecord, DocumentRecord, ExtractedImage, OutputLayout, Result,
};
use docmill_extract::ImageEnricher;
use docmill_llm::data_url;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a re-describe pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    /// Output records read
    pub files_scanned: usize,
    /// Vision files written
    pub images_described: usize,
    /// Unreadable records and images that could not be described
    pub failures: usize,
}

/// Regenerates vision descriptions for already processed documents.
pub struct Redescriber {
    layout: OutputLayout,
    enricher: Arc<ImageEnricher>,
}

impl Redescriber {
    pub fn new(layout: OutputLayout, enricher: Arc<ImageEnricher>) -> Self {
        Self { layout, enricher }
    }

    /// Scan the output directory and re-describe every referenced image.
    pub async fn run(&self) -> Result<BackfillSummary> {
        tokio::fs::create_dir_all(self.layout.vision_dir()).await?;

        let mut summary = BackfillSummary::default();
        for path in self.output_files().await? {
            summary.files_scanned += 1;

            let record = match read_record(&path).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping unreadable record {:?}: {}", path, e);
                    summary.failures += 1;
                    continue;
                }
            };

            let Some((kind, units)) = record.content.image_units() else {
                continue;
            };

            for unit in units {
                for image in &unit.images {
                    match self.describe(unit.unit_number, image).await {
                        Ok(vision) => {
                            debug!("Described {:?} into {:?}", image, vision);
                            summary.images_described += 1;
                        }
                        Err(e) => {
                            warn!(
                                "Failed to describe {:?} ({} {} of {}): {}",
                                image, kind, unit.unit_number, record.metadata.file_name, e
                            );
                            summary.failures += 1;
                        }
                    }
                }
            }
        }

        info!(
            "Re-describe finished: {} records, {} images, {} failures",
            summary.files_scanned, summary.images_described, summary.failures
        );
        Ok(summary)
    }

    /// Caption one image and overwrite its vision file.
    async fn describe(&self, unit_number: u32, image_path: &Path) -> Result<PathBuf> {
        let data = tokio::fs::read(image_path).await?;
        let ext = image_path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let image = ExtractedImage { data, ext };

        let description = self.enricher.caption(&image).await?;
        let record = BackfillRecord {
            page_or_slide: unit_number,
            image_base64: data_url(&image.data, image.mime_type()),
            description,
        };

        let path = self
            .layout
            .vision_dir()
            .join(format!("{}_vision.json", file_stem(image_path)));
        tokio::fs::write(&path, serde_json::to_vec_pretty(&record)?).await?;
        Ok(path)
    }

    async fn output_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(self.layout.root()).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if OutputLayout::is_output_file(&path) && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

async fn read_record(path: &Path) -> Result<DocumentRecord> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmill_core::{
        ContentBlock, DocumentContent, DocumentMetadata, FileKind, UnitRecord,
    };
    use docmill_extract::NoopRecognizer;
    use docmill_llm::NoopBackend;
    use tempfile::tempdir;

    fn redescriber(layout: &OutputLayout) -> Redescriber {
        let model = Arc::new(NoopBackend::new());
        let enricher = Arc::new(ImageEnricher::new(Arc::new(NoopRecognizer::new()), model, 1));
        Redescriber::new(layout.clone(), enricher)
    }

    fn save_png(path: &Path) {
        image::RgbImage::from_pixel(4, 4, image::Rgb([200, 30, 30]))
            .save(path)
            .unwrap();
    }

    fn unit(number: u32, images: Vec<PathBuf>) -> UnitRecord {
        UnitRecord {
            unit_number: number,
            text: "text".to_string(),
            text_blocks: Vec::new(),
            tables: None,
            images,
            img_summary_files: Vec::new(),
            img_vision_files: Vec::new(),
            summary: "summary".to_string(),
            time_taken: "0.01 sec".to_string(),
        }
    }

    fn record(file_name: &str, file_type: FileKind, content: DocumentContent) -> DocumentRecord {
        DocumentRecord {
            metadata: DocumentMetadata {
                file_name: file_name.to_string(),
                file_type,
                file_size: 1,
                unit_count: content.len(),
                rows_extracted: None,
            },
            content,
            overall_summary: String::new(),
            total_time_taken: "0.01 seconds".to_string(),
        }
    }

    fn save_record(layout: &OutputLayout, stem: &str, record: &DocumentRecord) {
        std::fs::write(
            layout.output_path(stem),
            serde_json::to_vec_pretty(record).unwrap(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_backfills_slide_images() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.ensure().unwrap();

        let image = layout.images_dir().join("deck_slide2_img1.png");
        save_png(&image);
        let deck = record(
            "deck.pptx",
            FileKind::Presentation,
            DocumentContent::Slides(vec![unit(1, Vec::new()), unit(2, vec![image.clone()])]),
        );
        save_record(&layout, "deck", &deck);

        // A stale OCR-routed vision file is replaced
        let vision = layout.vision_dir().join("deck_slide2_img1_vision.json");
        std::fs::write(&vision, br#"{"description":"old"}"#).unwrap();

        let summary = redescriber(&layout).run().await.unwrap();

        assert_eq!(
            summary,
            BackfillSummary {
                files_scanned: 1,
                images_described: 1,
                failures: 0,
            }
        );

        let written: BackfillRecord =
            serde_json::from_slice(&std::fs::read(&vision).unwrap()).unwrap();
        assert_eq!(written.page_or_slide, 2);
        assert!(written.image_base64.starts_with("data:image/png;base64,"));
        assert!(written.description.starts_with("Image (image/png, "));
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_scan() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.ensure().unwrap();

        let good = layout.images_dir().join("report_page1_img2.png");
        save_png(&good);
        let missing = layout.images_dir().join("report_page1_img1.png");
        let corrupt = layout.images_dir().join("report_page3_img1.jpg");
        std::fs::write(&corrupt, b"not an image").unwrap();

        let report = record(
            "report.pdf",
            FileKind::Pdf,
            DocumentContent::Pages(vec![
                unit(1, vec![missing, good]),
                unit(2, Vec::new()),
                unit(3, vec![corrupt]),
            ]),
        );
        save_record(&layout, "report", &report);
        std::fs::write(layout.output_path("broken"), b"{ truncated").unwrap();

        let summary = redescriber(&layout).run().await.unwrap();

        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.images_described, 1);
        assert_eq!(summary.failures, 3);
        assert!(layout
            .vision_dir()
            .join("report_page1_img2_vision.json")
            .exists());
    }

    #[tokio::test]
    async fn test_records_without_images_are_skipped() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());

        let notes = record(
            "notes.md",
            FileKind::Markdown,
            DocumentContent::Blocks(vec![ContentBlock::Paragraph {
                text: "hi".to_string(),
            }]),
        );
        save_record(&layout, "notes", &notes);
        std::fs::write(dir.path().join("unrelated.json"), b"{}").unwrap();

        let summary = redescriber(&layout).run().await.unwrap();

        assert_eq!(
            summary,
            BackfillSummary {
                files_scanned: 1,
                images_described: 0,
                failures: 0,
            }
        );
        assert!(layout.vision_dir().is_dir());
    }
}
