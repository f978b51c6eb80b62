//! Output directory layout and artifact naming.
//!
//! ```text
//! <output>/
//!   <stem>_output.json
//!   images/
//!     <stem>_<unit><n>_img<k>.<ext>
//!     img_summary/<stem>_<unit><n>_img<k>_summary.json
//!     img_vision/<stem>_<unit><n>_img<k>_vision.json
//! ```

use std::path::{Path, PathBuf};

use crate::types::{EnrichmentRoute, UnitKind};

const IMAGES_DIR: &str = "images";
const SUMMARY_DIR: &str = "img_summary";
const VISION_DIR: &str = "img_vision";
const OUTPUT_SUFFIX: &str = "_output.json";

/// Paths for everything a run writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    #[must_use]
    pub fn summary_dir(&self) -> PathBuf {
        self.images_dir().join(SUMMARY_DIR)
    }

    #[must_use]
    pub fn vision_dir(&self) -> PathBuf {
        self.images_dir().join(VISION_DIR)
    }

    /// Create the directory tree.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.summary_dir())?;
        std::fs::create_dir_all(self.vision_dir())?;
        Ok(())
    }

    /// Image blob path: `images/<stem>_<unit><n>_img<k>.<ext>`.
    #[must_use]
    pub fn image_path(
        &self,
        stem: &str,
        unit: UnitKind,
        unit_number: u32,
        index: usize,
        ext: &str,
    ) -> PathBuf {
        self.images_dir()
            .join(format!("{}.{ext}", image_base(stem, unit, unit_number, index)))
    }

    /// Enrichment file path, under the directory chosen by the routing decision.
    #[must_use]
    pub fn enrichment_path(
        &self,
        stem: &str,
        unit: UnitKind,
        unit_number: u32,
        index: usize,
        route: EnrichmentRoute,
    ) -> PathBuf {
        let base = image_base(stem, unit, unit_number, index);
        match route {
            EnrichmentRoute::TextRecognition => {
                self.summary_dir().join(format!("{base}_summary.json"))
            }
            EnrichmentRoute::Captioning => self.vision_dir().join(format!("{base}_vision.json")),
        }
    }

    /// Document record path: `<stem>_output.json`.
    #[must_use]
    pub fn output_path(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}{OUTPUT_SUFFIX}"))
    }

    /// Whether a path names a document record.
    #[must_use]
    pub fn is_output_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(OUTPUT_SUFFIX) && n.len() > OUTPUT_SUFFIX.len())
    }
}

/// File stem of a source path, lossily converted.
#[must_use]
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn image_base(stem: &str, unit: UnitKind, unit_number: u32, index: usize) -> String {
    format!("{stem}_{unit}{unit_number}_img{index}")
}
