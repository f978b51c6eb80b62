//! Document record output.

use docmill_core::{file_stem, DocumentRecord, Error, OutputLayout, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes document records as `<stem>_output.json`.
///
/// The record is serialized in memory, written to a uniquely named temporary
/// file in the output directory and renamed into place, so readers never see
/// a partial document. An existing
/// file of the same name is replaced, never merged.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    layout: OutputLayout,
}

impl OutputWriter {
    #[must_use]
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }

    #[must_use]
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Write the record for `source`. Returns the output path.
    pub async fn write(&self, record: &DocumentRecord, source: &Path) -> Result<PathBuf> {
        let path = self.layout.output_path(&file_stem(source));
        let bytes = serde_json::to_vec_pretty(record)?;

        let len = bytes.len();
        let root = self.layout.root().to_path_buf();
        let target = path.clone();

        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            // Removed on drop if the rename never happens
            let mut tmp = tempfile::Builder::new()
                .prefix(".")
                .suffix(".tmp")
                .tempfile_in(&root)?;
            tmp.write_all(&bytes)?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| Error::Other(format!("Task join error: {e}")))??;

        debug!("Wrote {:?} ({} bytes)", path, len);
        Ok(path)
    }
}
