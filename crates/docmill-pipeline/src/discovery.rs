//! Input discovery.

use docmill_core::FileKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A supported file found under the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub kind: FileKind,
}

/// Recursively collect supported files under each `<root>/<subfolder>`.
///
/// Files are classified by extension, ignoring case; anything else
/// is ignored. Missing subfolders are logged and skipped. The result is sorted
/// by path.
pub fn discover(root: &Path, subfolders: &[String]) -> Vec<DiscoveredFile> {
    let mut files = Vec::new();

    for subfolder in subfolders {
        let dir = root.join(subfolder);
        if !dir.is_dir() {
            warn!("Skipping missing input folder {:?}", dir);
            continue;
        }

        for entry in WalkDir::new(&dir).follow_links(false) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Cannot read entry under {:?}: {}", dir, e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            match FileKind::from_path(&path) {
                Some(kind) => files.push(DiscoveredFile { path, kind }),
                None => debug!("Ignoring {:?}", path),
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files.dedup_by(|a, b| a.path == b.path);
    files
}
