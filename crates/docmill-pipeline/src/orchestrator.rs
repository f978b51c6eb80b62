//! Run orchestrator.
//!
//! One task per discovered file, gated by a semaphore. A file that fails to
//! extract or write (or whose task panics) is logged and reported in the
//! [`RunSummary`]; its siblings are never cancelled.

use docmill_core::{Error, OutputLayout, Result};
use docmill_extract::ExtractorRegistry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, error, info};

use crate::discovery::{discover, DiscoveredFile};
use crate::output::OutputWriter;

/// Input subfolders walked when none are configured.
pub const DEFAULT_SUBFOLDERS: [&str; 4] = ["PDF", "Xlsx", "pptx", "Markdown"];

/// Progress events emitted during a run.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    FileStarted {
        path: PathBuf,
    },
    FileCompleted {
        path: PathBuf,
        output: PathBuf,
        units: usize,
    },
    FileFailed {
        path: PathBuf,
        error: String,
    },
}

/// Configuration for a run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Input root
    pub root_dir: PathBuf,
    /// Subfolders of `root_dir` to walk
    pub subfolders: Vec<String>,
    /// Files processed at the same time
    pub max_concurrent_files: usize,
}

impl PipelineConfig {
    /// Configuration with the default subfolders.
    #[must_use]
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            subfolders: DEFAULT_SUBFOLDERS.iter().map(|s| (*s).to_string()).collect(),
            max_concurrent_files: 8,
        }
    }
}

/// A file that produced no output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Supported files found
    pub discovered: usize,
    /// Files with an output record
    pub succeeded: usize,
    /// Files without one
    pub failed: Vec<FileFailure>,
}

impl RunSummary {
    /// Whether every discovered file produced output.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives discovery, extraction and output for one run.
pub struct Pipeline {
    config: PipelineConfig,
    registry: Arc<ExtractorRegistry>,
    writer: OutputWriter,
    update_tx: broadcast::Sender<PipelineEvent>,
}

impl Pipeline {
    /// Create a new pipeline writing under `layout`.
    pub fn new(
        config: PipelineConfig,
        registry: Arc<ExtractorRegistry>,
        layout: OutputLayout,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(256);
        Self {
            config,
            registry,
            writer: OutputWriter::new(layout),
            update_tx,
        }
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.update_tx.subscribe()
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every discovered file and wait for all of them.
    pub async fn run(&self) -> Result<RunSummary> {
        let layout = self.writer.layout().clone();
        tokio::task::spawn_blocking(move || layout.ensure())
            .await
            .map_err(|e| Error::Other(format!("setup task failed: {e}")))??;

        let files = self.discover().await?;
        info!(
            "Discovered {} files under {:?}",
            files.len(),
            self.config.root_dir
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_files.max(1)));
        let mut handles = Vec::with_capacity(files.len());

        for file in &files {
            let path = file.path.clone();
            let registry = Arc::clone(&self.registry);
            let writer = self.writer.clone();
            let update_tx = self.update_tx.clone();
            let semaphore = Arc::clone(&semaphore);

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Other(format!("semaphore error: {e}")))?;

                let _ = update_tx.send(PipelineEvent::FileStarted { path: path.clone() });
                info!("Processing {:?}", path);

                match process_file(&path, &registry, &writer).await {
                    Ok((output, units)) => {
                        info!("Saved {:?} ({} units)", output, units);
                        let _ = update_tx.send(PipelineEvent::FileCompleted {
                            path,
                            output,
                            units,
                        });
                        Ok(())
                    }
                    Err(e) => {
                        error!("Failed to process {:?}: {}", path, e);
                        let _ = update_tx.send(PipelineEvent::FileFailed {
                            path,
                            error: e.to_string(),
                        });
                        Err(e)
                    }
                }
            });
            handles.push((file.path.clone(), handle));
        }

        let mut summary = RunSummary {
            discovered: files.len(),
            ..RunSummary::default()
        };

        for (path, handle) in handles {
            match handle.await {
                Ok(Ok(())) => summary.succeeded += 1,
                Ok(Err(e)) => summary.failed.push(FileFailure {
                    path,
                    error: e.to_string(),
                }),
                Err(join_err) => {
                    error!("Task for {:?} panicked: {}", path, join_err);
                    let error = format!("task panicked: {join_err}");
                    let _ = self.update_tx.send(PipelineEvent::FileFailed {
                        path: path.clone(),
                        error: error.clone(),
                    });
                    summary.failed.push(FileFailure { path, error });
                }
            }
        }

        info!(
            "Run finished: {} succeeded, {} failed",
            summary.succeeded,
            summary.failed.len()
        );
        Ok(summary)
    }

    async fn discover(&self) -> Result<Vec<DiscoveredFile>> {
        let root = self.config.root_dir.clone();
        let subfolders = self.config.subfolders.clone();

        // Walk directories in a background thread (blocking I/O)
        tokio::task::spawn_blocking(move || discover(&root, &subfolders))
            .await
            .map_err(|e| Error::Other(format!("scan task failed: {e}")))
    }
}

/// Extract one file and write its record.
async fn process_file(
    path: &Path,
    registry: &ExtractorRegistry,
    writer: &OutputWriter,
) -> Result<(PathBuf, usize)> {
    let record = registry.extract(path).await?;
    let units = record.content.len();
    debug!("Extracted {:?}: {} units", path, units);

    let output = writer.write(&record, path).await?;
    Ok((output, units))
}
