//! Run orchestration for docmill.
//!
//! This crate drives a run end to end:
//! discovery → extraction → output, plus the post-hoc re-describe pass.
//!
//! # Components
//!
//! - [`discover`]: Walks the configured subfolders for supported files
//! - [`Pipeline`]: Dispatches one bounded task per file and isolates failures
//! - [`OutputWriter`]: Writes each document record atomically
//! - [`Redescriber`]: Re-captions every image referenced by existing output
//! - [`PipelineEvent`]: Progress events emitted during a run
//!
//! # Example
//!
//! ```rust,ignore
//! use docmill_pipeline::{Pipeline, PipelineConfig, PipelineEvent};
//!
//! let pipeline = Pipeline::new(PipelineConfig::new(root), registry, layout);
//!
//! // Subscribe to progress
//! let mut events = pipeline.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         if let PipelineEvent::FileFailed { path, error } = event {
//!             eprintln!("{path:?}: {error}");
//!         }
//!     }
//! });
//!
//! let summary = pipeline.run().await?;
//! println!("{} of {} files succeeded", summary.succeeded, summary.discovered);
//! ```

pub mod discovery;
pub mod orchestrator;
pub mod output;
pub mod redescribe;

pub use discovery::{discover, DiscoveredFile};
pub use orchestrator::{
    FileFailure, Pipeline, PipelineConfig, PipelineEvent, RunSummary, DEFAULT_SUBFOLDERS,
};
pub use output::OutputWriter;
pub use redescribe::{BackfillSummary, Redescriber};
