//! # docmill-core
//!
//! Core types and traits for docmill, a multi-format document extraction and
//! enrichment pipeline.
//!
//! - **Data model**: [`DocumentRecord`], [`UnitRecord`], [`SheetRow`],
//!   [`ContentBlock`], [`ImageEnrichment`]
//! - **Collaborators**: [`LanguageModel`] and [`TextRecognizer`] are the only
//!   contracts the pipeline needs from the AI backend and the OCR engine
//! - **Extraction**: [`DocumentExtractor`] turns one file into one record
//! - **Layout**: [`OutputLayout`] names every artifact a run writes
//!
//! ## Architecture
//!
//! ```text
//! discover → DocumentExtractor ─┬─ unit text → LanguageModel::summarize
//!                               └─ images → TextRecognizer ─(empty)→ LanguageModel::describe_image
//!          → DocumentRecord → <stem>_output.json
//! ```
//!
//! ## Related Crates
//!
//! - `docmill-llm`: Chat-completions backend and bounded backend pool
//! - `docmill-extract`: Format extractors and the image enricher
//! - `docmill-pipeline`: Discovery, orchestration, output and re-describe pass

pub mod error;
pub mod layout;
pub mod traits;
pub mod types;

pub use error::{BackendError, Error, ExtractError, OcrError, Result};
pub use layout::{file_stem, OutputLayout};
pub use traits::*;
pub use types::*;
