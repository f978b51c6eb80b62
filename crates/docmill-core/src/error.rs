//! Error types for docmill.
//!
//! The variants follow the failure classes of a run: a whole file failing to
//! extract ([`ExtractError`]), one image failing to decode or recognize
//! ([`OcrError`]), the language-model backend failing ([`BackendError`]), and
//! configuration errors that abort a run before any file is touched.

use thiserror::Error;

/// Main error type for docmill operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Document extraction failed
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractError),

    /// Language-model backend failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Text recognition failed
    #[error("ocr error: {0}")]
    Ocr(#[from] OcrError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Document extraction errors. Any of these is fatal for one file only.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extraction failed: {0}")]
    Failed(String),
}

/// Language-model backend errors.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("empty response from backend")]
    EmptyResponse,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Text recognition errors.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("engine initialization failed: {0}")]
    Init(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("recognition failed: {0}")]
    Recognition(String),
}

/// Result type alias for docmill operations.
pub type Result<T> = std::result::Result<T, Error>;
