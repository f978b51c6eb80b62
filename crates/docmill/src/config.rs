//! Configuration handling for docmill.
//!
//! Settings come from, in increasing precedence: built-in defaults, the TOML
//! config file, a `.env` file, process environment variables and finally
//! command-line flags (applied in `main`).

use directories::ProjectDirs;
use docmill_core::{Error, Result};
use docmill_pipeline::DEFAULT_SUBFOLDERS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Input configuration
    #[serde(default)]
    pub input: InputConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Language-model backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Processing limits
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where input documents live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Root directory holding the subfolders
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Subfolders of `root_dir` to walk
    #[serde(default = "default_subfolders")]
    pub subfolders: Vec<String>,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_subfolders() -> Vec<String> {
    DEFAULT_SUBFOLDERS.iter().map(|s| (*s).to_string()).collect()
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            subfolders: default_subfolders(),
        }
    }
}

/// Where results are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Persist extracted image blobs
    #[serde(default = "default_save_images")]
    pub save_images: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_save_images() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            save_images: default_save_images(),
        }
    }
}

/// Language-model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// OpenAI-compatible API root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key, usually supplied through `GROQ_API_KEY`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Model for summaries
    #[serde(default = "default_model")]
    pub model: String,

    /// Model for image descriptions (defaults to `model`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_model: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Completion token cap
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_base_url() -> String {
    docmill_llm::DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    "llama3-8b-8192".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    512
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            vision_model: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl BackendConfig {
    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Concurrency and chunking limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Words per summarization request
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Files processed at the same time
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,

    /// In-flight backend requests
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Concurrent image decode and recognition jobs
    #[serde(default = "default_ocr_workers")]
    pub ocr_workers: usize,

    /// Tesseract language code
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,

    /// Tesseract data directory (system default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tessdata_dir: Option<PathBuf>,
}

fn default_chunk_size() -> usize {
    500
}

fn default_max_concurrent_files() -> usize {
    8
}

fn default_max_concurrent_requests() -> usize {
    4
}

fn default_ocr_workers() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_concurrent_files: default_max_concurrent_files(),
            max_concurrent_requests: default_max_concurrent_requests(),
            ocr_workers: default_ocr_workers(),
            ocr_language: default_ocr_language(),
            tessdata_dir: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (overridden by `RUST_LOG` and `--verbose`)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const SAMPLE_TOML: &str = r#"# docmill configuration

[input]
root_dir = "./data"
subfolders = ["PDF", "Xlsx", "pptx", "Markdown"]

[output]
dir = "./output"
save_images = true

[backend]
# The API key is read from GROQ_API_KEY
base_url = "https://api.groq.com/openai/v1"
model = "llama3-8b-8192"
# vision_model = "llama-3.2-11b-vision-preview"
timeout_secs = 60
max_tokens = 512

[processing]
chunk_size = 500
max_concurrent_files = 8
max_concurrent_requests = 4
ocr_workers = 4
ocr_language = "eng"

[logging]
level = "info"
"#;

impl Config {
    /// Default config file location.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::read(&path),
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Parse TOML text.
    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Sample configuration file.
    pub fn sample_toml() -> &'static str {
        SAMPLE_TOML
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DOCMILL_ROOT_DIR") {
            self.input.root_dir = PathBuf::from(v);
        }
        if let Some(v) = get("DOCMILL_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(v);
        }
        if let Some(v) = get("DOCMILL_BASE_URL") {
            self.backend.base_url = v;
        }
        if let Some(v) = get("GROQ_API_KEY") {
            self.backend.api_key = Some(v);
        }
        if let Some(v) = get("GROQ_MODEL") {
            self.backend.model = v;
        }
        if let Some(v) = get("GROQ_VISION_MODEL") {
            self.backend.vision_model = Some(v);
        }
    }

    /// Check the settings a run depends on.
    ///
    /// `require_api_key` is false for offline runs.
    pub fn validate(&self, require_api_key: bool) -> Result<()> {
        if require_api_key
            && self
                .backend
                .api_key
                .as_deref()
                .map_or(true, |k| k.trim().is_empty())
        {
            return Err(Error::Config(
                "GROQ_API_KEY is not set in the environment or config".to_string(),
            ));
        }
        if self.input.subfolders.is_empty() {
            return Err(Error::Config("input.subfolders is empty".to_string()));
        }
        if self.backend.model.trim().is_empty() {
            return Err(Error::Config("backend.model is empty".to_string()));
        }

        let limits = [
            ("processing.chunk_size", self.processing.chunk_size),
            (
                "processing.max_concurrent_files",
                self.processing.max_concurrent_files,
            ),
            (
                "processing.max_concurrent_requests",
                self.processing.max_concurrent_requests,
            ),
            ("processing.ocr_workers", self.processing.ocr_workers),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be greater than zero")));
            }
        }

        Ok(())
    }
}

/// Get the config directory for docmill.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DOCMILL_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "docmill").map(|dirs| dirs.config_dir().to_path_buf())
}
