//! # docmill CLI
//!
//! Command-line interface for docmill.
//!
//! docmill walks a folder of PDF, XLSX, PPTX and Markdown documents, extracts
//! their text, tables and images, summarizes each page or slide with a
//! language model and writes one JSON record per document.
//!
//! ## Commands
//!
//! - `docmill run` - Process every document under the input root
//! - `docmill redescribe` - Re-caption every image referenced by existing output
//! - `docmill config show|init|path` - Inspect configuration
//!
//! ## Examples
//!
//! ```bash
//! # Process ./data/{PDF,Xlsx,pptx,Markdown} into ./output
//! GROQ_API_KEY=... docmill run --root ./data
//!
//! # Try it without a backend
//! docmill run --root ./data --offline
//!
//! # Machine-readable run summary
//! docmill --format json run --redescribe
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docmill_core::{LanguageModel, OutputLayout, TextRecognizer};
#[cfg(not(feature = "ocr"))]
use docmill_extract::NoopRecognizer;
#[cfg(feature = "ocr")]
use docmill_extract::TesseractRecognizer;
use docmill_extract::{ExtractorRegistry, ImageEnricher, UnitProcessor};
use docmill_llm::{BackendPool, ChatCompletionsBackend, ChatCompletionsConfig, NoopBackend};
use docmill_pipeline::{
    BackfillSummary, Pipeline, PipelineConfig, PipelineEvent, Redescriber, RunSummary,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "docmill")]
#[command(about = "Extract and enrich documents into structured JSON")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/docmill/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every supported document under the input root
    Run {
        /// Input root holding the configured subfolders
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Re-caption all images once the run is done
        #[arg(long)]
        redescribe: bool,

        /// Use the offline no-op backend instead of the API
        #[arg(long)]
        offline: bool,
    },

    /// Re-caption every image referenced by existing output records
    Redescribe {
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use the offline no-op backend instead of the API
        #[arg(long)]
        offline: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

/// Output structure for `run` and `redescribe`.
#[derive(Serialize)]
struct RunOutput<'a> {
    output_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    run: Option<&'a RunSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redescribe: Option<&'a BackfillSummary>,
}

/// Shared collaborators for a run.
struct Services {
    model: Arc<dyn LanguageModel>,
    enricher: Arc<ImageEnricher>,
}

/// Create the language model and image enricher.
fn build_services(config: &Config, offline: bool) -> Result<Services> {
    let backend: Arc<dyn LanguageModel> = if offline {
        info!("Offline mode: summaries and captions come from the no-op backend");
        Arc::new(NoopBackend::new())
    } else {
        let api_key = config
            .backend
            .api_key
            .clone()
            .context("GROQ_API_KEY is not set")?;
        let chat = ChatCompletionsConfig {
            base_url: config.backend.base_url.clone(),
            api_key,
            model: config.backend.model.clone(),
            vision_model: config.backend.vision_model.clone(),
            timeout: config.backend.timeout(),
            max_tokens: config.backend.max_tokens,
        };
        Arc::new(ChatCompletionsBackend::new(chat).context("Failed to create backend client")?)
    };
    info!("Using model {}", backend.model_name());

    let model: Arc<dyn LanguageModel> = Arc::new(BackendPool::new(
        backend,
        config.processing.max_concurrent_requests,
        config.processing.chunk_size,
    ));

    let recognizer = build_recognizer(config);
    info!("Using text recognizer {}", recognizer.name());
    let enricher = Arc::new(ImageEnricher::new(
        recognizer,
        Arc::clone(&model),
        config.processing.ocr_workers,
    ));

    Ok(Services { model, enricher })
}

#[cfg(feature = "ocr")]
fn build_recognizer(config: &Config) -> Arc<dyn TextRecognizer> {
    let mut recognizer = TesseractRecognizer::new(&config.processing.ocr_language);
    if let Some(dir) = &config.processing.tessdata_dir {
        recognizer = recognizer.with_datapath(dir);
    }
    Arc::new(recognizer)
}

#[cfg(not(feature = "ocr"))]
fn build_recognizer(_config: &Config) -> Arc<dyn TextRecognizer> {
    warn!("Built without the `ocr` feature: every image will be captioned");
    Arc::new(NoopRecognizer::new())
}

fn init_logging(config: &Config, verbose: bool) -> Result<()> {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Print one line per finished file.
async fn report_progress(mut events: broadcast::Receiver<PipelineEvent>, format: OutputFormat) {
    loop {
        match events.recv().await {
            Ok(PipelineEvent::FileCompleted {
                path,
                output,
                units,
            }) => {
                if let OutputFormat::Text = format {
                    println!(
                        "  ok    {} -> {} ({units} units)",
                        path.display(),
                        output.display()
                    );
                }
            }
            Ok(PipelineEvent::FileFailed { path, error }) => {
                if let OutputFormat::Text = format {
                    println!("  FAIL  {}: {error}", path.display());
                }
            }
            Ok(PipelineEvent::FileStarted { .. }) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Progress reporter skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_summary(
    format: OutputFormat,
    layout: &OutputLayout,
    run: Option<&RunSummary>,
    redescribe: Option<&BackfillSummary>,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = RunOutput {
                output_dir: layout.root().to_string_lossy().to_string(),
                run,
                redescribe,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            if let Some(run) = run {
                println!(
                    "\nProcessed {} of {} files into {}",
                    run.succeeded,
                    run.discovered,
                    layout.root().display()
                );
                if !run.failed.is_empty() {
                    println!("Failed:");
                    for failure in &run.failed {
                        println!("  {}: {}", failure.path.display(), failure.error);
                    }
                }
            }
            if let Some(backfill) = redescribe {
                println!(
                    "Re-described {} images from {} records ({} failures)",
                    backfill.images_described, backfill.files_scanned, backfill.failures
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(Some(path.clone()))
            .context(format!("Failed to load config from {}", path.display()))?,
        None => Config::load_from(None).context("Failed to load config")?,
    };
    config.apply_env();

    init_logging(&config, cli.verbose)?;

    match cli.command {
        Commands::Run {
            root,
            output,
            redescribe,
            offline,
        } => {
            if let Some(root) = root {
                config.input.root_dir = root;
            }
            if let Some(output) = output {
                config.output.dir = output;
            }
            config.validate(!offline).context("Invalid configuration")?;

            if !config.input.root_dir.is_dir() {
                anyhow::bail!(
                    "Input root does not exist: {}",
                    config.input.root_dir.display()
                );
            }
            info!(
                "Processing {:?} into {:?}",
                config.input.root_dir, config.output.dir
            );

            let services = build_services(&config, offline)?;
            let layout = OutputLayout::new(&config.output.dir);

            let processor = Arc::new(UnitProcessor::new(
                Arc::clone(&services.enricher),
                Arc::clone(&services.model),
                layout.clone(),
                config.output.save_images,
            ));
            let registry = Arc::new(ExtractorRegistry::with_defaults(processor));

            let pipeline = Pipeline::new(
                PipelineConfig {
                    root_dir: config.input.root_dir.clone(),
                    subfolders: config.input.subfolders.clone(),
                    max_concurrent_files: config.processing.max_concurrent_files,
                },
                registry,
                layout.clone(),
            );

            // Subscribe to updates for progress
            let progress = tokio::spawn(report_progress(pipeline.subscribe(), cli.format));

            let summary = pipeline.run().await.context("Pipeline run failed")?;

            // Closing the channel ends the reporter
            drop(pipeline);
            if let Err(e) = progress.await {
                warn!("Progress reporter failed: {}", e);
            }

            let backfill = if redescribe {
                let redescriber = Redescriber::new(layout.clone(), services.enricher);
                Some(
                    redescriber
                        .run()
                        .await
                        .context("Re-describe pass failed")?,
                )
            } else {
                None
            };

            print_summary(cli.format, &layout, Some(&summary), backfill.as_ref())?;
        }

        Commands::Redescribe { output, offline } => {
            if let Some(output) = output {
                config.output.dir = output;
            }
            config.validate(!offline).context("Invalid configuration")?;

            if !config.output.dir.is_dir() {
                anyhow::bail!(
                    "Output directory does not exist: {}",
                    config.output.dir.display()
                );
            }

            let services = build_services(&config, offline)?;
            let layout = OutputLayout::new(&config.output.dir);

            let backfill = Redescriber::new(layout.clone(), services.enricher)
                .run()
                .await
                .context("Re-describe pass failed")?;

            print_summary(cli.format, &layout, None, Some(&backfill))?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&config)
                            .context("Failed to serialize config")?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{}",
                        toml::to_string_pretty(&config).context("Failed to serialize config")?
                    );
                }
            },
            ConfigAction::Init => {
                println!("{}", Config::sample_toml());
            }
            ConfigAction::Path => {
                if let Some(path) = Config::config_path() {
                    println!("{}", path.display());
                } else {
                    println!("Could not determine config directory");
                }
            }
        },
    }

    Ok(())
}
