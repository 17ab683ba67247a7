//! The `folio process` command for extracting document text.

mod batch;
mod setup;
pub mod types;

pub use types::OutputFormat;

use clap::Args;
use folio_core::{Config, DocumentDiscovery, DocumentKind, Pipeline};
use std::path::PathBuf;

use batch::process_batch;
use setup::setup_pipeline;

/// Arguments for the `process` command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// PDF file, folder of PDFs, or folder of page images
    #[arg(required = true)]
    pub input: PathBuf,

    /// Directory for per-document JSON records [default: from config]
    #[arg(short, long, conflicts_with = "stdout")]
    pub output_dir: Option<PathBuf>,

    /// Write records to stdout instead of a directory
    #[arg(long)]
    pub stdout: bool,

    /// Record format for --stdout [default: from config]
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,

    /// Recognition language, in priority order (repeatable, or joined: ara+eng)
    #[arg(short, long = "lang", value_name = "LANG")]
    pub languages: Vec<String>,

    /// Number of pages recognized concurrently
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Render resolution multiplier (1.0 = 72 DPI)
    #[arg(long)]
    pub scale: Option<f32>,

    /// Convert pages to grayscale before recognition
    #[arg(long)]
    pub grayscale: bool,

    /// Invert pages before recognition (light text on dark background)
    #[arg(long)]
    pub invert: bool,

    /// Tesseract page segmentation mode (0-13)
    #[arg(long, value_name = "MODE")]
    pub psm: Option<u8>,

    /// Tesseract executable or install directory
    #[arg(long, env = "FOLIO_TESSERACT")]
    pub engine_path: Option<PathBuf>,

    /// Tesseract language data directory
    #[arg(long, env = "FOLIO_TESSDATA_DIR")]
    pub tessdata_dir: Option<PathBuf>,

    /// Store an empty record for documents without pages instead of failing
    #[arg(long)]
    pub empty_ok: bool,

    /// Text stored for pages that could not be recognized [default: empty]
    #[arg(long, value_name = "TEXT")]
    pub sentinel: Option<String>,
}

/// Manual Default impl for constructing ProcessArgs outside of clap.
///
/// Mirrors what clap produces when only `input` is given.
impl Default for ProcessArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_dir: None,
            stdout: false,
            format: None,
            compact: false,
            languages: Vec::new(),
            parallel: None,
            scale: None,
            grayscale: false,
            invert: false,
            psm: None,
            engine_path: None,
            tessdata_dir: None,
            empty_ok: false,
            sentinel: None,
        }
    }
}

/// Where finished records go.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OutputTarget {
    Stdout {
        format: folio_core::OutputFormat,
        pretty: bool,
    },
    Directory {
        dir: PathBuf,
        pretty: bool,
    },
}

/// Processing context assembled by setup_pipeline().
pub(crate) struct ProcessContext {
    pub pipeline: Pipeline,
    pub discovery: DocumentDiscovery,
    pub output: OutputTarget,
}

/// Execute the process command.
pub async fn execute(args: ProcessArgs, config: Config) -> anyhow::Result<()> {
    let ctx = setup_pipeline(&args, config)?;

    let documents = ctx.discovery.discover(&args.input);
    if documents.is_empty() {
        tracing::warn!("No PDFs or page images found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!("Found {} document(s) to process", documents.len());

    if documents.iter().any(|d| d.kind == DocumentKind::Pdf)
        && !folio_core::source::pdf::renderer_available()
    {
        anyhow::bail!(
            "PDF rendering needs poppler's pdftoppm and pdfinfo on PATH.\n\n  \
             Hint: install poppler-utils, or pass a folder of page images instead."
        );
    }

    process_batch(ctx, documents).await
}
