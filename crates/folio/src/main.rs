//! Folio CLI - Page-by-page OCR for scanned documents.
//!
//! Folio renders every page of a PDF (or a folder of page images), recognizes
//! the text with Tesseract, and writes one JSON record per document with the
//! page texts in reading order.
//!
//! # Usage
//!
//! ```bash
//! # OCR a single PDF into ./ocr_output_json/
//! folio process scan.pdf
//!
//! # OCR every PDF in a folder, Arabic then English, as JSON Lines on stdout
//! folio process ./scans/ -l ara -l eng --stdout -f jsonl
//!
//! # Render page 3 to a PNG for inspection
//! folio render scan.pdf --page 3 -o page3.png
//!
//! # Check the engine install
//! folio engine check
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Folio - Page-by-page OCR for scanned documents.
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract text from documents and store one record per document
    Process(cli::process::ProcessArgs),

    /// Render a single page to an image file
    Render(cli::render::RenderArgs),

    /// Inspect the recognition engine
    Engine(cli::engine::EngineArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match folio_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `folio config path`."
            );
            folio_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Folio v{}", folio_core::VERSION);

    match cli.command {
        Commands::Process(args) => cli::process::execute(args, config).await,
        Commands::Render(args) => cli::render::execute(args, config).await,
        Commands::Engine(args) => cli::engine::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
