//! The `folio engine` command: inspect the OCR engine and PDF renderer.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use folio_core::config::RecognitionConfig;
use folio_core::{Config, Recognizer, TesseractRecognizer};

/// Arguments for the `engine` command.
#[derive(Args, Debug)]
pub struct EngineArgs {
    #[command(subcommand)]
    pub command: EngineCommand,

    /// Tesseract executable or install directory
    #[arg(long, global = true, env = "FOLIO_TESSERACT")]
    pub engine_path: Option<PathBuf>,

    /// Tesseract language data directory
    #[arg(long, global = true, env = "FOLIO_TESSDATA_DIR")]
    pub tessdata_dir: Option<PathBuf>,
}

/// Subcommands for engine inspection.
#[derive(Subcommand, Debug)]
pub enum EngineCommand {
    /// Report whether tesseract and the PDF renderer are usable
    Check,

    /// List installed recognition languages
    Langs,
}

/// Execute the engine command.
pub async fn execute(args: EngineArgs, config: Config) -> anyhow::Result<()> {
    let recognizer = TesseractRecognizer::new(recognition_config(&config, &args));

    match args.command {
        EngineCommand::Check => check(&recognizer),
        EngineCommand::Langs => {
            let languages = tokio::task::spawn_blocking(move || recognizer.available_languages())
                .await??;
            if languages.is_empty() {
                tracing::warn!("tesseract reports no installed languages");
            }
            for code in languages {
                println!("{code}");
            }
            Ok(())
        }
    }
}

fn recognition_config(config: &Config, args: &EngineArgs) -> RecognitionConfig {
    let mut recognition = config.recognition.clone();
    if let Some(path) = &args.engine_path {
        recognition.engine_path = Some(path.clone());
    }
    if let Some(dir) = &args.tessdata_dir {
        recognition.tessdata_dir = Some(dir.clone());
    }
    recognition
}

fn check(recognizer: &TesseractRecognizer) -> anyhow::Result<()> {
    let engine_ok = recognizer.check_available();
    let renderer_ok = folio_core::source::pdf::renderer_available();

    match recognizer.executable() {
        Some(path) => println!("  tesseract:  {}", path.display()),
        None => println!("  tesseract:  not found"),
    }
    if recognizer.executable().is_some() && !engine_ok {
        println!("  tessdata:   directory not found");
    }
    println!(
        "  pdf render: {}",
        if renderer_ok {
            "pdftoppm + pdfinfo"
        } else {
            "not found (page image folders still work)"
        }
    );

    if !engine_ok {
        anyhow::bail!(
            "Recognition engine unavailable.\n\n  Hint: install tesseract, or set \
             --engine-path / FOLIO_TESSERACT."
        );
    }
    Ok(())
}
