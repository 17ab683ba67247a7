//! Pipeline setup: config overrides, engine checks, output target.

use std::sync::Arc;

use folio_core::{
    Config, DocumentDiscovery, EmptyDocumentPolicy, LanguageCode, Pipeline, Recognizer,
    TesseractRecognizer,
};

use super::{OutputTarget, ProcessArgs, ProcessContext};

/// Validate input, apply flags to `config`, check the engine, and assemble the pipeline.
pub fn setup_pipeline(
    args: &ProcessArgs,
    mut config: Config,
) -> anyhow::Result<ProcessContext> {
    if !args.input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.input
        );
    }

    apply_overrides(&mut config, args)?;
    config.validate()?;

    let recognizer = TesseractRecognizer::new(config.recognition.clone());
    if !recognizer.check_available() {
        let detail = match (recognizer.executable(), config.recognition.tessdata_path()) {
            (Some(_), Some(dir)) => format!("Language data directory not found: {}", dir.display()),
            _ => "Tesseract is not installed or not on PATH.".to_string(),
        };
        anyhow::bail!(
            "{detail}\n\n  Hint: install tesseract, or point --engine-path / FOLIO_TESSERACT \
             at it. Run `folio engine check` for details."
        );
    }
    warn_missing_languages(&recognizer, &config.recognition.languages);

    tracing::info!(
        "Recognizing with {} ({}), {} worker(s)",
        recognizer.name(),
        folio_core::recognition::join_languages(&config.recognition.languages),
        config.processing.parallel_workers
    );

    let output = output_target(&config, args);
    let pipeline = Pipeline::new(&config, Arc::new(recognizer));
    let discovery = DocumentDiscovery::new(config.processing.clone());

    Ok(ProcessContext {
        pipeline,
        discovery,
        output,
    })
}

/// Apply command-line flags on top of the loaded configuration.
pub(crate) fn apply_overrides(config: &mut Config, args: &ProcessArgs) -> anyhow::Result<()> {
    if !args.languages.is_empty() {
        config.recognition.languages = parse_languages(&args.languages)?;
    }
    if let Some(parallel) = args.parallel {
        config.processing.parallel_workers = parallel;
    }
    if let Some(scale) = args.scale {
        config.render.scale = scale;
    }
    if args.grayscale {
        config.render.grayscale = true;
    }
    if args.invert {
        config.render.invert = true;
    }
    if let Some(psm) = args.psm {
        config.recognition.page_segmentation_mode = Some(psm);
    }
    if let Some(path) = &args.engine_path {
        config.recognition.engine_path = Some(path.clone());
    }
    if let Some(dir) = &args.tessdata_dir {
        config.recognition.tessdata_dir = Some(dir.clone());
    }
    if args.empty_ok {
        config.processing.empty_document = EmptyDocumentPolicy::Empty;
    }
    if let Some(sentinel) = &args.sentinel {
        config.processing.failure_sentinel = sentinel.clone();
    }
    if let Some(format) = args.format {
        config.output.format = format.into();
    }
    if args.compact {
        config.output.pretty = false;
    }
    if let Some(dir) = &args.output_dir {
        let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
        config.output.dir = expanded.into();
    }
    Ok(())
}

/// Split `-l` values on `+` and validate each code, keeping priority order.
pub(crate) fn parse_languages(values: &[String]) -> anyhow::Result<Vec<LanguageCode>> {
    let mut languages: Vec<LanguageCode> = Vec::new();
    for part in values.iter().flat_map(|v| v.split('+')) {
        let code = LanguageCode::new(part.trim()).map_err(anyhow::Error::msg)?;
        if !languages.contains(&code) {
            languages.push(code);
        }
    }
    Ok(languages)
}

fn output_target(config: &Config, args: &ProcessArgs) -> OutputTarget {
    if args.stdout {
        OutputTarget::Stdout {
            format: config.output.format,
            pretty: config.output.pretty,
        }
    } else {
        OutputTarget::Directory {
            dir: config.output.dir_path(),
            pretty: config.output.pretty,
        }
    }
}

/// Warn about requested languages the engine has no data for.
fn warn_missing_languages(recognizer: &TesseractRecognizer, requested: &[LanguageCode]) {
    match recognizer.available_languages() {
        Ok(installed) => {
            for code in requested.iter().filter(|c| !installed.contains(c)) {
                tracing::warn!(
                    "Language '{code}' is not installed for tesseract; pages may fail. \
                     Run `folio engine langs` to list installed languages."
                );
            }
        }
        Err(e) => tracing::debug!("Could not list tesseract languages: {e}"),
    }
}
