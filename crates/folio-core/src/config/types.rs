//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::recognition::LanguageCode;
use crate::sink::OutputFormat;

fn expand(path: &std::path::Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}

/// Page rendering and preprocessing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Resolution multiplier applied by the renderer (1.0 = 72 DPI for PDFs)
    pub scale: f32,

    /// Reduce pages to a single channel before recognition
    pub grayscale: bool,

    /// Invert pages before recognition (white-on-black scans)
    pub invert: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            grayscale: false,
            invert: false,
        }
    }
}

/// Recognition engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Languages in priority order
    pub languages: Vec<LanguageCode>,

    /// Engine executable or its install directory. Searched on PATH when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_path: Option<PathBuf>,

    /// Language data directory passed to the engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tessdata_dir: Option<PathBuf>,

    /// Tesseract page segmentation mode (0-13)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_segmentation_mode: Option<u8>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            languages: vec![LanguageCode::from_static("eng")],
            engine_path: None,
            tessdata_dir: None,
            page_segmentation_mode: None,
        }
    }
}

impl RecognitionConfig {
    /// Language data directory with `~` expanded.
    pub fn tessdata_path(&self) -> Option<PathBuf> {
        self.tessdata_dir.as_deref().map(expand)
    }
}

/// What to do with a document that has no pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyDocumentPolicy {
    /// Fail with an empty-document error
    #[default]
    Fail,
    /// Produce a record with no pages
    Empty,
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of pages processed concurrently
    pub parallel_workers: usize,

    /// Handling of zero-page documents
    pub empty_document: EmptyDocumentPolicy,

    /// Text stored for a page whose processing failed
    pub failure_sentinel: String,

    /// Image extensions accepted as scanned pages
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            empty_document: EmptyDocumentPolicy::default(),
            failure_sentinel: String::new(),
            supported_formats: vec![
                "png".to_string(),
                "jpg".to_string(),
                "jpeg".to_string(),
                "tif".to_string(),
                "tiff".to_string(),
                "bmp".to_string(),
                "webp".to_string(),
            ],
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Render + recognize budget per page in milliseconds
    pub page_timeout_ms: u64,

    /// Maximum rendered page dimension (width or height)
    pub max_page_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            page_timeout_ms: 120_000,
            max_page_dimension: 20_000,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving one JSON file per document
    pub dir: PathBuf,

    /// Stream format when writing to stdout ("json" or "jsonl")
    pub format: OutputFormat,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./ocr_output_json"),
            format: OutputFormat::Json,
            pretty: true,
        }
    }
}

impl OutputConfig {
    /// Output directory with `~` expanded.
    pub fn dir_path(&self) -> PathBuf {
        expand(&self.dir)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
