//! Error types for the Folio OCR pipeline.
//!
//! Errors are organized by component so a caller can tell a page-local
//! failure (bad render, failed recognition) apart from a document-level abort
//! (missing engine, empty source).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Folio operations.
#[derive(Error, Debug)]
pub enum FolioError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Document-level pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Image representation errors
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// Document source errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Recognition engine errors
    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised by the image representation. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// Pixel buffer length does not match `width * height * channels`
    #[error(
        "Invalid dimensions: {width}x{height} {mode} needs {expected} bytes, got {actual}"
    )]
    InvalidDimensions {
        width: u32,
        height: u32,
        mode: String,
        expected: usize,
        actual: usize,
    },

    /// Encoded input is malformed or in an unsupported format
    #[error("Decode error: {0}")]
    Decode(String),

    /// Encoding to a file-exchange format failed
    #[error("Encode error: {0}")]
    Encode(String),

    /// Target color mode is not one this representation knows
    #[error("Unsupported color conversion from {from} to {to}")]
    UnsupportedConversion { from: String, to: String },
}

/// Errors raised by a recognition adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    /// The engine's runtime prerequisites are missing
    #[error("Recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine ran but failed on this request
    #[error("Recognition failed: {0}")]
    Failure(String),
}

/// Errors raised by a document source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The document could not be opened or enumerated
    #[error("Cannot open document {path}: {message}")]
    Open { path: PathBuf, message: String },

    /// A single page failed to render
    #[error("Render failed for page {page}: {message}")]
    Render { page: usize, message: String },

    /// The external renderer is not installed
    #[error("Renderer unavailable: {0}")]
    RendererUnavailable(String),
}

/// Document-level pipeline errors. Page-local failures never surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The recognition engine cannot run, so no page can succeed
    #[error("Recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    /// No recognition language was requested
    #[error("No recognition languages requested")]
    NoLanguages,

    /// The document has no pages and the policy is to fail
    #[error("Document '{title}' has no pages")]
    EmptyDocument { title: String },

    /// Enumerating the document's pages failed
    #[error("Enumeration failed: {0}")]
    Source(#[from] SourceError),

    /// A worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Worker(String),

    /// The result sink could not persist the record
    #[error("Failed to store record for '{title}': {message}")]
    Sink { title: String, message: String },
}

/// Convenience type alias for Folio results.
pub type Result<T> = std::result::Result<T, FolioError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
