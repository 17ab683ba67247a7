//! Folio Core - Embeddable page OCR library.
//!
//! Folio renders each page of a scanned document, recognizes its text, and
//! reassembles the per-page results into one ordered document record.
//!
//! # Architecture
//!
//! ```text
//! Source → Render (parallel) → Image → Recognize (parallel) → Reorder → Record → Sink
//! ```
//!
//! Pages run concurrently on a bounded worker pool and finish in any order;
//! the record always lists them by page index.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use folio_core::{Config, Pipeline, PdfDocument, TesseractRecognizer};
//!
//! #[tokio::main]
//! async fn main() -> folio_core::Result<()> {
//!     let config = Config::load()?;
//!     let recognizer = Arc::new(TesseractRecognizer::new(config.recognition.clone()));
//!     let pipeline = Pipeline::new(&config, recognizer);
//!
//!     let source = Arc::new(PdfDocument::open("./scan.pdf".as_ref())?);
//!     let outcome = pipeline.run(source).await?;
//!     println!("{} pages", outcome.record.page_count());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod pipeline;
pub mod raster;
pub mod recognition;
pub mod sink;
pub mod source;
pub mod types;

// Re-exports for convenient access
pub use config::{Config, EmptyDocumentPolicy};
pub use error::{
    ConfigError, FolioError, ImageError, PipelineError, PipelineResult, RecognitionError,
    Result, SourceError,
};
pub use pipeline::{assemble_pages, PageEvent, Pipeline, PipelineStage};
pub use raster::{ColorMode, EncodeFormat, FillColor, Image, RawPixmap};
pub use recognition::{
    CorrelationToken, LanguageCode, RecognitionRequest, RecognitionResult, Recognizer,
    TesseractRecognizer,
};
pub use sink::{JsonDirectorySink, OutputFormat, ResultSink, StreamSink};
pub use source::{
    DiscoveredDocument, DocumentDiscovery, DocumentKind, DocumentSource, ImageSequence,
    PageHandle, PageWorkUnit, PdfDocument,
};
pub use types::{DocumentOutcome, DocumentRecord, PageFailure, PageStage, RunStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
