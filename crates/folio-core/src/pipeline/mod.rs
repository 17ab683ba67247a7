//! The concurrent page pipeline.
//!
//! - **coordinator**: dispatches pages to a bounded worker pool and builds
//!   the document record
//! - **collect**: page outcomes and their reassembly into page order

pub mod collect;
pub mod coordinator;

// Re-exports for convenient access
pub use collect::{assemble_pages, PageOutcome};
pub use coordinator::{PageEvent, Pipeline, PipelineStage};
pub use crate::types::DocumentOutcome;
