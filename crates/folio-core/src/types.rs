//! Core data types produced by the OCR pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The ordered OCR output for one document.
///
/// `pages[i]` holds the text of page `i`. Serialized with the field names
/// `title`, `content` and `chapters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    title: String,

    #[serde(rename = "content")]
    pages: Vec<String>,

    /// Reserved for chapter segmentation; always empty.
    #[serde(default)]
    chapters: Vec<serde_json::Value>,
}

impl DocumentRecord {
    pub fn new(title: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            title: title.into(),
            pages,
            chapters: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn chapters(&self) -> &[serde_json::Value] {
        &self.chapters
    }
}

/// Where in a page's lifecycle a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStage {
    Render,
    Convert,
    Recognize,
    Timeout,
    /// The worker task panicked
    Worker,
}

impl fmt::Display for PageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Render => "render",
            Self::Convert => "convert",
            Self::Recognize => "recognize",
            Self::Timeout => "timeout",
            Self::Worker => "worker",
        })
    }
}

/// A page whose text was replaced by the failure sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailure {
    pub page_index: usize,
    pub stage: PageStage,
    pub message: String,
}

/// Counters for one document run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages enumerated
    pub page_count: usize,

    /// Pages recognized successfully
    pub succeeded: usize,

    /// Pages replaced by the failure sentinel
    pub failed: usize,

    /// Wall-clock time for the run in seconds
    pub total_seconds: f64,
}

impl RunStats {
    /// Pages per second over the whole run.
    pub fn pages_per_second(&self) -> f64 {
        if self.total_seconds > 0.0 {
            self.page_count as f64 / self.total_seconds
        } else {
            0.0
        }
    }
}

/// Everything a document run produced.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub record: DocumentRecord,
    /// Sorted by page index
    pub failures: Vec<PageFailure>,
    pub stats: RunStats,
}

impl DocumentOutcome {
    /// Whether every page was recognized.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
