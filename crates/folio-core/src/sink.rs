//! Result sinks that persist finished document records.
//!
//! [`JsonDirectorySink`] writes one file per document; [`StreamSink`] writes
//! records to any writer in JSON or JSON Lines format.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::types::DocumentRecord;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// One JSON object per record
    #[serde(rename = "json")]
    Json,
    /// One compact JSON object per line (newline-delimited JSON)
    #[serde(rename = "jsonl", alias = "jsonlines", alias = "ndjson")]
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Persists completed records. Called once per document.
pub trait ResultSink: Send {
    fn store(&mut self, record: &DocumentRecord) -> Result<(), PipelineError>;
}

/// Writes `<dir>/<title>.json`, UTF-8 with non-ASCII text kept verbatim.
///
/// Files are written to a temporary name and renamed into place, so a
/// failed write never leaves a partial record behind.
pub struct JsonDirectorySink {
    dir: PathBuf,
    pretty: bool,
    written: Vec<PathBuf>,
}

impl JsonDirectorySink {
    pub fn new(dir: impl Into<PathBuf>, pretty: bool) -> Self {
        Self {
            dir: dir.into(),
            pretty,
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Destination file for a record title.
    pub fn path_for(&self, title: &str) -> PathBuf {
        let safe: String = title
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    /// Files written so far, in store order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write_record(&self, record: &DocumentRecord, target: &Path) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let bytes = if self.pretty {
            serde_json::to_vec_pretty(record)
        } else {
            serde_json::to_vec(record)
        }
        .map_err(io::Error::other)?;

        let mut tmp_name = target.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let result = std::fs::write(&tmp, &bytes).and_then(|_| std::fs::rename(&tmp, target));
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        result
    }
}

impl ResultSink for JsonDirectorySink {
    fn store(&mut self, record: &DocumentRecord) -> Result<(), PipelineError> {
        let target = self.path_for(record.title());
        if self.written.contains(&target) {
            tracing::warn!("Overwriting {:?}, written earlier in this run", target);
        }
        self.write_record(record, &target)
            .map_err(|e| PipelineError::Sink {
                title: record.title().to_string(),
                message: format!("{}: {e}", target.display()),
            })?;
        tracing::debug!("Wrote {:?}", target);
        self.written.push(target);
        Ok(())
    }
}

/// A sink that serializes records to a writer (stdout, a file, a buffer).
pub struct StreamSink<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> StreamSink<W> {
    /// `pretty` only affects the JSON format; JSONL is always compact.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write a single record.
    pub fn write(&mut self, record: &DocumentRecord) -> io::Result<()> {
        match self.format {
            OutputFormat::Json if self.pretty => {
                serde_json::to_writer_pretty(&mut self.writer, record).map_err(io::Error::other)?;
            }
            OutputFormat::Json | OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
            }
        }
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    /// Get the number of records written.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Consume the sink and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ResultSink for StreamSink<W> {
    fn store(&mut self, record: &DocumentRecord) -> Result<(), PipelineError> {
        self.write(record)
            .and_then(|_| self.writer.flush())
            .map_err(|e| PipelineError::Sink {
                title: record.title().to_string(),
                message: e.to_string(),
            })
    }
}
