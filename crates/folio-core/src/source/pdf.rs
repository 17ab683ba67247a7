//! PDF pages rendered through Poppler (`pdfinfo`, `pdftoppm`).

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::Arc;

use super::{title_from_path, DocumentSource, PageHandle};
use crate::error::SourceError;
use crate::raster::{Image, RawPixmap};

/// Resolution PDF user space is defined at.
const BASE_DPI: f32 = 72.0;

/// A PDF file on disk.
pub struct PdfDocument {
    path: Arc<PathBuf>,
    title: String,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        if !path.is_file() {
            return Err(SourceError::Open {
                path: path.to_path_buf(),
                message: "file not found".to_string(),
            });
        }
        Ok(Self {
            path: Arc::new(path.to_path_buf()),
            title: title_from_path(path),
        })
    }

    /// Replace the title derived from the file name.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Page count as reported by `pdfinfo`.
    pub fn page_count(&self) -> Result<usize, SourceError> {
        let output = run_tool(Command::new("pdfinfo").arg(self.path.as_os_str()), "pdfinfo")?;
        if !output.status.success() {
            return Err(SourceError::Open {
                path: self.path.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        parse_page_count(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            SourceError::Open {
                path: self.path.to_path_buf(),
                message: "pdfinfo reported no page count".to_string(),
            }
        })
    }
}

impl DocumentSource for PdfDocument {
    fn title(&self) -> &str {
        &self.title
    }

    fn pages(&self) -> Result<Vec<Box<dyn PageHandle>>, SourceError> {
        let count = self.page_count()?;
        tracing::debug!("{:?}: {} pages", self.path, count);
        Ok((1..=count)
            .map(|number| {
                Box::new(PdfPage {
                    path: self.path.clone(),
                    number,
                }) as Box<dyn PageHandle>
            })
            .collect())
    }
}

struct PdfPage {
    path: Arc<PathBuf>,
    /// One-based, as Poppler counts
    number: usize,
}

impl PageHandle for PdfPage {
    fn render(&self, scale: f32) -> Result<RawPixmap, SourceError> {
        let page = self.number.to_string();
        let output = run_tool(
            Command::new("pdftoppm")
                .arg("-r")
                .arg(render_dpi(scale).to_string())
                .args(["-f", page.as_str(), "-l", page.as_str()])
                .arg(self.path.as_os_str()),
            "pdftoppm",
        )?;

        let render_error = |message: String| SourceError::Render {
            page: self.number - 1,
            message,
        };
        if !output.status.success() {
            return Err(render_error(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        if output.stdout.is_empty() {
            return Err(render_error("pdftoppm produced no output".to_string()));
        }

        let image = Image::from_encoded(&output.stdout).map_err(|e| render_error(e.to_string()))?;
        Ok(image.into_pixmap())
    }
}

/// Whether the Poppler tools this source shells out to can be started.
pub fn renderer_available() -> bool {
    ["pdfinfo", "pdftoppm"].iter().all(|tool| {
        Command::new(tool)
            .arg("-v")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    })
}

fn render_dpi(scale: f32) -> u32 {
    (BASE_DPI * scale).round().max(1.0) as u32
}

fn run_tool(command: &mut Command, name: &str) -> Result<Output, SourceError> {
    command
        .stdin(Stdio::null())
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                SourceError::RendererUnavailable(format!("{name} not found on PATH"))
            }
            _ => SourceError::RendererUnavailable(format!("{name}: {e}")),
        })
}

/// Extract `Pages: N` from `pdfinfo` output.
fn parse_page_count(stdout: &str) -> Option<usize> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|rest| rest.trim().parse().ok())
}
