//! Scanned page images treated as one document.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use super::{title_from_path, DocumentSource, PageHandle};
use crate::error::SourceError;
use crate::raster::{Image, RawPixmap};

/// An ordered list of page image files.
pub struct ImageSequence {
    title: String,
    files: Vec<PathBuf>,
}

impl ImageSequence {
    /// Pages in the given order.
    pub fn from_files(title: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            title: title.into(),
            files,
        }
    }

    /// Every supported image directly inside `dir`, in natural name order
    /// (`page2` before `page10`).
    pub fn from_dir(dir: &Path, supported_formats: &[String]) -> Result<Self, SourceError> {
        let open_error = |message: String| SourceError::Open {
            path: dir.to_path_buf(),
            message,
        };
        let entries = std::fs::read_dir(dir).map_err(|e| open_error(e.to_string()))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_extension(path, supported_formats))
            .collect();
        files.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));

        Ok(Self::from_files(title_from_path(dir), files))
    }

    /// Replace the title derived from the folder name.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl DocumentSource for ImageSequence {
    fn title(&self) -> &str {
        &self.title
    }

    fn pages(&self) -> Result<Vec<Box<dyn PageHandle>>, SourceError> {
        Ok(self
            .files
            .iter()
            .enumerate()
            .map(|(index, path)| {
                Box::new(ImagePage {
                    path: path.clone(),
                    index,
                }) as Box<dyn PageHandle>
            })
            .collect())
    }
}

struct ImagePage {
    path: PathBuf,
    index: usize,
}

impl PageHandle for ImagePage {
    fn render(&self, scale: f32) -> Result<RawPixmap, SourceError> {
        let render_error = |message: String| SourceError::Render {
            page: self.index,
            message: format!("{}: {message}", self.path.display()),
        };
        let bytes = std::fs::read(&self.path).map_err(|e| render_error(e.to_string()))?;
        let image = Image::from_encoded(&bytes).map_err(|e| render_error(e.to_string()))?;
        let scaled = image.scaled(scale).map_err(|e| render_error(e.to_string()))?;
        Ok(scaled.into_pixmap())
    }
}

pub(crate) fn has_extension(path: &Path, formats: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| formats.iter().any(|fmt| fmt.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Compare names treating digit runs as numbers.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let left = take_number(&mut a);
                let right = take_number(&mut b);
                let ord = left
                    .trim_start_matches('0')
                    .len()
                    .cmp(&right.trim_start_matches('0').len())
                    .then_with(|| left.trim_start_matches('0').cmp(right.trim_start_matches('0')))
                    .then_with(|| left.len().cmp(&right.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}
