//! Document discovery: turn an input path into documents to process.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::images::has_extension;
use super::{title_from_path, DocumentSource, ImageSequence, PdfDocument};
use crate::config::ProcessingConfig;
use crate::error::SourceError;

/// How a discovered document is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    /// A single image file or a directory of page images
    Images,
}

/// A document found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDocument {
    pub path: PathBuf,
    pub kind: DocumentKind,
    title: String,
}

impl DiscoveredDocument {
    pub fn new(path: PathBuf, kind: DocumentKind) -> Self {
        let title = title_from_path(&path);
        Self { path, kind, title }
    }

    /// Title the output record will carry. Unique within one discovery.
    pub fn title(&self) -> &str {
        &self.title
    }
}

/// Finds documents under an input path.
pub struct DocumentDiscovery {
    config: ProcessingConfig,
}

impl DocumentDiscovery {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Discover documents at a path.
    ///
    /// A PDF or image file is one document. A directory yields every PDF
    /// beneath it, or, when it holds no PDFs but does hold page images,
    /// the directory itself as one image-sequence document.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredDocument> {
        if path.is_file() {
            return self
                .classify_file(path)
                .map(|kind| DiscoveredDocument::new(path.to_path_buf(), kind))
                .into_iter()
                .collect();
        }

        let mut pdfs: Vec<DiscoveredDocument> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.path().is_file() && is_pdf(entry.path()))
            .map(|entry| DiscoveredDocument::new(entry.path().to_path_buf(), DocumentKind::Pdf))
            .collect();

        if !pdfs.is_empty() {
            // Sort by path for deterministic ordering
            pdfs.sort_by(|a, b| a.path.cmp(&b.path));
            disambiguate_titles(&mut pdfs, path);
            return pdfs;
        }

        if self.has_page_images(path) {
            return vec![DiscoveredDocument::new(
                path.to_path_buf(),
                DocumentKind::Images,
            )];
        }

        Vec::new()
    }

    /// Open a discovered document as a page source.
    pub fn open(
        &self,
        document: &DiscoveredDocument,
    ) -> Result<Box<dyn DocumentSource>, SourceError> {
        let title = document.title();
        match document.kind {
            DocumentKind::Pdf => Ok(Box::new(
                PdfDocument::open(&document.path)?.with_title(title),
            )),
            DocumentKind::Images if document.path.is_file() => Ok(Box::new(
                ImageSequence::from_files(title, vec![document.path.clone()]),
            )),
            DocumentKind::Images => Ok(Box::new(
                ImageSequence::from_dir(&document.path, &self.config.supported_formats)?
                    .with_title(title),
            )),
        }
    }

    fn classify_file(&self, path: &Path) -> Option<DocumentKind> {
        if is_pdf(path) {
            Some(DocumentKind::Pdf)
        } else if self.is_supported_image(path) {
            Some(DocumentKind::Images)
        } else {
            None
        }
    }

    fn has_page_images(&self, dir: &Path) -> bool {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .any(|e| e.path().is_file() && self.is_supported_image(&e.path()))
            })
            .unwrap_or(false)
    }

    fn is_supported_image(&self, path: &Path) -> bool {
        has_extension(path, &self.config.supported_formats)
    }
}

/// Give documents that share a file stem distinct titles, so one record
/// cannot overwrite another. A clashing title becomes the path relative to
/// `root` with separators replaced by `_` (`nested/a.pdf` -> `nested_a`);
/// a numeric suffix settles anything still taken.
fn disambiguate_titles(documents: &mut [DiscoveredDocument], root: &Path) {
    let mut stems: HashMap<String, usize> = HashMap::new();
    for document in documents.iter() {
        *stems.entry(document.title.clone()).or_default() += 1;
    }

    let mut taken: HashSet<String> = HashSet::new();
    for document in documents.iter_mut() {
        if stems.get(&document.title).copied().unwrap_or(0) > 1 {
            let relative = document
                .path
                .strip_prefix(root)
                .unwrap_or(document.path.as_path())
                .with_extension("");
            let joined: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            if !joined.is_empty() {
                document.title = joined.join("_");
            }
        }

        let base = document.title.clone();
        let mut suffix = 2;
        while !taken.insert(document.title.clone()) {
            document.title = format!("{base}-{suffix}");
            suffix += 1;
        }
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
