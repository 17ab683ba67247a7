//! Document sources: ordered page handles that render themselves to pixels.
//!
//! - **pdf**: PDF documents rendered through Poppler's command-line tools
//! - **images**: a sequence of scanned page images
//! - **discovery**: classify input paths into documents

pub mod discovery;
pub mod images;
pub mod pdf;

pub use discovery::{DiscoveredDocument, DocumentDiscovery, DocumentKind};
pub use images::ImageSequence;
pub use pdf::PdfDocument;

use std::path::Path;

use crate::error::SourceError;
use crate::raster::RawPixmap;

/// One page of a document. Rendering is blocking and may run on any thread.
pub trait PageHandle: Send + Sync {
    /// Render at `scale` (1.0 = the source's native resolution).
    fn render(&self, scale: f32) -> Result<RawPixmap, SourceError>;
}

/// A paginated document.
pub trait DocumentSource: Send + Sync {
    /// Base name used for the output record.
    fn title(&self) -> &str;

    /// Page handles in reading order.
    fn pages(&self) -> Result<Vec<Box<dyn PageHandle>>, SourceError>;
}

/// A page scheduled for processing. `page_index` is dense from zero and
/// doubles as the correlation token and the reorder key.
pub struct PageWorkUnit {
    pub page_index: usize,
    pub handle: Box<dyn PageHandle>,
}

impl PageWorkUnit {
    /// Number handles in the order the source returned them.
    pub fn from_handles(handles: Vec<Box<dyn PageHandle>>) -> Vec<Self> {
        handles
            .into_iter()
            .enumerate()
            .map(|(page_index, handle)| Self { page_index, handle })
            .collect()
    }
}

/// Title for a document at `path`: its file stem, or the directory name.
pub fn title_from_path(path: &Path) -> String {
    let name = if path.is_dir() {
        path.file_name()
    } else {
        path.file_stem()
    };
    name.and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("document")
        .to_string()
}
