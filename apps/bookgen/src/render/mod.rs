// Render sinks: turn a finished Document into an output file.
// Each sink owns its whole format; a failure in one never affects the other.

pub mod docx;
pub mod pdf;

use std::io::Write;
use std::path::Path;

use thiserror::Error;

use crate::layout::LayoutError;
use crate::models::Document;

pub use docx::DocxRenderer;
pub use pdf::PdfRenderer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Package error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Could not move output into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub trait RenderSink: Send + Sync {
    /// Human-readable format name for logs.
    fn name(&self) -> &'static str;

    /// Suffix appended to the book's base file name, extension included.
    fn extension(&self) -> &'static str;

    fn render(&self, document: &Document, path: &Path) -> Result<(), RenderError>;
}

/// Writes `bytes` next to `path` and renames over it, so a failed render
/// never leaves a truncated file behind.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomically_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.bin");
        write_atomically(&target, b"hello").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"hello");
    }

    #[test]
    fn test_write_atomically_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        std::fs::write(&target, b"old contents").unwrap();
        write_atomically(&target, b"new").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
