// Layout: deterministic pagination of a Document into fixed-size pages.
// Two passes: paginator::layout produces content pages plus the page map,
// then toc::render_toc reads the frozen map and toc::merge splices the TOC in.

pub mod font_metrics;
pub mod inline;
pub mod page;
pub mod page_map;
pub mod paginator;
pub mod toc;

use thiserror::Error;

pub use font_metrics::FontFace;
pub use page::{DrawOp, PageGeometry, RenderedPage};
pub use paginator::layout;
pub use toc::{merge, render_toc};

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("content has {pages} page(s); title and copyright pages are required before the TOC")]
    MissingFrontMatter { pages: usize },
}

/// Runs both passes and the merge: the full page sequence for a document.
pub fn paginate(
    document: &crate::models::Document,
    geometry: &PageGeometry,
) -> Result<Vec<RenderedPage>, LayoutError> {
    let (content, map) = layout(document, geometry);
    let toc = render_toc(document, &map, geometry);
    merge(content, toc)
}
