//! Fixed-page PDF output.
//!
//! Pages come from the layout engine already merged (front matter, TOC,
//! content). Text is set in the standard Type1 Times faces with WinAnsi
//! encoding, so nothing needs to be embedded.

use std::path::Path;

use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};
use tracing::info;

use crate::layout::{paginate, DrawOp, FontFace, PageGeometry, RenderedPage};
use crate::models::Document;
use crate::render::{write_atomically, RenderError, RenderSink};

pub struct PdfRenderer {
    geometry: PageGeometry,
}

impl PdfRenderer {
    pub fn new(geometry: PageGeometry) -> Self {
        Self { geometry }
    }

    pub fn to_bytes(&self, document: &Document) -> Result<Vec<u8>, RenderError> {
        let pages = paginate(document, &self.geometry)?;
        Ok(serialize(&pages, &self.geometry))
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new(PageGeometry::book_6x9())
    }
}

impl RenderSink for PdfRenderer {
    fn name(&self) -> &'static str {
        "PDF"
    }

    fn extension(&self) -> &'static str {
        "_6x9_print.pdf"
    }

    fn render(&self, document: &Document, path: &Path) -> Result<(), RenderError> {
        let bytes = self.to_bytes(document)?;
        write_atomically(path, &bytes)?;
        info!("PDF written: {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

/// Maps a char to its WinAnsi (CP1252) byte. Unmappable chars become `?`.
fn win_ansi(c: char) -> u8 {
    match c {
        '\u{20}'..='\u{7e}' => c as u8,
        '\u{a0}'..='\u{ff}' => c as u32 as u8,
        '€' => 0x80,
        '…' => 0x85,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '™' => 0x99,
        _ => b'?',
    }
}

pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi).collect()
}

fn serialize(pages: &[RenderedPage], geometry: &PageGeometry) -> Vec<u8> {
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let font_ids: Vec<(FontFace, Ref)> = FontFace::ALL.iter().map(|face| (*face, alloc())).collect();
    let page_ids: Vec<(Ref, Ref)> = pages.iter().map(|_| (alloc(), alloc())).collect();

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().map(|(page, _)| *page))
        .count(pages.len() as i32);

    for (face, id) in &font_ids {
        pdf.type1_font(*id)
            .base_font(Name(face.base_font().as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    for (page, (page_id, content_id)) in pages.iter().zip(&page_ids) {
        let mut content = Content::new();
        for op in &page.ops {
            let DrawOp::Text {
                x,
                y,
                face,
                size,
                text,
            } = op;
            let bytes = encode_win_ansi(text);
            content
                .begin_text()
                .set_font(Name(face.resource_name().as_bytes()), *size)
                .next_line(*x, geometry.height - *y)
                .show(Str(&bytes))
                .end_text();
        }
        let raw = content.finish();
        pdf.stream(*content_id, &raw);

        let mut pdf_page = pdf.page(*page_id);
        pdf_page
            .media_box(Rect::new(0.0, 0.0, geometry.width, geometry.height))
            .parent(pages_id)
            .contents(*content_id);
        let mut resources = pdf_page.resources();
        let mut fonts = resources.fonts();
        for (face, id) in &font_ids {
            fonts.pair(Name(face.resource_name().as_bytes()), *id);
        }
    }

    pdf.finish()
}
