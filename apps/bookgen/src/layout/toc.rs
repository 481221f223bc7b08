//! Table-of-contents pass and the final merge.
//!
//! The TOC is rendered strictly after content layout, from its frozen page
//! map, then spliced in behind the two front-matter pages.

use tracing::debug;

use crate::layout::font_metrics::FontFace;
use crate::layout::page::{mm, wrap_plain, Align, PageGeometry, PageWriter, RenderedPage};
use crate::layout::page_map::{AddressableUnit, PageMap, FRONT_MATTER_PAGES};
use crate::layout::LayoutError;
use crate::models::Document;

pub const TOC_HEADING: &str = "Table of Contents";

const HEADING_SIZE: f32 = 16.0;
const CHAPTER_ROW_SIZE: f32 = 12.0;
const SECTION_ROW_SIZE: f32 = 11.0;

/// One TOC row before placement.
struct Row {
    text: String,
    label: String,
    face: FontFace,
    size: f32,
    line_height: f32,
    indent: f32,
}

fn rows(document: &Document, map: &PageMap) -> Vec<Vec<Row>> {
    document
        .chapters()
        .iter()
        .map(|chapter| {
            let mut block = vec![Row {
                text: format!("{}. {}", chapter.ordinal, chapter.title),
                label: map.display_label(AddressableUnit::Chapter(chapter.ordinal)),
                face: FontFace::Bold,
                size: CHAPTER_ROW_SIZE,
                line_height: mm(8.0),
                indent: 0.0,
            }];
            block.extend(chapter.sections.iter().map(|section| Row {
                text: format!("{} {}", section.ordinal, section.title),
                label: map.display_label(AddressableUnit::Section(section.ordinal)),
                face: FontFace::Regular,
                size: SECTION_ROW_SIZE,
                line_height: mm(7.0),
                indent: mm(5.0),
            }));
            block
        })
        .collect()
}

/// Renders the TOC page set. Units missing from `map` get a blank number.
pub fn render_toc(document: &Document, map: &PageMap, geometry: &PageGeometry) -> Vec<RenderedPage> {
    let mut writer = PageWriter::new(*geometry, None);
    writer.add_page();
    writer.write_block(TOC_HEADING, FontFace::Bold, HEADING_SIZE, mm(10.0), Align::Center);
    writer.ln(mm(10.0));

    let number_column = mm(15.0);
    for block in rows(document, map) {
        for row in block {
            let width = geometry.text_width() - row.indent - number_column;
            for (i, line) in wrap_plain(&row.text, row.face, row.size, width).iter().enumerate() {
                writer.place_line(line, row.size, row.line_height, row.indent, Align::Left);
                if i == 0 {
                    writer.place_right_label(&row.label, row.face, row.size, row.line_height);
                }
            }
        }
        writer.ln(mm(2.0));
    }

    let pages = writer.finish();
    debug!("TOC layout: {} pages", pages.len());
    pages
}

/// Final page order: title, copyright, TOC pages, then the rest of the
/// content. Both inputs are consumed whatever the outcome.
pub fn merge(
    content: Vec<RenderedPage>,
    toc: Vec<RenderedPage>,
) -> Result<Vec<RenderedPage>, LayoutError> {
    if content.len() < FRONT_MATTER_PAGES {
        return Err(LayoutError::MissingFrontMatter {
            pages: content.len(),
        });
    }

    let mut merged = Vec::with_capacity(content.len() + toc.len());
    let mut content = content.into_iter();
    merged.extend(content.by_ref().take(FRONT_MATTER_PAGES));
    merged.extend(toc);
    merged.extend(content);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::page::DrawOp;
    use crate::layout::page_map::PageMapBuilder;
    use crate::layout::paginator::layout;
    use crate::layout::paginator::tests::sample_document;

    fn marker(text: &str) -> RenderedPage {
        RenderedPage {
            ops: vec![DrawOp::Text {
                x: 0.0,
                y: 0.0,
                face: FontFace::Regular,
                size: 10.0,
                text: text.to_string(),
            }],
        }
    }

    #[test]
    fn test_merge_places_toc_after_front_matter() {
        let content = vec![marker("title"), marker("copyright"), marker("ch1"), marker("ch2")];
        let toc = vec![marker("toc1"), marker("toc2")];
        let merged = merge(content, toc).unwrap();
        let order: Vec<String> = merged.iter().map(RenderedPage::text).collect();
        assert_eq!(order, vec!["title", "copyright", "toc1", "toc2", "ch1", "ch2"]);
    }

    #[test]
    fn test_merge_rejects_short_content() {
        let err = merge(vec![marker("title")], vec![marker("toc")]).unwrap_err();
        assert!(matches!(err, LayoutError::MissingFrontMatter { pages: 1 }));
    }

    #[test]
    fn test_toc_lists_every_unit_with_display_numbers() {
        let doc = sample_document(2, 2, 1);
        let geometry = PageGeometry::book_6x9();
        let (_, map) = layout(&doc, &geometry);
        let toc = render_toc(&doc, &map, &geometry);

        let text: String = toc.iter().map(RenderedPage::text).collect::<Vec<_>>().join(" ");
        assert!(text.starts_with(TOC_HEADING));
        assert!(text.contains("1. Chapter Title 1"));
        assert!(text.contains("2.2 Section Title 2.2"));
        let chapter_one = map.display_label(AddressableUnit::Chapter(1));
        assert_eq!(chapter_one, "1");
        assert!(text.contains("1. Chapter Title 1 1"));
    }

    #[test]
    fn test_missing_entries_render_blank() {
        let doc = sample_document(1, 1, 1);
        let empty = PageMapBuilder::new().freeze();
        let toc = render_toc(&doc, &empty, &PageGeometry::book_6x9());
        let ops: Vec<String> = toc
            .iter()
            .flat_map(|p| p.ops.iter())
            .map(|DrawOp::Text { text, .. }| text.clone())
            .collect();
        assert_eq!(ops, vec![TOC_HEADING, "1. Chapter Title 1", "1.1 Section Title 1.1"]);
    }

    #[test]
    fn test_long_toc_paginates() {
        let doc = sample_document(30, 6, 0);
        let geometry = PageGeometry::book_6x9();
        let (_, map) = layout(&doc, &geometry);
        let toc = render_toc(&doc, &map, &geometry);
        assert!(toc.len() > 1);
        assert!(toc[0].text().starts_with(TOC_HEADING));
        let last = toc.last().unwrap().text();
        assert!(last.contains("30.6 Section Title 30.6"));
    }
}
