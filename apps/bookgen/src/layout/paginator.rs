//! Single forward pass over the document: front matter, then every chapter
//! and section in reading order. Produces the content pages and the page map.

use tracing::debug;

use crate::layout::font_metrics::FontFace;
use crate::layout::inline::tokenize;
use crate::layout::page::{mm, Align, Footer, PageGeometry, PageWriter, RenderedPage};
use crate::layout::page_map::{AddressableUnit, PageMap, PageMapBuilder, FRONT_MATTER_PAGES};
use crate::models::{Document, UnitKey};

const TITLE_SIZE: f32 = 24.0;
const COPYRIGHT_SIZE: f32 = 10.0;
const CHAPTER_SIZE: f32 = 16.0;
const SECTION_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 11.0;
pub(crate) const FOOTER_SIZE: f32 = 8.0;

pub const DISCLAIMER: &str =
    "No part of this publication may be reproduced without prior written permission.";

pub fn copyright_lines(document: &Document) -> [String; 3] {
    let front = document.front_matter();
    [
        format!("Copyright © {} by {}", front.year, front.copyright_holder),
        "All rights reserved.".to_string(),
        DISCLAIMER.to_string(),
    ]
}

/// Lays out the content sequence. Deterministic for a given document and
/// geometry.
pub fn layout(document: &Document, geometry: &PageGeometry) -> (Vec<RenderedPage>, PageMap) {
    let footer = Footer {
        unnumbered_pages: FRONT_MATTER_PAGES,
        size: FOOTER_SIZE,
    };
    let mut writer = PageWriter::new(*geometry, Some(footer));
    let mut map = PageMapBuilder::new();

    // Title page
    writer.add_page();
    map.record(AddressableUnit::Title, writer.page_no());
    writer.set_y(geometry.margin + geometry.height / 4.0);
    writer.write_block(document.title(), FontFace::Bold, TITLE_SIZE, mm(15.0), Align::Center);

    // Copyright page
    writer.add_page();
    map.record(AddressableUnit::Copyright, writer.page_no());
    writer.set_y(geometry.height * 0.4);
    for line in copyright_lines(document) {
        writer.write_block(&line, FontFace::Regular, COPYRIGHT_SIZE, mm(5.0), Align::Center);
    }

    for chapter in document.chapters() {
        writer.add_page();
        map.record(AddressableUnit::Chapter(chapter.ordinal), writer.page_no());
        writer.write_block(&chapter.title, FontFace::Bold, CHAPTER_SIZE, mm(10.0), Align::Left);
        writer.ln(mm(8.0));

        if let Some(body) = document.body(UnitKey::chapter(chapter)) {
            writer.write_flow(&tokenize(body), FontFace::Regular, BODY_SIZE, mm(7.0), mm(2.0));
        }

        for section in &chapter.sections {
            // The heading may still break the page; the recorded number is
            // where the cursor was when the section began.
            map.record(AddressableUnit::Section(section.ordinal), writer.page_no());
            writer.write_block(&section.title, FontFace::Bold, SECTION_SIZE, mm(8.0), Align::Left);
            writer.ln(mm(4.0));

            if let Some(body) = document.body(UnitKey::section(section)) {
                writer.write_flow(&tokenize(body), FontFace::Regular, BODY_SIZE, mm(7.0), mm(2.0));
            }
            writer.ln(mm(6.0));
        }
    }

    let pages = writer.finish();
    let map = map.freeze();
    debug!("Content layout: {} pages, {} addressable units", pages.len(), map.len());
    (pages, map)
}
