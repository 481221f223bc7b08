//! Reflowable DOCX output.
//!
//! A minimal WordprocessingML package: styles for Title/Heading1/Heading2, a
//! 6×9 in section, and a TOC field that Word refreshes on open.

use std::io::{Cursor, Write};
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::layout::inline::{tokenize, InlineToken};
use crate::layout::paginator::copyright_lines;
use crate::layout::toc::TOC_HEADING;
use crate::models::{Document, UnitKey};
use crate::render::{write_atomically, RenderError, RenderSink};

type XmlWriter = Writer<Cursor<Vec<u8>>>;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Twentieths of a point per inch.
const TWIPS_PER_INCH: u32 = 1440;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/word/settings.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings" Target="settings.xml"/></Relationships>"#;

const SETTINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:updateFields w:val="true"/></w:settings>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Times New Roman" w:hAnsi="Times New Roman"/><w:sz w:val="22"/></w:rPr></w:rPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:pPr><w:spacing w:after="120"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:pPr><w:jc w:val="center"/><w:spacing w:before="2400" w:after="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="48"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="240"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="200" w:after="120"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:sz w:val="26"/></w:rPr></w:style></w:styles>"#;

#[derive(Default)]
pub struct DocxRenderer;

impl DocxRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn to_bytes(&self, document: &Document) -> Result<Vec<u8>, RenderError> {
        let body = document_xml(document)?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let parts: [(&str, &[u8]); 6] = [
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", PACKAGE_RELS.as_bytes()),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes()),
            ("word/document.xml", body.as_slice()),
            ("word/styles.xml", STYLES.as_bytes()),
            ("word/settings.xml", SETTINGS.as_bytes()),
        ];
        for (name, bytes) in parts {
            zip.start_file(name, options)?;
            zip.write_all(bytes)?;
        }
        Ok(zip.finish()?.into_inner())
    }
}

impl RenderSink for DocxRenderer {
    fn name(&self) -> &'static str {
        "DOCX"
    }

    fn extension(&self) -> &'static str {
        "_ebook.docx"
    }

    fn render(&self, document: &Document, path: &Path) -> Result<(), RenderError> {
        let bytes = self.to_bytes(document)?;
        write_atomically(path, &bytes)?;
        info!("DOCX written: {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

fn document_xml(document: &Document) -> Result<Vec<u8>, RenderError> {
    let mut w = Writer::new(Cursor::new(Vec::new()));
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut root = BytesStart::new("w:document");
    root.push_attribute(("xmlns:w", WORD_NS));
    root.push_attribute(("xmlns:r", REL_NS));
    w.write_event(Event::Start(root))?;
    w.write_event(Event::Start(BytesStart::new("w:body")))?;

    styled_paragraph(&mut w, Some("Title"), false, document.title())?;
    page_break(&mut w)?;

    for line in copyright_lines(document) {
        styled_paragraph(&mut w, None, true, &line)?;
    }
    page_break(&mut w)?;

    styled_paragraph(&mut w, Some("Heading1"), false, TOC_HEADING)?;
    toc_field(&mut w)?;

    for chapter in document.chapters() {
        page_break(&mut w)?;
        styled_paragraph(&mut w, Some("Heading1"), false, &chapter.title)?;
        if let Some(body) = document.body(UnitKey::chapter(chapter)) {
            body_paragraphs(&mut w, body)?;
        }

        for section in &chapter.sections {
            styled_paragraph(&mut w, Some("Heading2"), false, &section.title)?;
            if let Some(body) = document.body(UnitKey::section(section)) {
                body_paragraphs(&mut w, body)?;
            }
        }
    }

    section_properties(&mut w)?;
    w.write_event(Event::End(BytesEnd::new("w:body")))?;
    w.write_event(Event::End(BytesEnd::new("w:document")))?;
    Ok(w.into_inner().into_inner())
}

fn empty(w: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
    let mut elem = BytesStart::new(name);
    for attr in attrs {
        elem.push_attribute(*attr);
    }
    w.write_event(Event::Empty(elem))?;
    Ok(())
}

fn start(w: &mut XmlWriter, name: &str) -> Result<(), RenderError> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn end(w: &mut XmlWriter, name: &str) -> Result<(), RenderError> {
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn run(w: &mut XmlWriter, text: &str, bold: bool, italic: bool) -> Result<(), RenderError> {
    start(w, "w:r")?;
    if bold || italic {
        start(w, "w:rPr")?;
        if bold {
            empty(w, "w:b", &[])?;
        }
        if italic {
            empty(w, "w:i", &[])?;
        }
        end(w, "w:rPr")?;
    }
    let mut t = BytesStart::new("w:t");
    t.push_attribute(("xml:space", "preserve"));
    w.write_event(Event::Start(t))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    end(w, "w:t")?;
    end(w, "w:r")
}

fn styled_paragraph(
    w: &mut XmlWriter,
    style: Option<&str>,
    centered: bool,
    text: &str,
) -> Result<(), RenderError> {
    start(w, "w:p")?;
    if style.is_some() || centered {
        start(w, "w:pPr")?;
        if let Some(style) = style {
            empty(w, "w:pStyle", &[("w:val", style)])?;
        }
        if centered {
            empty(w, "w:jc", &[("w:val", "center")])?;
        }
        end(w, "w:pPr")?;
    }
    run(w, text, false, false)?;
    end(w, "w:p")
}

fn page_break(w: &mut XmlWriter) -> Result<(), RenderError> {
    start(w, "w:p")?;
    start(w, "w:r")?;
    empty(w, "w:br", &[("w:type", "page")])?;
    end(w, "w:r")?;
    end(w, "w:p")
}

/// Complex field the reader fills in; `w:dirty` asks for a refresh on open.
fn toc_field(w: &mut XmlWriter) -> Result<(), RenderError> {
    start(w, "w:p")?;

    start(w, "w:r")?;
    empty(w, "w:fldChar", &[("w:fldCharType", "begin"), ("w:dirty", "true")])?;
    end(w, "w:r")?;

    start(w, "w:r")?;
    let mut instr = BytesStart::new("w:instrText");
    instr.push_attribute(("xml:space", "preserve"));
    w.write_event(Event::Start(instr))?;
    w.write_event(Event::Text(BytesText::new(r#" TOC \o "1-2" \h \z \u "#)))?;
    end(w, "w:instrText")?;
    end(w, "w:r")?;

    start(w, "w:r")?;
    empty(w, "w:fldChar", &[("w:fldCharType", "separate")])?;
    end(w, "w:r")?;

    run(w, "Right-click to update the table of contents.", false, false)?;

    start(w, "w:r")?;
    empty(w, "w:fldChar", &[("w:fldCharType", "end")])?;
    end(w, "w:r")?;

    end(w, "w:p")
}

/// Body text as paragraphs of bold/italic runs. Line breaks inside a
/// paragraph collapse to spaces; the reader reflows anyway.
fn body_paragraphs(w: &mut XmlWriter, body: &str) -> Result<(), RenderError> {
    let mut bold = false;
    let mut italic = false;
    let mut open = false;

    for token in tokenize(body) {
        match token {
            InlineToken::Bold(on) => bold = on,
            InlineToken::Italic(on) => italic = on,
            InlineToken::Text(text) => {
                if !open {
                    start(w, "w:p")?;
                    open = true;
                }
                run(w, &text, bold, italic)?;
            }
            InlineToken::Break => {
                if open {
                    run(w, " ", bold, italic)?;
                }
            }
            InlineToken::ParagraphEnd => {
                if open {
                    end(w, "w:p")?;
                    open = false;
                }
            }
        }
    }
    if open {
        end(w, "w:p")?;
    }
    Ok(())
}

fn section_properties(w: &mut XmlWriter) -> Result<(), RenderError> {
    let width = (6 * TWIPS_PER_INCH).to_string();
    let height = (9 * TWIPS_PER_INCH).to_string();
    let margin = (TWIPS_PER_INCH * 3 / 4).to_string();

    start(w, "w:sectPr")?;
    empty(w, "w:pgSz", &[("w:w", width.as_str()), ("w:h", height.as_str())])?;
    empty(
        w,
        "w:pgMar",
        &[
            ("w:top", margin.as_str()),
            ("w:right", margin.as_str()),
            ("w:bottom", margin.as_str()),
            ("w:left", margin.as_str()),
            ("w:header", "720"),
            ("w:footer", "720"),
            ("w:gutter", "0"),
        ],
    )?;
    end(w, "w:sectPr")
}
