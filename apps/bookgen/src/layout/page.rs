//! Page geometry, draw operations and the page writer shared by the content
//! and table-of-contents passes.
//!
//! Coordinates are PDF points measured from the TOP-LEFT corner; the PDF
//! renderer flips the y axis when it serialises.

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::{get_metrics, text_width, FontFace};
use crate::layout::inline::InlineToken;

/// Millimetres → points.
pub fn mm(value: f32) -> f32 {
    value * 72.0 / 25.4
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    /// 6 × 9 in trim with 0.75 in margins.
    pub fn book_6x9() -> Self {
        Self {
            width: mm(152.4),
            height: mm(228.6),
            margin: mm(19.05),
        }
    }

    pub fn text_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Lowest y a line may reach before an automatic page break.
    pub fn break_limit(&self) -> f32 {
        self.height - self.margin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawOp {
    Text {
        x: f32,
        /// Baseline, from the top edge.
        y: f32,
        face: FontFace,
        size: f32,
        text: String,
    },
}

/// One laid-out page: an ordered list of draw operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderedPage {
    pub ops: Vec<DrawOp>,
}

impl RenderedPage {
    /// Concatenated text of the page, in draw order. Handy for assertions.
    pub fn text(&self) -> String {
        self.ops
            .iter()
            .map(|op| match op {
                DrawOp::Text { text, .. } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// A run of text in one face, positioned relative to the line start.
#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    face: FontFace,
    text: String,
}

/// Words carry the styled fragments they were built from, so a word such as
/// `**bold**,` keeps its trailing comma in the regular face.
#[derive(Debug, Clone)]
struct Word {
    space_before: bool,
    fragments: Vec<Fragment>,
}

#[derive(Debug, Clone)]
enum Item {
    Word(Word),
    Break,
    ParagraphEnd,
}

/// A finished line ready to be placed.
#[derive(Debug, Clone, Default)]
pub struct Line {
    fragments: Vec<Fragment>,
    width: f32,
}

impl Line {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Output of the wrapper: lines plus block markers.
#[derive(Debug, Clone)]
pub enum WrappedItem {
    Line(Line),
    ParagraphEnd,
}

fn to_items(tokens: &[InlineToken], base: FontFace) -> Vec<Item> {
    let mut items = Vec::new();
    let mut bold = base.is_bold();
    let mut italic = base.is_italic();
    let mut word: Option<Word> = None;
    let mut pending_space = false;

    fn finish(items: &mut Vec<Item>, word: &mut Option<Word>) {
        if let Some(w) = word.take() {
            items.push(Item::Word(w));
        }
    }

    for token in tokens {
        match token {
            InlineToken::Bold(on) => bold = *on || base.is_bold(),
            InlineToken::Italic(on) => italic = *on || base.is_italic(),
            InlineToken::Break => {
                finish(&mut items, &mut word);
                pending_space = false;
                items.push(Item::Break);
            }
            InlineToken::ParagraphEnd => {
                finish(&mut items, &mut word);
                pending_space = false;
                items.push(Item::ParagraphEnd);
            }
            InlineToken::Text(text) => {
                let face = FontFace::from_style(bold, italic);
                for c in text.chars() {
                    if c.is_whitespace() {
                        finish(&mut items, &mut word);
                        pending_space = true;
                        continue;
                    }
                    let w = word.get_or_insert_with(|| Word {
                        space_before: std::mem::take(&mut pending_space),
                        fragments: Vec::new(),
                    });
                    match w.fragments.last_mut() {
                        Some(f) if f.face == face => f.text.push(c),
                        _ => w.fragments.push(Fragment {
                            face,
                            text: c.to_string(),
                        }),
                    }
                }
            }
        }
    }
    finish(&mut items, &mut word);
    items
}

fn word_width(word: &Word, size: f32) -> f32 {
    word.fragments
        .iter()
        .map(|f| text_width(f.face, &f.text, size))
        .sum()
}

/// Greedy word wrap across style runs. A word wider than `max_width` gets a
/// line of its own and overflows.
pub fn wrap(tokens: &[InlineToken], base: FontFace, size: f32, max_width: f32) -> Vec<WrappedItem> {
    let mut out = Vec::new();
    let mut line = Line::default();

    for item in to_items(tokens, base) {
        match item {
            Item::Word(word) => {
                let w = word_width(&word, size);
                let first_face = word.fragments.first().map(|f| f.face).unwrap_or(base);
                let space_w = if line.is_empty() || !word.space_before {
                    0.0
                } else {
                    get_metrics(first_face).space_width * size
                };

                if !line.is_empty() && line.width + space_w + w > max_width {
                    out.push(WrappedItem::Line(std::mem::take(&mut line)));
                    line.width = w;
                    line.fragments = word.fragments;
                } else {
                    if space_w > 0.0 {
                        append(&mut line, first_face, " ");
                    }
                    for f in word.fragments {
                        append(&mut line, f.face, &f.text);
                    }
                    line.width += space_w + w;
                }
            }
            Item::Break => out.push(WrappedItem::Line(std::mem::take(&mut line))),
            Item::ParagraphEnd => {
                if !line.is_empty() {
                    out.push(WrappedItem::Line(std::mem::take(&mut line)));
                }
                out.push(WrappedItem::ParagraphEnd);
            }
        }
    }
    if !line.is_empty() {
        out.push(WrappedItem::Line(line));
    }
    out
}

fn append(line: &mut Line, face: FontFace, text: &str) {
    match line.fragments.last_mut() {
        Some(f) if f.face == face => f.text.push_str(text),
        _ => line.fragments.push(Fragment {
            face,
            text: text.to_string(),
        }),
    }
}

/// Wraps plain text in one face and returns just the lines.
pub fn wrap_plain(text: &str, face: FontFace, size: f32, max_width: f32) -> Vec<Line> {
    wrap(&crate::layout::inline::plain(text), face, size, max_width)
        .into_iter()
        .filter_map(|item| match item {
            WrappedItem::Line(line) => Some(line),
            WrappedItem::ParagraphEnd => None,
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Page writer
// ────────────────────────────────────────────────────────────────────────────

/// Optional running page number drawn at the foot of each new page.
#[derive(Debug, Clone, Copy)]
pub struct Footer {
    /// Pages up to and including this physical number stay unnumbered.
    pub unnumbered_pages: usize,
    pub size: f32,
}

/// Cursor over a growing page sequence. Deterministic: identical calls give
/// identical pages.
pub struct PageWriter {
    geometry: PageGeometry,
    footer: Option<Footer>,
    pages: Vec<RenderedPage>,
    y: f32,
}

impl PageWriter {
    pub fn new(geometry: PageGeometry, footer: Option<Footer>) -> Self {
        Self {
            geometry,
            footer,
            pages: Vec::new(),
            y: geometry.margin,
        }
    }

    /// Current 1-based physical page number (0 before the first page).
    pub fn page_no(&self) -> usize {
        self.pages.len()
    }

    pub fn set_y(&mut self, y: f32) {
        self.y = y;
    }

    pub fn add_page(&mut self) {
        self.pages.push(RenderedPage::default());
        self.y = self.geometry.margin;

        let number = self.pages.len();
        if let Some(footer) = self.footer {
            if number > footer.unnumbered_pages {
                let label = (number - footer.unnumbered_pages).to_string();
                let width = text_width(FontFace::Regular, &label, footer.size);
                let op = DrawOp::Text {
                    x: (self.geometry.width - width) / 2.0,
                    y: self.geometry.height - mm(15.0),
                    face: FontFace::Regular,
                    size: footer.size,
                    text: label,
                };
                self.push_op(op);
            }
        }
    }

    /// Vertical gap. Never breaks the page by itself.
    pub fn ln(&mut self, height: f32) {
        self.y += height;
    }

    /// Breaks the page if a line of `height` would cross the bottom margin.
    fn ensure_room(&mut self, height: f32) {
        if self.pages.is_empty() || self.y + height > self.geometry.break_limit() {
            self.add_page();
        }
    }

    fn push_op(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    /// Places one line at the cursor and advances by `height`.
    pub fn place_line(&mut self, line: &Line, size: f32, height: f32, indent: f32, align: Align) {
        self.ensure_room(height);
        let x0 = match align {
            Align::Left => self.geometry.margin + indent,
            Align::Center => {
                self.geometry.margin + indent + (self.geometry.text_width() - indent - line.width) / 2.0
            }
        };
        let baseline = self.y + (height + size * 0.7) / 2.0;

        let mut x = x0;
        for fragment in &line.fragments {
            let op = DrawOp::Text {
                x,
                y: baseline,
                face: fragment.face,
                size,
                text: fragment.text.clone(),
            };
            x += text_width(fragment.face, &fragment.text, size);
            self.push_op(op);
        }
        self.y += height;
    }

    /// Places `label` right-aligned on the line that was just placed.
    pub fn place_right_label(&mut self, label: &str, face: FontFace, size: f32, height: f32) {
        if label.is_empty() {
            return;
        }
        let width = text_width(face, label, size);
        let line_top = self.y - height;
        let op = DrawOp::Text {
            x: self.geometry.width - self.geometry.margin - width,
            y: line_top + (height + size * 0.7) / 2.0,
            face,
            size,
            text: label.to_string(),
        };
        self.push_op(op);
    }

    /// Wraps and places a token stream. Paragraph ends add `paragraph_gap`.
    pub fn write_flow(
        &mut self,
        tokens: &[InlineToken],
        base: FontFace,
        size: f32,
        line_height: f32,
        paragraph_gap: f32,
    ) {
        let width = self.geometry.text_width();
        for item in wrap(tokens, base, size, width) {
            match item {
                WrappedItem::Line(line) => self.place_line(&line, size, line_height, 0.0, Align::Left),
                WrappedItem::ParagraphEnd => self.ln(paragraph_gap),
            }
        }
    }

    /// Wraps and places plain text as a block (multi-line cell).
    pub fn write_block(&mut self, text: &str, face: FontFace, size: f32, line_height: f32, align: Align) {
        let width = self.geometry.text_width();
        for line in wrap_plain(text, face, size, width) {
            self.place_line(&line, size, line_height, 0.0, align);
        }
    }

    pub fn finish(self) -> Vec<RenderedPage> {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::inline::tokenize;

    fn line_texts(items: &[WrappedItem]) -> Vec<String> {
        items
            .iter()
            .filter_map(|i| match i {
                WrappedItem::Line(l) => Some(l.fragments.iter().map(|f| f.text.as_str()).collect()),
                WrappedItem::ParagraphEnd => None,
            })
            .collect()
    }

    #[test]
    fn test_geometry_is_six_by_nine() {
        let g = PageGeometry::book_6x9();
        assert!((g.width - 432.0).abs() < 0.01);
        assert!((g.height - 648.0).abs() < 0.01);
        assert!((g.margin - 54.0).abs() < 0.01);
    }

    #[test]
    fn test_wrap_keeps_short_text_on_one_line() {
        let items = wrap(&tokenize("Hello world"), FontFace::Regular, 11.0, 300.0);
        assert_eq!(line_texts(&items), vec!["Hello world".to_string()]);
    }

    #[test]
    fn test_wrap_breaks_long_text() {
        let text = "word ".repeat(100);
        let items = wrap(&tokenize(&text), FontFace::Regular, 11.0, 100.0);
        let lines = line_texts(&items);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(!line.starts_with(' '), "no leading space after wrap: {line:?}");
        }
    }

    #[test]
    fn test_wrap_keeps_style_fragments() {
        let items = wrap(&tokenize("a **b**, c"), FontFace::Regular, 11.0, 300.0);
        let WrappedItem::Line(line) = &items[0] else {
            panic!("expected a line");
        };
        let faces: Vec<FontFace> = line.fragments.iter().map(|f| f.face).collect();
        assert_eq!(faces, vec![FontFace::Regular, FontFace::Bold, FontFace::Regular]);
        let text: String = line.fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(text, "a b, c");
    }

    #[test]
    fn test_oversized_word_gets_its_own_line() {
        let long = "x".repeat(200);
        let items = wrap(&tokenize(&format!("a {long} b")), FontFace::Regular, 11.0, 100.0);
        assert_eq!(line_texts(&items), vec!["a".to_string(), long, "b".to_string()]);
    }

    #[test]
    fn test_writer_breaks_pages_at_bottom_margin() {
        let mut writer = PageWriter::new(PageGeometry::book_6x9(), None);
        writer.add_page();
        let text = "Lorem ipsum dolor sit amet. ".repeat(400);
        writer.write_flow(&tokenize(&text), FontFace::Regular, 11.0, mm(7.0), mm(2.0));
        assert!(writer.page_no() > 1);
        let limit = PageGeometry::book_6x9().break_limit();
        for page in writer.finish() {
            for DrawOp::Text { y, .. } in &page.ops {
                assert!(*y <= limit);
            }
        }
    }

    #[test]
    fn test_footer_numbers_skip_front_pages() {
        let footer = Footer {
            unnumbered_pages: 2,
            size: 8.0,
        };
        let mut writer = PageWriter::new(PageGeometry::book_6x9(), Some(footer));
        writer.add_page();
        writer.add_page();
        writer.add_page();
        let pages = writer.finish();
        assert!(pages[0].ops.is_empty());
        assert!(pages[1].ops.is_empty());
        assert_eq!(pages[2].text(), "1");
    }
}
