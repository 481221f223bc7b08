//! Inline token stream for section bodies.
//!
//! Only bold, italic, line breaks and paragraph boundaries survive; every
//! other markdown construct is flattened to its text.

use pulldown_cmark::{Event, Parser, Tag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineToken {
    Text(String),
    Bold(bool),
    Italic(bool),
    /// Soft or hard line break.
    Break,
    ParagraphEnd,
}

/// Tokenizes markdown-ish body text.
pub fn tokenize(body: &str) -> Vec<InlineToken> {
    let mut tokens = Vec::new();

    for event in Parser::new(body) {
        match event {
            Event::Text(text) | Event::Code(text) => push_text(&mut tokens, &text),
            Event::Start(Tag::Strong) => tokens.push(InlineToken::Bold(true)),
            Event::End(Tag::Strong) => tokens.push(InlineToken::Bold(false)),
            Event::Start(Tag::Emphasis) => tokens.push(InlineToken::Italic(true)),
            Event::End(Tag::Emphasis) => tokens.push(InlineToken::Italic(false)),
            Event::SoftBreak | Event::HardBreak => tokens.push(InlineToken::Break),
            Event::End(Tag::Paragraph)
            | Event::End(Tag::Heading(..))
            | Event::End(Tag::Item)
            | Event::End(Tag::CodeBlock(_)) => tokens.push(InlineToken::ParagraphEnd),
            _ => {}
        }
    }

    tokens
}

/// Plain text with `\n` as explicit breaks. Used for headings and front matter.
pub fn plain(text: &str) -> Vec<InlineToken> {
    let mut tokens = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            tokens.push(InlineToken::Break);
        }
        if !line.is_empty() {
            tokens.push(InlineToken::Text(line.to_string()));
        }
    }
    tokens
}

/// Merges adjacent text events (pulldown splits text around some punctuation).
fn push_text(tokens: &mut Vec<InlineToken>, text: &str) {
    if let Some(InlineToken::Text(last)) = tokens.last_mut() {
        last.push_str(text);
    } else {
        tokens.push(InlineToken::Text(text.to_string()));
    }
}
