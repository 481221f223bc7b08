//! Outline Parser: lenient line grammar plus strict post-parse validation.
//!
//! # Grammar (one entry per line)
//! - chapter: `<indent?>N. <title>`
//! - section: `<indent+>N.M. <title>` (indentation and the trailing period are required)
//!
//! Lines matching neither form are skipped with a warning. Orphan sections
//! (before any chapter), blank titles and repeated chapter titles are skipped
//! too. The parse only fails when no chapters, or no sections at all, survive.

use std::collections::HashSet;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{Chapter, Outline, Section, SectionOrdinal};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutlineError {
    #[error("outline text is empty")]
    Empty,

    #[error("no chapters recognised in outline text")]
    NoChapters,

    #[error("{chapters} chapters recognised but no sections under any of them")]
    NoSections { chapters: usize },
}

/// Holds the compiled line patterns.
pub struct OutlineParser {
    chapter_pattern: Regex,
    section_pattern: Regex,
}

impl Default for OutlineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutlineParser {
    pub fn new() -> Self {
        Self {
            chapter_pattern: Regex::new(r"^\s*(\d+)\.\s+(.+)$").expect("static chapter pattern"),
            section_pattern: Regex::new(r"^\s+(\d+\.\d+)\.\s+(.+)$")
                .expect("static section pattern"),
        }
    }

    pub fn parse(&self, raw: &str) -> Result<Outline, OutlineError> {
        if raw.trim().is_empty() {
            return Err(OutlineError::Empty);
        }

        let mut chapters: Vec<Chapter> = Vec::new();
        let mut seen_titles: HashSet<String> = HashSet::new();
        // False while lines belong to a skipped (duplicate) chapter.
        let mut in_open_chapter = false;

        for line in raw.lines() {
            // Leading whitespace is significant; trailing is not.
            let line = line.trim_end();

            if let Some(caps) = self.chapter_pattern.captures(line) {
                let title = caps[2].trim();
                if title.is_empty() {
                    warn!("Skipping chapter line with empty title: '{line}'");
                    continue;
                }
                if !seen_titles.insert(title.to_string()) {
                    warn!("Skipping repeated chapter title '{title}' and its sections");
                    in_open_chapter = false;
                    continue;
                }

                let ordinal = chapters.len() as u32 + 1;
                debug!("Found chapter {}. {} (source number {})", ordinal, title, &caps[1]);
                chapters.push(Chapter {
                    title: title.to_string(),
                    ordinal,
                    sections: Vec::new(),
                });
                in_open_chapter = true;
            } else if let Some(caps) = self.section_pattern.captures(line) {
                let title = caps[2].trim();
                let chapter = match chapters.last_mut() {
                    Some(chapter) if in_open_chapter => chapter,
                    _ => {
                        warn!("Skipping orphan section line: '{line}'");
                        continue;
                    }
                };
                if title.is_empty() {
                    warn!("Skipping section line with empty title: '{line}'");
                    continue;
                }

                let ordinal = SectionOrdinal {
                    chapter: chapter.ordinal,
                    section: chapter.sections.len() as u32 + 1,
                };
                debug!("  Found section {} {} (source number {})", ordinal, title, &caps[1]);
                chapter.sections.push(Section {
                    title: title.to_string(),
                    ordinal,
                });
            } else if !line.trim().is_empty() {
                warn!("Skipping non-matching outline line: '{line}'");
            }
        }

        let outline = Outline { chapters };
        validate(&outline)?;

        info!(
            "Parsed {} chapters and {} sections",
            outline.chapters.len(),
            outline.section_count()
        );
        Ok(outline)
    }
}

/// Structural checks run after the lenient pass.
fn validate(outline: &Outline) -> Result<(), OutlineError> {
    if outline.chapters.is_empty() {
        return Err(OutlineError::NoChapters);
    }
    if outline.section_count() == 0 {
        return Err(OutlineError::NoSections {
            chapters: outline.chapters.len(),
        });
    }

    let empty: Vec<&str> = outline
        .empty_chapters()
        .iter()
        .map(|c| c.title.as_str())
        .collect();
    if !empty.is_empty() {
        // Kept on purpose: a partial outline still makes a book.
        warn!("Chapters with no sections parsed: {}", empty.join(", "));
    }
    Ok(())
}

/// Convenience wrapper for one-off parses.
pub fn parse_outline(raw: &str) -> Result<Outline, OutlineError> {
    OutlineParser::new().parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1. Intro\n  1.1. Background\n  1.2. Scope\n2. Methods\n  2.1. Setup";

    #[test]
    fn test_parse_two_level_outline_in_order() {
        let outline = parse_outline(SAMPLE).unwrap();
        assert_eq!(outline.chapter_titles(), vec!["Intro", "Methods"]);
        assert_eq!(outline.chapters[0].section_titles(), vec!["Background", "Scope"]);
        assert_eq!(outline.chapters[1].section_titles(), vec!["Setup"]);
    }

    #[test]
    fn test_ordinals_are_positional_and_increasing() {
        let outline = parse_outline(SAMPLE).unwrap();
        assert_eq!(outline.chapters[0].ordinal, 1);
        assert_eq!(outline.chapters[1].ordinal, 2);
        let ordinals: Vec<String> = outline.chapters[0]
            .sections
            .iter()
            .map(|s| s.ordinal.to_string())
            .collect();
        assert_eq!(ordinals, vec!["1.1", "1.2"]);
        assert_eq!(outline.chapters[1].sections[0].ordinal.to_string(), "2.1");
    }

    #[test]
    fn test_orphan_section_is_dropped() {
        let raw = "  0.1. Stray\n1. Intro\n  1.1. Background";
        let outline = parse_outline(raw).unwrap();
        assert_eq!(outline.chapter_titles(), vec!["Intro"]);
        assert_eq!(outline.chapters[0].section_titles(), vec!["Background"]);
    }

    #[test]
    fn test_blank_chapter_title_does_not_open_chapter() {
        let raw = "1. Intro\n  1.1. Background\n3.  \n  3.1. Lost";
        let outline = parse_outline(raw).unwrap();
        assert_eq!(outline.chapters.len(), 1);
        // The section after the blank chapter lands under the last real chapter.
        assert_eq!(outline.chapters[0].section_titles(), vec!["Background", "Lost"]);
    }

    #[test]
    fn test_no_chapters_fails() {
        let raw = "Here is your table of contents:\n  1.1. Background";
        assert_eq!(parse_outline(raw), Err(OutlineError::NoChapters));
    }

    #[test]
    fn test_empty_text_fails() {
        assert_eq!(parse_outline("   \n  "), Err(OutlineError::Empty));
    }

    #[test]
    fn test_chapters_without_any_sections_fail() {
        let raw = "1. Intro\n2. Methods";
        assert_eq!(
            parse_outline(raw),
            Err(OutlineError::NoSections { chapters: 2 })
        );
    }

    #[test]
    fn test_some_empty_chapters_are_kept() {
        let raw = "1. Intro\n  1.1. Background\n2. Interlude\n3. Methods\n  3.1. Setup";
        let outline = parse_outline(raw).unwrap();
        assert_eq!(outline.chapters.len(), 3);
        assert_eq!(outline.empty_chapters().len(), 1);
        assert_eq!(outline.chapters[1].title, "Interlude");
    }

    #[test]
    fn test_section_requires_indentation_and_trailing_period() {
        // Unindented `1.1.` is neither form; `  1.2 Missing` lacks the period.
        let raw = "1. Intro\n1.1. Flush left\n  1.2 Missing period\n  1.3. Kept";
        let outline = parse_outline(raw).unwrap();
        assert_eq!(outline.chapters[0].section_titles(), vec!["Kept"]);
    }

    #[test]
    fn test_noise_lines_and_markdown_are_skipped() {
        let raw = "**Table of Contents**\n\n1. Intro\n  1.1. Background\n---\n2. End\n  2.1. Summary\n";
        let outline = parse_outline(raw).unwrap();
        assert_eq!(outline.chapter_titles(), vec!["Intro", "End"]);
    }

    #[test]
    fn test_indented_chapter_line_is_a_chapter() {
        let raw = "  1. Intro\n    1.1. Background";
        let outline = parse_outline(raw).unwrap();
        assert_eq!(outline.chapter_titles(), vec!["Intro"]);
        assert_eq!(outline.section_count(), 1);
    }

    #[test]
    fn test_repeated_chapter_title_is_skipped_with_its_sections() {
        let raw = "1. Intro\n  1.1. A\n2. Intro\n  2.1. B\n3. End\n  3.1. C";
        let outline = parse_outline(raw).unwrap();
        assert_eq!(outline.chapter_titles(), vec!["Intro", "End"]);
        assert_eq!(outline.chapters[0].section_titles(), vec!["A"]);
        assert_eq!(outline.chapters[1].ordinal, 2);
        assert_eq!(outline.chapters[1].sections[0].ordinal.to_string(), "2.1");
    }

    #[test]
    fn test_titles_are_trimmed_and_crlf_tolerated() {
        let raw = "1. Intro   \r\n  1.1.   Background  \r\n";
        let outline = parse_outline(raw).unwrap();
        assert_eq!(outline.chapters[0].title, "Intro");
        assert_eq!(outline.chapters[0].sections[0].title, "Background");
    }
}
