//! Content Assembler: walks the parsed outline and fills in section bodies.
//!
//! Sections are generated strictly one after another in reading order.
//! A recoverable failure becomes placeholder text and the walk continues;
//! a fatal failure stops the walk and is returned to the caller.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::WordRange;
use crate::generation::generator::{GenerationError, Generator};
use crate::models::{Chapter, Document, FrontMatter, Outline, Section, UnitKey};

/// Stand-in body for a section whose generation was exhausted.
pub fn placeholder_text(section_title: &str) -> String {
    format!("(Content generation failed: {section_title})")
}

/// Informational length verdict. Never changes content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WordCountVerdict {
    WithinRange,
    Short,
    Long,
}

/// Short below 80% of the minimum, long above 120% of the maximum.
pub fn check_word_count(text: &str, target: WordRange) -> (usize, WordCountVerdict) {
    let words = text.split_whitespace().count();
    let verdict = if (words as f64) < target.min as f64 * 0.8 {
        WordCountVerdict::Short
    } else if (words as f64) > target.max as f64 * 1.2 {
        WordCountVerdict::Long
    } else {
        WordCountVerdict::WithinRange
    };
    (words, verdict)
}

/// Counts for the run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub sections_generated: usize,
    pub placeholders: usize,
    pub chapters_skipped: usize,
}

pub struct ContentAssembler<'a> {
    generator: &'a Generator,
    word_target: WordRange,
}

impl<'a> ContentAssembler<'a> {
    pub fn new(generator: &'a Generator, word_target: WordRange) -> Self {
        Self {
            generator,
            word_target,
        }
    }

    /// Produces the finished document. `request_for` builds the opaque
    /// request payload for one section.
    pub async fn assemble<F>(
        &self,
        title: String,
        front_matter: FrontMatter,
        outline: Outline,
        request_for: F,
    ) -> Result<(Document, AssemblyReport), GenerationError>
    where
        F: Fn(&Chapter, &Section) -> String,
    {
        let total = outline.section_count();
        let mut bodies: HashMap<UnitKey, String> = HashMap::with_capacity(total);
        let mut report = AssemblyReport::default();
        let mut done = 0usize;

        info!("Generating content for {} chapters / {} sections", outline.chapters.len(), total);

        for chapter in &outline.chapters {
            if chapter.sections.is_empty() {
                warn!("No sections for chapter '{}'. Skipping.", chapter.title);
                report.chapters_skipped += 1;
                continue;
            }
            info!("Processing chapter {}: '{}'", chapter.ordinal, chapter.title);

            for section in &chapter.sections {
                done += 1;
                info!("Section {}/{}: '{}'", done, total, section.title);

                let request = request_for(chapter, section);
                let body = match self.generator.generate(&request).await {
                    Ok(text) => {
                        let (words, verdict) = check_word_count(&text, self.word_target);
                        match verdict {
                            WordCountVerdict::Short => warn!(
                                "Section '{}' shorter than target ({} words, target {}-{})",
                                section.title, words, self.word_target.min, self.word_target.max
                            ),
                            WordCountVerdict::Long => warn!(
                                "Section '{}' longer than target ({} words, target {}-{})",
                                section.title, words, self.word_target.min, self.word_target.max
                            ),
                            WordCountVerdict::WithinRange => {
                                info!("Section '{}': {} words", section.title, words)
                            }
                        }
                        report.sections_generated += 1;
                        text
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!("Failed generation for section '{}': {e}. Using placeholder.", section.title);
                        report.placeholders += 1;
                        placeholder_text(&section.title)
                    }
                };
                bodies.insert(UnitKey::section(section), body);
            }
        }

        Ok((Document::new(title, front_matter, outline, bodies), report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use crate::cache::MemoryResponseCache;
    use crate::generation::generator::tests::ScriptedCompletion;
    use crate::generation::generator::{NoDelay, RetryPolicy};
    use crate::llm_client::{CompletionError, CompletionResponse};
    use crate::outline::parse_outline;

    const RANGE: WordRange = WordRange { min: 10, max: 20 };

    fn front() -> FrontMatter {
        FrontMatter {
            copyright_holder: "A. Author".to_string(),
            year: 2026,
        }
    }

    fn request(chapter: &Chapter, section: &Section) -> String {
        format!("write {} / {}", chapter.title, section.title)
    }

    fn generator(client: Arc<ScriptedCompletion>) -> Generator {
        Generator::new(
            client,
            Arc::new(MemoryResponseCache::new()),
            Arc::new(NoDelay),
            RetryPolicy::default(),
        )
    }

    fn body() -> Result<CompletionResponse, CompletionError> {
        Ok(CompletionResponse::stop(
            "Twelve words of perfectly adequate prose fill this generated section body nicely.",
        ))
    }

    #[tokio::test]
    async fn test_assembles_every_section_in_order() {
        let client = Arc::new(ScriptedCompletion::always(body));
        let generator = generator(client.clone());
        let outline = parse_outline("1. Intro\n  1.1. Background\n  1.2. Scope\n2. Methods\n  2.1. Setup").unwrap();

        let (doc, report) = ContentAssembler::new(&generator, RANGE)
            .assemble("Book".to_string(), front(), outline, request)
            .await
            .unwrap();

        assert_eq!(report.sections_generated, 3);
        assert_eq!(report.placeholders, 0);
        assert_eq!(doc.body_count(), 3);
        for chapter in doc.chapters() {
            for section in &chapter.sections {
                assert!(doc.body(UnitKey::section(section)).is_some());
            }
        }
        assert_eq!(client.calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_exhausted_section_gets_placeholder_with_title() {
        fn empty() -> Result<CompletionResponse, CompletionError> {
            Ok(CompletionResponse::stop(""))
        }
        let client = Arc::new(ScriptedCompletion::always(empty));
        let generator = generator(client.clone());
        let outline = parse_outline("1. Intro\n  1.1. Background").unwrap();

        let (doc, report) = ContentAssembler::new(&generator, RANGE)
            .assemble("Book".to_string(), front(), outline, request)
            .await
            .unwrap();

        let section = &doc.chapters()[0].sections[0];
        assert_eq!(
            doc.body(UnitKey::section(section)),
            Some("(Content generation failed: Background)")
        );
        assert_eq!(report.placeholders, 1);
        assert_eq!(client.calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_fatal_failure_aborts_assembly() {
        fn auth() -> Result<CompletionResponse, CompletionError> {
            Err(CompletionError::Auth("API key not valid".to_string()))
        }
        let client = Arc::new(ScriptedCompletion::always(auth));
        let generator = generator(client.clone());
        let outline = parse_outline("1. Intro\n  1.1. A\n  1.2. B").unwrap();

        let result = ContentAssembler::new(&generator, RANGE)
            .assemble("Book".to_string(), front(), outline, request)
            .await;

        assert!(matches!(result, Err(GenerationError::Fatal(_))));
        assert_eq!(client.calls.load(Ordering::Relaxed), 1, "stops at the first section");
    }

    #[tokio::test]
    async fn test_chapter_without_sections_is_skipped() {
        let client = Arc::new(ScriptedCompletion::always(body));
        let generator = generator(client);
        let outline = parse_outline("1. Intro\n  1.1. A\n2. Interlude\n3. End\n  3.1. B").unwrap();

        let (doc, report) = ContentAssembler::new(&generator, RANGE)
            .assemble("Book".to_string(), front(), outline, request)
            .await
            .unwrap();

        assert_eq!(report.chapters_skipped, 1);
        assert_eq!(doc.chapters().len(), 3, "the empty chapter stays in the outline");
        assert_eq!(doc.body_count(), 2);
    }

    #[test]
    fn test_word_count_verdicts() {
        let range = WordRange { min: 100, max: 200 };
        assert_eq!(check_word_count(&"w ".repeat(79), range).1, WordCountVerdict::Short);
        assert_eq!(check_word_count(&"w ".repeat(80), range).1, WordCountVerdict::WithinRange);
        assert_eq!(check_word_count(&"w ".repeat(240), range).1, WordCountVerdict::WithinRange);
        assert_eq!(check_word_count(&"w ".repeat(241), range).1, WordCountVerdict::Long);
    }
}
