//! Prompt templates for the three generation stages: title, outline, section.
//!
//! Placeholders are `{name}` tokens filled with `str::replace` by the
//! builders below. The builders are the only place book settings touch prompt
//! text; everything downstream treats a prompt as an opaque payload.

use crate::config::{BookKind, BookSettings};
use crate::llm_client::prompts::{BODY_ONLY_INSTRUCTION, OUTPUT_ONLY_INSTRUCTION};

// ────────────────────────────────────────────────────────────────────────────
// Title
// ────────────────────────────────────────────────────────────────────────────

pub const TITLE_PROMPT_TEMPLATE: &str = "\
Generate 5 potential book titles for a book exploring the {topic_desc}. {context_desc}\n\
Intended style: {style_desc}. Writing style: '{writing_style}'. Target audience: '{audience}'.\n\
Present them as a simple list, one title per line, with no numbers, bullets or quotes.\n\
{output_only}";

// ────────────────────────────────────────────────────────────────────────────
// Outline
// ────────────────────────────────────────────────────────────────────────────

pub const OUTLINE_PROMPT_TEMPLATE: &str = "\
Generate a detailed two-level table of contents for the book '{title}' about the {topic_desc}. {context_desc}\n\
Style: {style_desc}. Use a logical structure that includes an introduction and a conclusion.\n\
Aim for about {approx_chapters} chapters and about {approx_sections} sections per chapter.\n\
\n\
Format it EXACTLY like this example:\n\
1. Chapter Title\n\
  1.1. Section Title\n\
  1.2. Section Title\n\
2. Chapter Title\n\
  2.1. Section Title\n\
\n\
Chapters start with 'number.'; sections are indented and start with 'number.number.' \
including the final period after the section number.\n\
List ONLY the titles in this format. {output_only}";

// ────────────────────────────────────────────────────────────────────────────
// Section
// ────────────────────────────────────────────────────────────────────────────

pub const SECTION_PROMPT_TEMPLATE: &str = "\
{persona} Target audience: '{audience}'.\n\
Write the content for the section '{section_title}' in the chapter '{chapter_title}'. \
Focus only on this section and assume the chapter context.\n\
Aim for {min_words}-{max_words} words. Writing style: '{writing_style}', adapted to the audience.\n\
{body_only}\n\
{output_only}";

// ────────────────────────────────────────────────────────────────────────────
// Builders
// ────────────────────────────────────────────────────────────────────────────

fn topic_desc(settings: &BookSettings) -> String {
    match settings.kind {
        BookKind::NonFiction => format!("non-fiction topic '{}'", settings.topic),
        BookKind::FictionTextbook => format!("fictional topic '{}'", settings.topic),
    }
}

fn style_desc(settings: &BookSettings) -> String {
    match settings.kind {
        BookKind::NonFiction => format!("a standard '{}'", settings.book_style),
        BookKind::FictionTextbook => {
            format!("a '{}' written from within that universe", settings.book_style)
        }
    }
}

fn context_desc(settings: &BookSettings) -> String {
    match settings.kind {
        BookKind::NonFiction => String::new(),
        BookKind::FictionTextbook => {
            format!("The book is set within the '{}' context.", settings.world_setting)
        }
    }
}

pub fn build_title_prompt(settings: &BookSettings) -> String {
    TITLE_PROMPT_TEMPLATE
        .replace("{topic_desc}", &topic_desc(settings))
        .replace("{context_desc}", &context_desc(settings))
        .replace("{style_desc}", &style_desc(settings))
        .replace("{writing_style}", &settings.writing_style)
        .replace("{audience}", &settings.target_audience)
        .replace("{output_only}", OUTPUT_ONLY_INSTRUCTION)
}

pub fn build_outline_prompt(settings: &BookSettings, title: &str) -> String {
    OUTLINE_PROMPT_TEMPLATE
        .replace("{title}", title)
        .replace("{topic_desc}", &topic_desc(settings))
        .replace("{context_desc}", &context_desc(settings))
        .replace("{style_desc}", &style_desc(settings))
        .replace("{approx_chapters}", &settings.approx_chapters.to_string())
        .replace("{approx_sections}", &settings.approx_sections_per_chapter.to_string())
        .replace("{output_only}", OUTPUT_ONLY_INSTRUCTION)
}

pub fn build_section_prompt(
    settings: &BookSettings,
    book_title: &str,
    chapter_title: &str,
    section_title: &str,
) -> String {
    let persona = match settings.kind {
        BookKind::NonFiction => format!(
            "You are an author writing a non-fiction book titled '{book_title}' about '{}'. \
             The book's style is '{}'.",
            settings.topic, settings.book_style
        ),
        BookKind::FictionTextbook => format!(
            "You are an author writing an authoritative '{}' titled '{book_title}' within the \
             universe '{}', about '{}' treated as real.",
            settings.book_style, settings.world_setting, settings.topic
        ),
    };

    SECTION_PROMPT_TEMPLATE
        .replace("{persona}", &persona)
        .replace("{audience}", &settings.target_audience)
        .replace("{section_title}", section_title)
        .replace("{chapter_title}", chapter_title)
        .replace("{min_words}", &settings.section_words.min.to_string())
        .replace("{max_words}", &settings.section_words.max.to_string())
        .replace("{writing_style}", &settings.writing_style)
        .replace("{body_only}", BODY_ONLY_INSTRUCTION)
        .replace("{output_only}", OUTPUT_ONLY_INSTRUCTION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_leave_no_placeholders() {
        let settings = BookSettings::for_topic("Tidal energy");
        for prompt in [
            build_title_prompt(&settings),
            build_outline_prompt(&settings, "Tides of Power"),
            build_section_prompt(&settings, "Tides of Power", "Intro", "Background"),
        ] {
            assert!(!prompt.contains('{'), "unfilled placeholder in: {prompt}");
        }
    }

    #[test]
    fn test_section_prompt_is_stable_for_identical_inputs() {
        let settings = BookSettings::for_topic("Tidal energy");
        let a = build_section_prompt(&settings, "T", "Intro", "Background");
        let b = build_section_prompt(&settings, "T", "Intro", "Background");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fiction_prompts_mention_world_setting() {
        let mut settings = BookSettings::for_topic("Dragon husbandry");
        settings.kind = BookKind::FictionTextbook;
        settings.world_setting = "The Ember Isles".to_string();
        assert!(build_title_prompt(&settings).contains("The Ember Isles"));
        assert!(build_section_prompt(&settings, "T", "C", "S").contains("The Ember Isles"));
    }
}
