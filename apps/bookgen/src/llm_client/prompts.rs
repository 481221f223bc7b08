// Shared prompt fragments.
// Each stage that needs a completion defines its own templates in generation/prompts.rs.
// This file contains cross-cutting instructions appended to several of them.

/// Keeps the model from wrapping answers in chatter.
pub const OUTPUT_ONLY_INSTRUCTION: &str = "\
    Output ONLY what is asked for. \
    Do NOT add introductions, explanations, apologies or closing remarks.";

/// Keeps section bodies free of headings; the layout adds its own.
pub const BODY_ONLY_INSTRUCTION: &str = "\
    Do NOT repeat the section title. Do NOT add headings. \
    Structure the text as plain paragraphs separated by blank lines.";
