use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::outline::{Chapter, Outline, Section};

/// Identifies a body of text: a chapter's own body (`section: None`) or one
/// of its sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    pub chapter: u32,
    pub section: Option<u32>,
}

impl UnitKey {
    pub fn chapter(chapter: &Chapter) -> Self {
        Self {
            chapter: chapter.ordinal,
            section: None,
        }
    }

    pub fn section(section: &Section) -> Self {
        Self {
            chapter: section.ordinal.chapter,
            section: Some(section.ordinal.section),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub copyright_holder: String,
    pub year: i32,
}

/// The assembled book. Built once by the assembler, read-only afterwards.
#[derive(Debug, Clone)]
pub struct Document {
    title: String,
    front_matter: FrontMatter,
    outline: Outline,
    bodies: HashMap<UnitKey, String>,
}

impl Document {
    pub fn new(
        title: String,
        front_matter: FrontMatter,
        outline: Outline,
        bodies: HashMap<UnitKey, String>,
    ) -> Self {
        Self {
            title,
            front_matter,
            outline,
            bodies,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn front_matter(&self) -> &FrontMatter {
        &self.front_matter
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.outline.chapters
    }

    pub fn body(&self, key: UnitKey) -> Option<&str> {
        self.bodies.get(&key).map(String::as_str)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}
