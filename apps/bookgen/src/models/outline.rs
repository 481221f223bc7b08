use std::fmt;

use serde::{Deserialize, Serialize};

/// Two-part `chapter.section` key. Both parts are 1-based positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionOrdinal {
    pub chapter: u32,
    pub section: u32,
}

impl fmt::Display for SectionOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.chapter, self.section)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub ordinal: SectionOrdinal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    /// 1-based reading-order position.
    pub ordinal: u32,
    pub sections: Vec<Section>,
}

impl Chapter {
    pub fn section_titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }
}

/// Ordered chapter → section tree. Order is reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub chapters: Vec<Chapter>,
}

impl Outline {
    pub fn section_count(&self) -> usize {
        self.chapters.iter().map(|c| c.sections.len()).sum()
    }

    pub fn chapter_titles(&self) -> Vec<&str> {
        self.chapters.iter().map(|c| c.title.as_str()).collect()
    }

    /// Chapters that parsed without any sections. Legal, but worth a warning.
    pub fn empty_chapters(&self) -> Vec<&Chapter> {
        self.chapters.iter().filter(|c| c.sections.is_empty()).collect()
    }
}
