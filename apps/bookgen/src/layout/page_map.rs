//! Unit → page mapping recorded during layout.
//!
//! The map is built once by the paginator and then frozen; the TOC pass only
//! reads it.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::SectionOrdinal;

/// Title page and copyright page precede the numbered content.
pub const FRONT_MATTER_PAGES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressableUnit {
    Title,
    Copyright,
    Chapter(u32),
    Section(SectionOrdinal),
}

impl fmt::Display for AddressableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressableUnit::Title => write!(f, "title"),
            AddressableUnit::Copyright => write!(f, "copyright"),
            AddressableUnit::Chapter(n) => write!(f, "chapter {n}"),
            AddressableUnit::Section(ordinal) => write!(f, "section {ordinal}"),
        }
    }
}

/// Mutable half, owned by the paginator.
#[derive(Debug, Default)]
pub struct PageMapBuilder {
    entries: Vec<(AddressableUnit, usize)>,
    index: HashMap<AddressableUnit, usize>,
}

impl PageMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the physical page a unit starts on. The first record wins.
    pub fn record(&mut self, unit: AddressableUnit, physical_page: usize) {
        if self.index.contains_key(&unit) {
            return;
        }
        self.index.insert(unit, physical_page);
        self.entries.push((unit, physical_page));
    }

    pub fn freeze(self) -> PageMap {
        PageMap {
            entries: self.entries,
            index: self.index,
        }
    }
}

/// Frozen unit → physical page map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMap {
    entries: Vec<(AddressableUnit, usize)>,
    index: HashMap<AddressableUnit, usize>,
}

impl PageMap {
    /// 1-based physical page within the content sequence.
    pub fn physical(&self, unit: AddressableUnit) -> Option<usize> {
        self.index.get(&unit).copied()
    }

    /// Number printed for the unit: physical minus the front matter, floored
    /// at 0. Missing units report 0.
    pub fn display_number(&self, unit: AddressableUnit) -> usize {
        self.physical(unit)
            .map(|p| p.saturating_sub(FRONT_MATTER_PAGES))
            .unwrap_or(0)
    }

    /// TOC label: the display number, or blank when it is 0.
    pub fn display_label(&self, unit: AddressableUnit) -> String {
        match self.display_number(unit) {
            0 => String::new(),
            n => n.to_string(),
        }
    }

    /// Entries in layout order.
    pub fn entries(&self) -> &[(AddressableUnit, usize)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordinal(chapter: u32, section: u32) -> SectionOrdinal {
        SectionOrdinal { chapter, section }
    }

    #[test]
    fn test_display_number_subtracts_front_matter() {
        let mut builder = PageMapBuilder::new();
        builder.record(AddressableUnit::Title, 1);
        builder.record(AddressableUnit::Copyright, 2);
        builder.record(AddressableUnit::Chapter(1), 3);
        builder.record(AddressableUnit::Section(ordinal(1, 1)), 3);
        builder.record(AddressableUnit::Section(ordinal(1, 2)), 5);
        let map = builder.freeze();

        assert_eq!(map.display_number(AddressableUnit::Chapter(1)), 1);
        assert_eq!(map.display_number(AddressableUnit::Section(ordinal(1, 2))), 3);
        assert_eq!(map.display_label(AddressableUnit::Section(ordinal(1, 2))), "3");
    }

    #[test]
    fn test_front_matter_floors_at_zero() {
        let mut builder = PageMapBuilder::new();
        builder.record(AddressableUnit::Title, 1);
        builder.record(AddressableUnit::Copyright, 2);
        let map = builder.freeze();

        assert_eq!(map.display_number(AddressableUnit::Title), 0);
        assert_eq!(map.display_number(AddressableUnit::Copyright), 0);
        assert_eq!(map.display_label(AddressableUnit::Title), "");
    }

    #[test]
    fn test_missing_unit_is_blank() {
        let map = PageMapBuilder::new().freeze();
        assert_eq!(map.physical(AddressableUnit::Chapter(4)), None);
        assert_eq!(map.display_number(AddressableUnit::Chapter(4)), 0);
        assert_eq!(map.display_label(AddressableUnit::Chapter(4)), "");
        assert!(map.is_empty());
    }

    #[test]
    fn test_first_record_wins_and_order_is_kept() {
        let mut builder = PageMapBuilder::new();
        builder.record(AddressableUnit::Chapter(1), 3);
        builder.record(AddressableUnit::Chapter(2), 7);
        builder.record(AddressableUnit::Chapter(1), 9);
        let map = builder.freeze();

        assert_eq!(map.physical(AddressableUnit::Chapter(1)), Some(3));
        assert_eq!(
            map.entries(),
            &[(AddressableUnit::Chapter(1), 3), (AddressableUnit::Chapter(2), 7)]
        );
        assert_eq!(map.len(), 2);
    }
}
