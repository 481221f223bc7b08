pub mod document;
pub mod outline;

pub use document::{Document, FrontMatter, UnitKey};
pub use outline::{Chapter, Outline, Section, SectionOrdinal};
