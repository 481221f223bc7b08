// Outline parsing: generated two-level table-of-contents text → strict chapter/section tree.

pub mod parser;

pub use parser::{parse_outline, OutlineError};
