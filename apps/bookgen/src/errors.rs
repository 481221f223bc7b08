use thiserror::Error;

use crate::generation::generator::GenerationError;
use crate::outline::OutlineError;

/// Run-level error type.
///
/// Only failures that stop the whole run end up here: outline parse failures,
/// an outline that could not be generated, and generation errors surfaced
/// from the title or assembly stages. Recoverable section failures are
/// absorbed into placeholder text, cache failures stay inside the generator
/// as log lines, and render failures are reported per format.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Outline error: {0}")]
    Outline(#[from] OutlineError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Outline generation failed: {0}")]
    OutlineUnavailable(String),
}

impl AppError {
    /// True for errors that mean nothing meaningful can be rendered.
    pub fn aborts_run(&self) -> bool {
        match self {
            AppError::Outline(_) | AppError::OutlineUnavailable(_) => true,
            AppError::Generation(e) => e.is_fatal(),
        }
    }
}
