//! Title selection from the title-candidates response.

use tracing::{info, warn};

use crate::config::BookSettings;
use crate::generation::generator::{GenerationError, Generator};
use crate::generation::prompts::build_title_prompt;

pub const FALLBACK_TITLE: &str = "Untitled Book";

/// Picks the first non-empty line, stripped of list markers and quotes.
pub fn select_title(candidates: &str) -> Option<String> {
    candidates
        .lines()
        .map(clean_candidate)
        .find(|line| !line.is_empty())
}

fn clean_candidate(line: &str) -> String {
    line.trim()
        .trim_start_matches(|c: char| c == '-' || c == '*' || c == '•')
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*')
        .trim()
        .to_string()
}

/// Generates and selects the book title. Only fatal failures are returned;
/// anything recoverable falls back to `FALLBACK_TITLE`.
pub async fn generate_title(
    generator: &Generator,
    settings: &BookSettings,
) -> Result<String, GenerationError> {
    info!("Generating title (audience: {}, style: {})", settings.target_audience, settings.book_style);

    let response = match generator.generate(&build_title_prompt(settings)).await {
        Ok(text) => text,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!("Title generation failed: {e}. Using fallback title.");
            return Ok(FALLBACK_TITLE.to_string());
        }
    };

    match select_title(&response) {
        Some(title) => {
            info!("Selected title: {title}");
            Ok(title)
        }
        None => {
            warn!("No usable title in response. Using fallback title.");
            Ok(FALLBACK_TITLE.to_string())
        }
    }
}
