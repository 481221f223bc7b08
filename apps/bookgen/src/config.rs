use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::warn;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_TARGET_AUDIENCE: &str = "General audience";
pub const DEFAULT_WORLD_SETTING: &str = "Default real world";
pub const DEFAULT_BOOK_STYLE: &str = "Standard non-fiction";
pub const DEFAULT_WRITING_STYLE: &str = "Clear and informative";
pub const DEFAULT_COPYRIGHT_HOLDER: &str = "[Your Name Here]";
pub const PLACEHOLDER_COPYRIGHT_HOLDER: &str = "Your Name or Pseudonym Here";
pub const DEFAULT_APPROX_CHAPTERS: u32 = 8;
pub const DEFAULT_APPROX_SECTIONS: u32 = 5;
pub const DEFAULT_SECTION_WORDS: WordRange = WordRange { min: 700, max: 1200 };
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Which prompt family to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookKind {
    NonFiction,
    /// An in-universe textbook about a fictional subject.
    FictionTextbook,
}

impl BookKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Non-Fiction" => Some(BookKind::NonFiction),
            "Fiction->Textbook Style" => Some(BookKind::FictionTextbook),
            _ => None,
        }
    }
}

/// Target word count per section. Checked informationally only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordRange {
    pub min: u32,
    pub max: u32,
}

impl WordRange {
    fn is_valid(&self) -> bool {
        self.min >= 50 && self.max >= self.min
    }
}

/// What the book is about and how it should read.
#[derive(Debug, Clone)]
pub struct BookSettings {
    pub topic: String,
    pub kind: BookKind,
    pub world_setting: String,
    pub book_style: String,
    pub writing_style: String,
    pub target_audience: String,
    pub copyright_holder: String,
    pub approx_chapters: u32,
    pub approx_sections_per_chapter: u32,
    pub section_words: WordRange,
}

impl BookSettings {
    /// Settings with every optional field at its default.
    pub fn for_topic(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            kind: BookKind::NonFiction,
            world_setting: DEFAULT_WORLD_SETTING.to_string(),
            book_style: DEFAULT_BOOK_STYLE.to_string(),
            writing_style: DEFAULT_WRITING_STYLE.to_string(),
            target_audience: DEFAULT_TARGET_AUDIENCE.to_string(),
            copyright_holder: DEFAULT_COPYRIGHT_HOLDER.to_string(),
            approx_chapters: DEFAULT_APPROX_CHAPTERS,
            approx_sections_per_chapter: DEFAULT_APPROX_SECTIONS,
            section_words: DEFAULT_SECTION_WORDS,
        }
    }
}

/// Application configuration loaded from environment variables (and `.env`).
///
/// Required variables fail the run; invalid optional ones fall back to their
/// defaults with a warning.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub book: BookSettings,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Config {
    /// Reads the process environment. Call `load_dotenv` first so `.env`
    /// values are visible here and to the log filter.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());

        let gemini_api_key = get("GEMINI_API_KEY")
            .filter(|v| !v.is_empty())
            .context("Required environment variable 'GEMINI_API_KEY' is not set")?;
        let topic = get("BOOK_TOPIC")
            .filter(|v| !v.is_empty())
            .context("Required environment variable 'BOOK_TOPIC' is not set")?;

        let mut book = BookSettings::for_topic(&topic);

        if let Some(raw) = get("BOOK_TYPE") {
            match BookKind::parse(&raw) {
                Some(kind) => book.kind = kind,
                None => warn!("Invalid BOOK_TYPE '{raw}'. Using Non-Fiction."),
            }
        }

        if book.kind == BookKind::FictionTextbook {
            match get("WORLD_SETTING").filter(|v| !v.is_empty()) {
                Some(world) => book.world_setting = world,
                None => bail!("WORLD_SETTING is required when BOOK_TYPE is 'Fiction->Textbook Style'"),
            }
        }

        book.book_style = text_or_default(get("BOOK_STYLE"), "BOOK_STYLE", DEFAULT_BOOK_STYLE);
        book.writing_style =
            text_or_default(get("WRITING_STYLE"), "WRITING_STYLE", DEFAULT_WRITING_STYLE);
        book.target_audience =
            text_or_default(get("TARGET_AUDIENCE"), "TARGET_AUDIENCE", DEFAULT_TARGET_AUDIENCE);

        book.copyright_holder = match get("COPYRIGHT_HOLDER") {
            Some(holder) if !holder.is_empty() && holder != PLACEHOLDER_COPYRIGHT_HOLDER => holder,
            _ => {
                warn!("COPYRIGHT_HOLDER is empty or still the placeholder. Using '{DEFAULT_COPYRIGHT_HOLDER}'.");
                DEFAULT_COPYRIGHT_HOLDER.to_string()
            }
        };

        book.approx_chapters =
            int_at_least(get("APPROX_CHAPTERS"), "APPROX_CHAPTERS", 3, DEFAULT_APPROX_CHAPTERS);
        book.approx_sections_per_chapter = int_at_least(
            get("APPROX_SECTIONS_PER_CHAPTER"),
            "APPROX_SECTIONS_PER_CHAPTER",
            1,
            DEFAULT_APPROX_SECTIONS,
        );

        let words = WordRange {
            min: int_at_least(get("SECTION_WORDS_MIN"), "SECTION_WORDS_MIN", 0, DEFAULT_SECTION_WORDS.min),
            max: int_at_least(get("SECTION_WORDS_MAX"), "SECTION_WORDS_MAX", 0, DEFAULT_SECTION_WORDS.max),
        };
        book.section_words = if words.is_valid() {
            words
        } else {
            warn!("Section word range {}-{} is invalid. Using defaults.", words.min, words.max);
            DEFAULT_SECTION_WORDS
        };

        let retry_delay_secs = int_at_least(
            get("GENERATION_RETRY_DELAY_SECS"),
            "GENERATION_RETRY_DELAY_SECS",
            0u64,
            DEFAULT_RETRY_DELAY_SECS,
        );

        Ok(Config {
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            book,
            output_dir: PathBuf::from(get("OUTPUT_DIR").unwrap_or_else(|| "output".to_string())),
            cache_dir: PathBuf::from(get("CACHE_DIR").unwrap_or_else(|| "api_cache".to_string())),
            max_attempts: int_at_least(get("GENERATION_MAX_ATTEMPTS"), "GENERATION_MAX_ATTEMPTS", 1, 3),
            retry_delay: Duration::from_secs(retry_delay_secs),
        })
    }
}

/// Loads `.env` into the process environment if present; ignored if missing.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn text_or_default(value: Option<String>, key: &str, default: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        Some(_) => {
            warn!("{key} is empty. Using '{default}'.");
            default.to_string()
        }
        None => default.to_string(),
    }
}

fn int_at_least<T>(value: Option<String>, key: &str, min: T, default: T) -> T
where
    T: FromStr + PartialOrd + Display + Copy,
{
    let Some(raw) = value else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(n) if n >= min => n,
        _ => {
            warn!("{key} '{raw}' is invalid (must be an integer >= {min}). Using {default}.");
            default
        }
    }
}
