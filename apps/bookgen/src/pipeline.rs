//! End-to-end run: title → outline → section bodies → rendered outputs.
//!
//! Generation is sequential. Each render sink runs on the blocking pool and
//! fails independently of the other.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::config::BookSettings;
use crate::errors::AppError;
use crate::generation::assembler::{AssemblyReport, ContentAssembler};
use crate::generation::generator::Generator;
use crate::generation::prompts::{build_outline_prompt, build_section_prompt};
use crate::generation::title::generate_title;
use crate::models::{Document, FrontMatter};
use crate::outline::parse_outline;
use crate::render::RenderSink;

const MAX_FILENAME_CHARS: usize = 100;
const FALLBACK_FILENAME: &str = "untitled_book";

/// File-system-safe base name for a book title.
pub fn clean_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')' | ' '))
        .map(|c| if c == ' ' { '_' } else { c })
        .take(MAX_FILENAME_CHARS)
        .collect();
    if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned
    }
}

pub fn output_path(output_dir: &Path, title: &str, sink: &dyn RenderSink) -> PathBuf {
    output_dir.join(format!("{}{}", clean_filename(title), sink.extension()))
}

#[derive(Debug)]
pub struct RenderOutcome {
    pub format: &'static str,
    pub result: Result<PathBuf, String>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub title: String,
    pub chapters: usize,
    pub sections: usize,
    pub assembly: AssemblyReport,
    pub outputs: Vec<RenderOutcome>,
    pub external_calls: u32,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn all_rendered(&self) -> bool {
        self.outputs.iter().all(|o| o.result.is_ok())
    }

    pub fn log(&self, topic: &str) {
        info!("===== Book generation summary =====");
        info!("Title:    {}", self.title);
        info!("Topic:    {}", topic);
        info!("Chapters: {}  Sections: {}", self.chapters, self.sections);
        info!(
            "Sections generated: {}  placeholders: {}  chapters without sections: {}",
            self.assembly.sections_generated, self.assembly.placeholders, self.assembly.chapters_skipped
        );
        for outcome in &self.outputs {
            match &outcome.result {
                Ok(path) => info!("{}: {}", outcome.format, path.display()),
                Err(e) => error!("{}: FAILED ({e})", outcome.format),
            }
        }
        info!(
            "Completion calls: {}  Elapsed: {:.1}s",
            self.external_calls,
            self.elapsed.as_secs_f64()
        );
    }
}

pub struct Pipeline {
    generator: Generator,
    settings: BookSettings,
    output_dir: PathBuf,
    year: i32,
    sinks: Vec<Arc<dyn RenderSink>>,
}

impl Pipeline {
    pub fn new(
        generator: Generator,
        settings: BookSettings,
        output_dir: PathBuf,
        year: i32,
        sinks: Vec<Arc<dyn RenderSink>>,
    ) -> Self {
        Self {
            generator,
            settings,
            output_dir,
            year,
            sinks,
        }
    }

    /// Generates the document. Aborts on fatal generation failures and on an
    /// unusable outline; section failures become placeholders.
    pub async fn build_document(&self) -> Result<(Document, AssemblyReport), AppError> {
        let title = generate_title(&self.generator, &self.settings).await?;

        info!("Generating outline for '{title}'");
        let raw_outline = match self.generator.generate(&build_outline_prompt(&self.settings, &title)).await {
            Ok(text) => text,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => return Err(AppError::OutlineUnavailable(e.to_string())),
        };
        let outline = parse_outline(&raw_outline)?;
        for chapter in outline.empty_chapters() {
            warn!("Chapter '{}' has no sections", chapter.title);
        }
        info!(
            "Outline: {} chapters, {} sections",
            outline.chapters.len(),
            outline.section_count()
        );

        let front_matter = FrontMatter {
            copyright_holder: self.settings.copyright_holder.clone(),
            year: self.year,
        };
        let assembler = ContentAssembler::new(&self.generator, self.settings.section_words);
        let settings = &self.settings;
        let book_title = title.clone();
        let (document, report) = assembler
            .assemble(title, front_matter, outline, |chapter, section| {
                build_section_prompt(settings, &book_title, &chapter.title, &section.title)
            })
            .await?;
        Ok((document, report))
    }

    /// Renders `document` with every sink. Never fails as a whole.
    pub async fn render_all(&self, document: Arc<Document>) -> Vec<RenderOutcome> {
        let mut outcomes = Vec::with_capacity(self.sinks.len());

        for sink in &self.sinks {
            let path = output_path(&self.output_dir, document.title(), sink.as_ref());
            info!("Rendering {} to {}", sink.name(), path.display());

            let task_sink = Arc::clone(sink);
            let task_doc = Arc::clone(&document);
            let task_path = path.clone();
            let joined = tokio::task::spawn_blocking(move || task_sink.render(&task_doc, &task_path)).await;

            let result = match joined {
                Ok(Ok(())) => Ok(path),
                Ok(Err(e)) => {
                    error!("{} rendering failed: {e}", sink.name());
                    Err(e.to_string())
                }
                Err(e) => {
                    error!("{} render task failed: {e}", sink.name());
                    Err(format!("render task failed: {e}"))
                }
            };
            outcomes.push(RenderOutcome {
                format: sink.name(),
                result,
            });
        }
        outcomes
    }

    pub async fn run(&self) -> Result<RunSummary, AppError> {
        let started = Instant::now();
        let (document, assembly) = self.build_document().await?;
        let document = Arc::new(document);

        let outputs = self.render_all(Arc::clone(&document)).await;

        Ok(RunSummary {
            title: document.title().to_string(),
            chapters: document.chapters().len(),
            sections: document.outline().section_count(),
            assembly,
            outputs,
            external_calls: self.generator.external_calls(),
            elapsed: started.elapsed(),
        })
    }
}
