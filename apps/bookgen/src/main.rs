mod cache;
mod config;
mod errors;
mod generation;
mod layout;
mod llm_client;
mod models;
mod outline;
mod pipeline;
mod render;

use anyhow::Result;
use chrono::Datelike;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::cache::{FileResponseCache, MemoryResponseCache, ResponseCache};
use crate::config::Config;
use crate::generation::generator::{Generator, RetryPolicy, TokioDelay, MIN_VIABLE_CHARS};
use crate::llm_client::GeminiClient;
use crate::pipeline::Pipeline;
use crate::render::{DocxRenderer, PdfRenderer, RenderSink};

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so RUST_LOG from it applies to the filter
    config::load_dotenv();

    // Initialize structured logging before anything can warn
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), config::DEFAULT_LOG_LEVEL))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Fallback warnings from here on are logged
    let config = Config::from_env()?;

    info!("Starting bookgen v{}", env!("CARGO_PKG_VERSION"));
    info!("Topic: '{}' ({:?})", config.book.topic, config.book.kind);

    // Response cache: on-disk when possible, in-memory otherwise
    let cache: Arc<dyn ResponseCache> = match FileResponseCache::open(&config.cache_dir) {
        Ok(cache) => {
            info!("Response cache at {}", cache.dir().display());
            Arc::new(cache)
        }
        Err(e) => {
            warn!("Cache dir {} unusable ({e}). Caching in memory only.", config.cache_dir.display());
            Arc::new(MemoryResponseCache::new())
        }
    };

    // Completion client
    let client = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())?;
    info!("Completion client initialized (model: {})", client.model());

    let policy = RetryPolicy {
        max_attempts: config.max_attempts,
        delay: config.retry_delay,
        min_length: MIN_VIABLE_CHARS,
    };
    let generator = Generator::new(Arc::new(client), cache, Arc::new(TokioDelay), policy);

    let sinks: Vec<Arc<dyn RenderSink>> =
        vec![Arc::new(PdfRenderer::default()), Arc::new(DocxRenderer::new())];
    let year = chrono::Local::now().year();
    let pipeline = Pipeline::new(generator, config.book.clone(), config.output_dir.clone(), year, sinks);

    match pipeline.run().await {
        Ok(summary) => {
            summary.log(&config.book.topic);
            if !summary.all_rendered() {
                warn!("Some output formats failed; see errors above");
            }
            Ok(())
        }
        Err(e) if e.aborts_run() => {
            error!("Book generation aborted: {e}");
            Err(e.into())
        }
        Err(e) => {
            error!("Book generation stopped early: {e}");
            Err(e.into())
        }
    }
}
