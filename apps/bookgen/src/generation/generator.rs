//! Generator: cached, retrying wrapper around the completion client.
//!
//! Flow per request: fingerprint → cache lookup → (miss) bounded attempt loop
//! → validate → best-effort cache write → return text.
//!
//! The attempt loop is an explicit state machine so the transitions are easy
//! to test: `Attempting(n)` moves to `Succeeded`, `TransientlyFailed(n)` or
//! `FatallyFailed`. Only `TransientlyFailed` with attempts left goes back to
//! `Attempting(n + 1)`, after the injected delay.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cache::{RequestFingerprint, ResponseCache};
use crate::llm_client::{Completion, CompletionError, CompletionResponse, FinishReason};

/// Responses shorter than this (after trimming) are treated as truncated.
pub const MIN_VIABLE_CHARS: usize = 20;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Every attempt was rejected. Callers substitute placeholder content.
    #[error("generation failed after {attempts} attempts")]
    Exhausted { attempts: u32 },

    /// Credential failure. The run cannot continue.
    #[error("fatal generation failure: {0}")]
    Fatal(String),
}

impl GenerationError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, GenerationError::Fatal(_))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Retry policy + delay strategy
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub min_length: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
            min_length: MIN_VIABLE_CHARS,
        }
    }
}

/// Waits between attempts. Injected so tests never sleep.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Real wall-clock sleep on the tokio timer.
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately.
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn wait(&self, _duration: Duration) {}
}

// ────────────────────────────────────────────────────────────────────────────
// Attempt state machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttemptState {
    Attempting(u32),
    Succeeded(String),
    TransientlyFailed(u32),
    FatallyFailed(String),
}

/// Why a single attempt was rejected. Logged, then folded into the state.
#[derive(Debug)]
enum Rejection {
    Transport(CompletionError),
    Blocked(String),
    UnexpectedFinish(String),
    TooShort(usize),
}

// ────────────────────────────────────────────────────────────────────────────
// Generator
// ────────────────────────────────────────────────────────────────────────────

pub struct Generator {
    client: Arc<dyn Completion>,
    cache: Arc<dyn ResponseCache>,
    delay: Arc<dyn Delay>,
    policy: RetryPolicy,
    external_calls: AtomicU32,
}

impl Generator {
    pub fn new(
        client: Arc<dyn Completion>,
        cache: Arc<dyn ResponseCache>,
        delay: Arc<dyn Delay>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            cache,
            delay,
            policy,
            external_calls: AtomicU32::new(0),
        }
    }

    /// Total external completion calls made so far (cache hits excluded).
    pub fn external_calls(&self) -> u32 {
        self.external_calls.load(Ordering::Relaxed)
    }

    /// Returns text for `prompt`, from the cache when possible.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let fingerprint = RequestFingerprint::of(prompt);

        if let Some(text) = self.cache.get(&fingerprint) {
            info!(fingerprint = %fingerprint.short(), "Cache HIT");
            return Ok(text);
        }
        info!(
            fingerprint = %fingerprint.short(),
            prompt_chars = prompt.len(),
            "Cache MISS, calling completion service"
        );

        let max_attempts = self.policy.max_attempts.max(1);
        let mut state = AttemptState::Attempting(1);

        loop {
            state = match state {
                AttemptState::Attempting(n) => {
                    debug!("Attempt {}/{}", n, max_attempts);
                    self.external_calls.fetch_add(1, Ordering::Relaxed);
                    match self.client.complete(prompt).await {
                        Err(CompletionError::Auth(message)) => AttemptState::FatallyFailed(message),
                        Err(e) => self.reject(n, max_attempts, Rejection::Transport(e)),
                        Ok(response) => match self.accept(response) {
                            Ok(text) => AttemptState::Succeeded(text),
                            Err(rejection) => self.reject(n, max_attempts, rejection),
                        },
                    }
                }

                AttemptState::TransientlyFailed(n) if n < max_attempts => {
                    self.delay.wait(self.policy.delay).await;
                    AttemptState::Attempting(n + 1)
                }

                AttemptState::TransientlyFailed(n) => {
                    error!("Generation failed after {n} attempts");
                    return Err(GenerationError::Exhausted { attempts: n });
                }

                AttemptState::FatallyFailed(message) => {
                    error!("Authentication failure, not retrying: {message}");
                    return Err(GenerationError::Fatal(message));
                }

                AttemptState::Succeeded(text) => {
                    info!(chars = text.len(), "Completion accepted");
                    if let Err(e) = self.cache.put(&fingerprint, &text) {
                        warn!("Failed to save result to cache: {e}");
                    }
                    return Ok(text);
                }
            };
        }
    }

    /// Validates one response. Accepted text is trimmed.
    fn accept(&self, response: CompletionResponse) -> Result<String, Rejection> {
        match response.finish {
            FinishReason::Stop | FinishReason::MaxTokens => {}
            FinishReason::Blocked(reason) => return Err(Rejection::Blocked(reason)),
            FinishReason::Other(reason) => return Err(Rejection::UnexpectedFinish(reason)),
        }

        let text = response.text.unwrap_or_default().trim().to_string();
        let chars = text.chars().count();
        if chars < self.policy.min_length {
            return Err(Rejection::TooShort(chars));
        }
        Ok(text)
    }

    fn reject(&self, attempt: u32, max_attempts: u32, rejection: Rejection) -> AttemptState {
        match &rejection {
            Rejection::Transport(e) => warn!("Attempt {attempt}/{max_attempts}: call failed: {e}"),
            Rejection::Blocked(reason) => {
                warn!("Attempt {attempt}/{max_attempts}: request blocked ({reason})")
            }
            Rejection::UnexpectedFinish(reason) => {
                warn!("Attempt {attempt}/{max_attempts}: unexpected finish reason {reason}")
            }
            Rejection::TooShort(chars) => {
                warn!("Attempt {attempt}/{max_attempts}: short/empty response ({chars} chars)")
            }
        }
        AttemptState::TransientlyFailed(attempt)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::cache::MemoryResponseCache;

    /// Completion fake that replays a script, then repeats its fallback.
    pub(crate) struct ScriptedCompletion {
        script: Mutex<VecDeque<Result<CompletionResponse, CompletionError>>>,
        fallback: fn() -> Result<CompletionResponse, CompletionError>,
        pub calls: AtomicU32,
    }

    impl ScriptedCompletion {
        pub(crate) fn new(
            script: Vec<Result<CompletionResponse, CompletionError>>,
            fallback: fn() -> Result<CompletionResponse, CompletionError>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicU32::new(0),
            }
        }

        pub(crate) fn always(fallback: fn() -> Result<CompletionResponse, CompletionError>) -> Self {
            Self::new(vec![], fallback)
        }
    }

    #[async_trait]
    impl Completion for ScriptedCompletion {
        async fn complete(&self, _prompt: &str) -> Result<CompletionResponse, CompletionError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| (self.fallback)())
        }
    }

    /// Records every requested delay.
    #[derive(Default)]
    struct RecordingDelay {
        waits: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Delay for RecordingDelay {
        async fn wait(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    const LONG_TEXT: &str = "A sufficiently long paragraph of generated prose.";

    fn ok_long() -> Result<CompletionResponse, CompletionError> {
        Ok(CompletionResponse::stop(LONG_TEXT))
    }

    fn ok_empty() -> Result<CompletionResponse, CompletionError> {
        Ok(CompletionResponse::stop(""))
    }

    fn auth_failure() -> Result<CompletionResponse, CompletionError> {
        Err(CompletionError::Auth("API key not valid".to_string()))
    }

    fn generator_with(
        client: Arc<ScriptedCompletion>,
        cache: Arc<MemoryResponseCache>,
    ) -> Generator {
        Generator::new(client, cache, Arc::new(NoDelay), RetryPolicy::default())
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_is_cached() {
        let client = Arc::new(ScriptedCompletion::always(ok_long));
        let cache = Arc::new(MemoryResponseCache::new());
        let generator = generator_with(client.clone(), cache.clone());

        let text = generator.generate("prompt").await.unwrap();
        assert_eq!(text, LONG_TEXT);
        assert_eq!(client.calls.load(Ordering::Relaxed), 1);
        assert_eq!(
            cache.get(&RequestFingerprint::of("prompt")).as_deref(),
            Some(LONG_TEXT)
        );
    }

    #[tokio::test]
    async fn test_cache_hit_makes_no_external_call() {
        let client = Arc::new(ScriptedCompletion::always(ok_long));
        let cache = Arc::new(MemoryResponseCache::new());
        cache
            .put(&RequestFingerprint::of("prompt"), "cached body text")
            .unwrap();
        let generator = generator_with(client.clone(), cache);

        let text = generator.generate("prompt").await.unwrap();
        assert_eq!(text, "cached body text");
        assert_eq!(client.calls.load(Ordering::Relaxed), 0);
        assert_eq!(generator.external_calls(), 0);
    }

    #[tokio::test]
    async fn test_second_identical_request_replays_from_cache() {
        let client = Arc::new(ScriptedCompletion::always(ok_long));
        let cache = Arc::new(MemoryResponseCache::new());
        let generator = generator_with(client.clone(), cache);

        let first = generator.generate("same prompt").await.unwrap();
        let second = generator.generate("same prompt").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(client.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_auth_error_short_circuits_after_one_attempt() {
        let client = Arc::new(ScriptedCompletion::always(auth_failure));
        let cache = Arc::new(MemoryResponseCache::new());
        let generator = generator_with(client.clone(), cache.clone());

        let err = generator.generate("prompt").await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(client.calls.load(Ordering::Relaxed), 1);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_three_empty_responses_exhaust() {
        let client = Arc::new(ScriptedCompletion::always(ok_empty));
        let cache = Arc::new(MemoryResponseCache::new());
        let generator = generator_with(client.clone(), cache.clone());

        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, GenerationError::Exhausted { attempts: 3 }));
        assert!(!err.is_fatal());
        assert_eq!(client.calls.load(Ordering::Relaxed), 3);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let client = Arc::new(ScriptedCompletion::new(
            vec![
                Err(CompletionError::Api {
                    status: 503,
                    message: "overloaded".to_string(),
                }),
                Ok(CompletionResponse {
                    text: None,
                    finish: FinishReason::Blocked("SAFETY".to_string()),
                }),
                Ok(CompletionResponse::stop(format!("  {LONG_TEXT}\n\n"))),
            ],
            ok_empty,
        ));
        let cache = Arc::new(MemoryResponseCache::new());
        let generator = generator_with(client.clone(), cache);

        let text = generator.generate("prompt").await.unwrap();
        assert_eq!(text, LONG_TEXT, "accepted text is trimmed");
        assert_eq!(client.calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_auth_error_after_transient_stops_immediately() {
        let client = Arc::new(ScriptedCompletion::new(
            vec![ok_empty(), auth_failure()],
            ok_long,
        ));
        let generator = generator_with(client.clone(), Arc::new(MemoryResponseCache::new()));

        let err = generator.generate("prompt").await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(client.calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_unexpected_finish_reason_is_retried() {
        let client = Arc::new(ScriptedCompletion::new(
            vec![Ok(CompletionResponse {
                text: Some(LONG_TEXT.to_string()),
                finish: FinishReason::Other("OTHER".to_string()),
            })],
            ok_long,
        ));
        let generator = generator_with(client.clone(), Arc::new(MemoryResponseCache::new()));

        assert!(generator.generate("prompt").await.is_ok());
        assert_eq!(client.calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_delay_only_between_attempts() {
        let client = Arc::new(ScriptedCompletion::always(ok_empty));
        let delay = Arc::new(RecordingDelay::default());
        let policy = RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_secs(5),
            min_length: MIN_VIABLE_CHARS,
        };
        let generator = Generator::new(
            client,
            Arc::new(MemoryResponseCache::new()),
            delay.clone(),
            policy,
        );

        let _ = generator.generate("prompt").await;
        let waits = delay.waits.lock().unwrap().clone();
        assert_eq!(waits, vec![Duration::from_secs(5), Duration::from_secs(5)]);
    }

    #[tokio::test]
    async fn test_response_at_minimum_length_is_accepted() {
        fn exactly_min() -> Result<CompletionResponse, CompletionError> {
            Ok(CompletionResponse::stop("x".repeat(MIN_VIABLE_CHARS)))
        }
        fn one_short() -> Result<CompletionResponse, CompletionError> {
            Ok(CompletionResponse::stop("x".repeat(MIN_VIABLE_CHARS - 1)))
        }

        let accepted = generator_with(
            Arc::new(ScriptedCompletion::always(exactly_min)),
            Arc::new(MemoryResponseCache::new()),
        );
        assert!(accepted.generate("p").await.is_ok());

        let rejected = generator_with(
            Arc::new(ScriptedCompletion::always(one_short)),
            Arc::new(MemoryResponseCache::new()),
        );
        assert!(rejected.generate("p").await.is_err());
    }

    #[tokio::test]
    async fn test_failing_cache_write_still_returns_text() {
        struct ReadOnlyCache;
        impl ResponseCache for ReadOnlyCache {
            fn get(&self, _fingerprint: &RequestFingerprint) -> Option<String> {
                None
            }
            fn put(
                &self,
                _fingerprint: &RequestFingerprint,
                _text: &str,
            ) -> Result<(), crate::cache::CacheError> {
                Err(crate::cache::CacheError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )))
            }
        }

        let generator = Generator::new(
            Arc::new(ScriptedCompletion::always(ok_long)),
            Arc::new(ReadOnlyCache),
            Arc::new(NoDelay),
            RetryPolicy::default(),
        );
        assert_eq!(generator.generate("prompt").await.unwrap(), LONG_TEXT);
    }
}
