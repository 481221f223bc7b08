//! LLM Client: the single point of entry for all text-completion calls.
//!
//! ARCHITECTURAL RULE: No other module may call the completion API directly.
//! Everything goes through the `Completion` trait so the generator can be
//! driven by a scripted fake in tests.
//!
//! This client makes exactly ONE request per `complete` call. Retrying,
//! caching and output validation belong to `generation::generator`.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Credential problem. Retrying cannot help.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CompletionError {
    pub fn is_auth(&self) -> bool {
        matches!(self, CompletionError::Auth(_))
    }
}

/// Why the service stopped producing text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    /// The request or the candidate was blocked by the service.
    Blocked(String),
    Other(String),
}

/// One completion result as reported by the service.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: Option<String>,
    pub finish: FinishReason,
}

impl CompletionResponse {
    pub fn stop(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            finish: FinishReason::Stop,
        }
    }
}

/// Text in, text out. The external collaborator behind the generator.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, CompletionError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{GEMINI_API_BASE}/{}:generateContent", self.model)
    }
}

#[async_trait]
impl Completion for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, CompletionError> {
        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(classify_api_error(status.as_u16(), message));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "Completion succeeded: prompt_tokens={:?}, output_tokens={:?}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(interpret_response(parsed))
    }
}

/// Maps a non-2xx response onto the error taxonomy.
fn classify_api_error(status: u16, message: String) -> CompletionError {
    let auth_message = message.contains("API key not valid")
        || message.contains("API_KEY_INVALID")
        || message.contains("PERMISSION_DENIED");
    if status == 401 || status == 403 || auth_message {
        CompletionError::Auth(message)
    } else {
        CompletionError::Api { status, message }
    }
}

/// Flattens the candidate structure into text + finish reason.
fn interpret_response(parsed: GenerateContentResponse) -> CompletionResponse {
    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return CompletionResponse {
            text: None,
            finish: FinishReason::Blocked(reason),
        };
    }

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return CompletionResponse {
            text: None,
            finish: FinishReason::Other("NO_CANDIDATES".to_string()),
        };
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let finish = match candidate.finish_reason.as_deref() {
        None | Some("STOP") | Some("FINISH_REASON_UNSPECIFIED") => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::MaxTokens,
        Some(r @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII")) => {
            FinishReason::Blocked(r.to_string())
        }
        Some(other) => FinishReason::Other(other.to_string()),
    };

    CompletionResponse {
        text: if text.is_empty() { None } else { Some(text) },
        finish,
    }
}
