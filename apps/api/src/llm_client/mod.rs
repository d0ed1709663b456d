/// LLM Client — the single point of entry for all language-model calls.
///
/// ARCHITECTURAL RULE: No other module may talk to the model provider directly.
/// The rewrite pipeline only sees the `LlmGateway` trait; `LlmClient` (OpenAI-compatible
/// chat completions) and `FakeLlmClient` are the two implementations wired at startup.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod fake;
pub mod prompts;

pub use fake::FakeLlmClient;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
/// Total attempts per call (first try + one retry) on 429 / 5xx / transport errors.
const MAX_ATTEMPTS: u32 = 2;
const RETRY_BASE_DELAY_MS: u64 = 500;

// Prompt size guard (chars). 1 token ~= 4 chars, conservative.
const MODEL_CONTEXT_TOKENS: usize = 128_000;
const OUTPUT_BUDGET_TOKENS: usize = 2_000;
const CHARS_PER_TOKEN: usize = 4;
const MAX_PROMPT_CHARS: usize = (MODEL_CONTEXT_TOKENS - OUTPUT_BUDGET_TOKENS) * CHARS_PER_TOKEN;
const TRUNCATION_MARKER: &str = "\n\n...[TRUNCATED FOR LENGTH]...\n\n";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM call timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

/// Model output for one rewrite call. Missing fields deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LlmRewrite {
    #[serde(default)]
    pub rewrite: String,
    #[serde(default, rename = "jdInsert")]
    pub jd_insert: Vec<String>,
}

/// Executes one system/user prompt pair and returns the model's rewrite.
///
/// "No content" is NOT an error: it is an `Ok` with an empty `rewrite`.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn rewrite(&self, system_prompt: &str, user_prompt: &str) -> Result<LlmRewrite, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (chat completions)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatResponse {
    fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// LlmClient
// ────────────────────────────────────────────────────────────────────────────

/// Connection settings for the HTTP gateway, taken from `Config`.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
}

/// OpenAI-compatible chat-completions client with retry on transient failures.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    url: String,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self {
            client,
            url: normalize_endpoint(&settings.endpoint),
            settings,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Makes a raw chat-completions call and returns the message content, if any.
    /// Retries on 429, 5xx and transport errors with exponential backoff.
    async fn call(&self, system: &str, user: &str) -> Result<Option<String>, LlmError> {
        let user = clip_prompt(user, MAX_PROMPT_CHARS);
        let request_body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.url)
                .bearer_auth(&self.settings.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: extract_error_message(&body),
                });
            }

            let chat: ChatResponse = response.json().await?;
            if let Some(usage) = &chat.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(chat.content().map(str::to_string));
        }

        Err(match last_error {
            Some(LlmError::Api { status: 429, .. }) | None => LlmError::RateLimited {
                retries: MAX_ATTEMPTS - 1,
            },
            Some(e) => e,
        })
    }
}

#[async_trait]
impl LlmGateway for LlmClient {
    async fn rewrite(&self, system_prompt: &str, user_prompt: &str) -> Result<LlmRewrite, LlmError> {
        match self.call(system_prompt, user_prompt).await? {
            Some(content) => parse_rewrite(&content),
            None => Ok(LlmRewrite::default()),
        }
    }
}

/// Parses the model's JSON answer. Blank content is an empty rewrite, not an error.
pub fn parse_rewrite(content: &str) -> Result<LlmRewrite, LlmError> {
    let json = extract_json_object(content);
    if json.is_empty() {
        return Ok(LlmRewrite::default());
    }
    serde_json::from_str(json).map_err(LlmError::Parse)
}

/// Accepts either a base URL (`…/v1`) or a full chat-completions URL.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return DEFAULT_ENDPOINT.to_string();
    }
    if trimmed.ends_with("/chat/completions") {
        return trimmed.to_string();
    }
    if let Some(base) = trimmed.strip_suffix("/v1/") {
        return format!("{base}/v1/chat/completions");
    }
    if trimmed.ends_with("/v1") {
        return format!("{trimmed}/chat/completions");
    }
    trimmed.to_string()
}

/// Strips ```json fences and any prose around the outermost `{ … }`.
fn extract_json_object(text: &str) -> &str {
    let text = text.trim();
    let text = if let Some(stripped) = text.strip_prefix("```json") {
        stripped.trim_start()
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped.trim_start()
    } else {
        text
    };
    let text = text.strip_suffix("```").unwrap_or(text).trim();

    match (text.find('{'), text.rfind('}')) {
        (Some(i), Some(j)) if i <= j => &text[i..=j],
        _ => text,
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|e| e.error.map(|d| d.message).or(e.message))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| body.to_string())
}

/// Keeps the head (instructions) and the tail (latest content) when a prompt is too long.
fn clip_prompt(prompt: &str, max_chars: usize) -> String {
    let len = prompt.chars().count();
    if len <= max_chars {
        return prompt.to_string();
    }

    let keep_head = (max_chars / 5).min(20_000);
    let keep_tail = max_chars.saturating_sub(keep_head + TRUNCATION_MARKER.chars().count());

    let head: String = prompt.chars().take(keep_head).collect();
    let tail: String = prompt.chars().skip(len - keep_tail).collect();
    debug!(
        "Prompt clipped: original_chars={}, max_chars={}",
        len, max_chars
    );
    format!("{head}{TRUNCATION_MARKER}{tail}")
}
