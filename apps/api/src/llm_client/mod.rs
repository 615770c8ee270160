/// LLM Client: the single point of entry for all chat-completion calls.
///
/// No other module may call a provider API directly. Each client is bound to
/// one `ProviderConfig`; the screening adapter holds one client per backend.
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;
const TEMPERATURE: f32 = 0.1;

/// Wire format spoken by a provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `/v1/chat/completions` with `response_format = json_object`.
    OpenAi,
    /// `/v1/messages`.
    Anthropic,
}

/// Injected provider settings. Nothing in this module reads the environment.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub dialect: Dialect,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

/// Coarse failure class used to decide whether another provider is worth trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Input exceeded what the provider accepts (context window, payload size).
    CapacityExceeded,
    /// Provider refused for rate or quota reasons.
    RateLimited,
    Other,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Input exceeds provider capacity: {0}")]
    CapacityExceeded(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Response failed schema validation: {0}")]
    Schema(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            LlmError::CapacityExceeded(_) => ProviderErrorKind::CapacityExceeded,
            LlmError::RateLimited(_) => ProviderErrorKind::RateLimited,
            _ => ProviderErrorKind::Other,
        }
    }
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

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

/// Error envelope shared closely enough by both providers:
/// OpenAI sets `code`, Anthropic sets `type`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Chat client bound to a single provider.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: ProviderConfig,
}

impl LlmClient {
    pub fn new(config: ProviderConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()?,
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Sends one system + user exchange and returns the raw text reply.
    /// Transport failures and 5xx responses are retried with exponential
    /// backoff; 429 and capacity errors are returned immediately so the caller
    /// can route elsewhere.
    pub async fn call(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "{} call attempt {} failed, retrying after {}ms...",
                    self.config.name,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.build_request(system, prompt).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.is_server_error() && status.as_u16() != 529 {
                let body = response.text().await.unwrap_or_default();
                warn!("{} returned {}: {}", self.config.name, status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_failure(status.as_u16(), &body));
            }

            let text = match self.config.dialect {
                Dialect::OpenAi => {
                    let parsed: OpenAiResponse = response.json().await?;
                    parsed
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.message.content)
                }
                Dialect::Anthropic => {
                    let parsed: AnthropicResponse = response.json().await?;
                    parsed
                        .content
                        .into_iter()
                        .find(|b| b.block_type == "text")
                        .and_then(|b| b.text)
                }
            };

            let text = text.filter(|t| !t.trim().is_empty());
            debug!(
                "{} call succeeded (model={}, empty={})",
                self.config.name,
                self.config.model,
                text.is_none()
            );
            return text.ok_or(LlmError::EmptyContent);
        }

        Err(last_error.unwrap_or(LlmError::EmptyContent))
    }

    /// Calls the provider and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<T, LlmError> {
        let text = self.call(system, prompt).await?;

        // Strip markdown code fences if the model wraps JSON in them
        let text = strip_json_fences(&text);

        serde_json::from_str(text).map_err(LlmError::Parse)
    }

    fn build_request(&self, system: &str, prompt: &str) -> RequestBuilder {
        let builder = self
            .client
            .post(&self.config.endpoint)
            .header("content-type", "application/json");

        match self.config.dialect {
            Dialect::OpenAi => builder.bearer_auth(&self.config.api_key).json(&OpenAiRequest {
                model: &self.config.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: system,
                    },
                    ChatMessage {
                        role: "user",
                        content: prompt,
                    },
                ],
                response_format: ResponseFormat {
                    format_type: "json_object",
                },
                temperature: TEMPERATURE,
            }),
            Dialect::Anthropic => builder
                .header("x-api-key", &self.config.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&AnthropicRequest {
                    model: &self.config.model,
                    max_tokens: MAX_TOKENS,
                    system,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                    temperature: TEMPERATURE,
                }),
        }
    }
}

/// Turns a non-success, non-retried response into a typed error.
///
/// Classification reads the status code and the provider's structured
/// `code` / `type` fields; the free-text message is carried along only for
/// logging.
fn classify_failure(status: u16, body: &str) -> LlmError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let (message, marker) = match parsed {
        Some(env) => {
            let marker = env.error.code.or(env.error.error_type).unwrap_or_default();
            (env.error.message, marker)
        }
        None => (body.to_string(), String::new()),
    };

    match (status, marker.as_str()) {
        (413, _) | (_, "context_length_exceeded" | "request_too_large" | "string_above_max_length") => {
            LlmError::CapacityExceeded(message)
        }
        (429, _) | (529, _) | (_, "rate_limit_exceeded" | "rate_limit_error" | "overloaded_error") => {
            LlmError::RateLimited(message)
        }
        _ => LlmError::Api { status, message },
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
