// llm-service-rs/src/llm_client.rs
//
// HTTP client for the Ollama-style chat endpoint
//
// This module provides:
// - One chat request per attempt (system + user message, streaming disabled)
// - A hard per-attempt timeout; expiry is reported like any other failure
// - Classification of backend errors into retryable vs. non-retryable
// - An optional bounded retry loop with exponential backoff (off by default)

use std::time::Duration;

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use config_rs::GatewayConfig;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{CompletionBackend, CompletionOutcome};

// Backend error bodies are echoed into failure reasons, capped at this many chars
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    #[serde(default)]
    pub(crate) role: String,
    pub(crate) content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub(crate) model: String,
    pub(crate) stream: bool,
    pub(crate) messages: Vec<ChatMessage>,
}

impl ChatCompletionRequest {
    pub(crate) fn new(model: &str, system_instruction: &str, user_text: &str) -> Self {
        Self {
            model: model.to_string(),
            stream: false,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_instruction.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_text.to_string(),
                },
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

// Ollama answers with a single `message`; OpenAI-compatible servers with `choices`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionResponse {
    Ollama { message: ChatMessage },
    OpenAi { choices: Vec<ChatChoice> },
}

/// Backend failure classes
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// 400, 401, 403, 404
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 429
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// 500, 502, 503, 504
    #[error("Server error: {0}")]
    ServerError(String),

    /// Connection refused, DNS, reset
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// 2xx with a body that is not a chat completion
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl LlmError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::ServerError(_)
                | LlmError::NetworkError(_)
                | LlmError::Timeout(_)
                | LlmError::RateLimitExceeded(_)
        )
    }
}

fn truncate_body(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", head)
    }
}

/// Map a non-2xx status and its body to an error class
pub(crate) fn classify_status(status: StatusCode, body: &str) -> LlmError {
    let body = truncate_body(body);
    match status.as_u16() {
        400 => LlmError::InvalidRequest(format!("Bad request: {}", body)),
        401 => LlmError::InvalidRequest(format!("Unauthorized: {}", body)),
        403 => LlmError::InvalidRequest(format!("Forbidden: {}", body)),
        404 => LlmError::InvalidRequest(format!("Not found: {}", body)),
        429 => LlmError::RateLimitExceeded(body),
        500 | 502 | 503 | 504 => LlmError::ServerError(format!("({}) {}", status, body)),
        _ => LlmError::UnknownError(format!("({}) {}", status, body)),
    }
}

/// Extract the assistant content from a 2xx response body
pub(crate) fn parse_chat_response(body: &str) -> Result<String, LlmError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|err| LlmError::ParseError(format!("Failed to parse response: {}", err)))?;

    match parsed {
        ChatCompletionResponse::Ollama { message } => Ok(message.content),
        ChatCompletionResponse::OpenAi { choices } => choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::ParseError("No choices returned in response".to_string())),
    }
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    chat_url: String,
    max_retries: u32,
    initial_retry_delay_ms: u64,
    max_retry_delay_ms: u64,
}

impl LlmClient {
    /// Client posting to `chat_url`, single attempt per completion
    pub fn new(chat_url: impl Into<String>) -> Self {
        let client = Client::builder().build().unwrap_or_default();

        Self {
            client,
            chat_url: chat_url.into(),
            max_retries: 0,
            initial_retry_delay_ms: 250,
            max_retry_delay_ms: 2_000,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        let client = Self::new(config.chat_url()).with_max_retries(config.max_retries);
        log::info!(
            "LLM client initialized: url={}, max_retries={}",
            client.chat_url,
            client.max_retries
        );
        client
    }

    /// Extra attempts after the first one. Total latency stays bounded by
    /// `timeout * (max_retries + 1)` plus the capped backoff delays.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_retry_delay_ms))
            .with_max_interval(Duration::from_millis(self.max_retry_delay_ms))
            .with_multiplier(2.0)
            .with_randomization_factor(0.5)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Generate one completion, retrying transient failures when configured
    pub async fn generate_text(
        &self,
        model: &str,
        system_instruction: &str,
        user_text: &str,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        let request_body = ChatCompletionRequest::new(model, system_instruction, user_text);
        let mut backoff = self.create_backoff();
        let mut attempt: u32 = 0;

        log::debug!(
            "Preparing LLM request to {} (model: {}, timeout: {:?})",
            self.chat_url,
            model,
            timeout
        );

        loop {
            attempt += 1;

            let err = match self.execute_request(&request_body, timeout).await {
                Ok(text) => return Ok(text),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt > self.max_retries {
                log::warn!("LLM request failed after {} attempt(s): {}", attempt, err);
                return Err(err);
            }

            match backoff.next_backoff() {
                Some(delay) => {
                    let jitter = rand::thread_rng().gen_range(0..=50);
                    let delay = delay + Duration::from_millis(jitter);
                    log::warn!("Retryable error: {}. Retrying in {:?}", err, delay);
                    tokio::time::sleep(delay).await;
                }
                None => return Err(err),
            }
        }
    }

    // A single attempt, bounded by `timeout` end to end (connect, send, body)
    async fn execute_request(
        &self,
        request_body: &ChatCompletionRequest,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        match tokio::time::timeout(timeout, self.send(request_body)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(timeout)),
        }
    }

    async fn send(&self, request_body: &ChatCompletionRequest) -> Result<String, LlmError> {
        let response = self
            .client
            .post(&self.chat_url)
            .json(request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_connect() {
                    LlmError::NetworkError(format!("Connection failed: {}", err))
                } else {
                    LlmError::NetworkError(err.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| LlmError::NetworkError(format!("Failed to read body: {}", err)))?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let text = parse_chat_response(&body)?;
        log::debug!(
            "LLM request completed (model: {}, {} chars)",
            request_body.model,
            text.len()
        );
        Ok(text)
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(
        &self,
        model: &str,
        system_instruction: &str,
        user_text: &str,
        timeout: Duration,
    ) -> CompletionOutcome {
        self.generate_text(model, system_instruction, user_text, timeout)
            .await
            .into()
    }
}
