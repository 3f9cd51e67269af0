//! LLM client for OpenAI-compatible chat-completions endpoints.
//!
//! - Bearer auth, JSON request/response in the OpenAI schema
//! - Transport retry with exponential backoff; `retry-after` honoured on 429
//! - No retry on 401/404, those need an operator

use super::TextGenerator;
use crate::models::{ApiError, LlmConfig, Result, ScriptoriumError};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Message in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request payload.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f64,
}

/// Chat completion response.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// API error response (OpenAI-compatible).
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Response from a completion request.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,
    /// Model used (may differ from requested)
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub duration: Duration,
}

/// Client for one OpenAI-compatible endpoint.
pub struct LLMClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    // Usage tracking
    total_input_tokens: AtomicU64,
    total_output_tokens: AtomicU64,
}

impl LLMClient {
    /// Create a new LLM client.
    pub fn new(api_key: String, base_url: String, timeout_secs: u64, max_retries: u32) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ScriptoriumError::Network)?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            max_retries: max_retries.max(1),
            total_input_tokens: AtomicU64::new(0),
            total_output_tokens: AtomicU64::new(0),
        })
    }

    /// Create a client from the `[llm]` config section.
    pub fn from_config(config: &LlmConfig, api_key: String) -> Result<Self> {
        Self::new(
            api_key,
            config.base_url.clone(),
            config.timeout_secs,
            config.max_retries,
        )
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build headers for a request.
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    /// Complete a chat request.
    pub async fn complete(
        &self,
        model: &str,
        messages: Vec<Message>,
        max_tokens: Option<u32>,
        temperature: f64,
    ) -> Result<CompletionResponse> {
        let start = Instant::now();
        let request = ChatCompletionRequest {
            model,
            messages,
            max_tokens,
            temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error: Option<ScriptoriumError> = None;

        for attempt in 0..self.max_retries {
            let response = self
                .client
                .post(&url)
                .headers(self.headers())
                .json(&request)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(if e.is_timeout() {
                        ScriptoriumError::Timeout(self.timeout)
                    } else {
                        ScriptoriumError::Network(e)
                    });
                    self.backoff(attempt, None).await;
                    continue;
                }
            };

            let status = response.status().as_u16();

            if status == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<f64>().ok())
                    .unwrap_or(1.0);

                last_error = Some(ScriptoriumError::RateLimited {
                    retry_after_secs: retry_after,
                });
                self.backoff(attempt, Some(Duration::from_secs_f64(retry_after)))
                    .await;
                continue;
            }

            if !response.status().is_success() {
                let error_body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                    .map(|e| e.error.message)
                    .unwrap_or(error_body);

                let error = match status {
                    401 => ApiError::AuthenticationFailed,
                    404 => ApiError::ModelNotFound(model.to_string()),
                    _ => ApiError::Status { status, message },
                };
                last_error = Some(ScriptoriumError::Api(error));

                // Don't retry auth errors or not found
                if status == 401 || status == 404 {
                    break;
                }

                self.backoff(attempt, None).await;
                continue;
            }

            let body: ChatCompletionResponse = response.json().await.map_err(|e| {
                ScriptoriumError::Api(ApiError::InvalidResponse(format!(
                    "Failed to parse response: {e}"
                )))
            })?;

            let content = body
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| {
                    ScriptoriumError::Api(ApiError::InvalidResponse(
                        "No content in response".to_string(),
                    ))
                })?;

            let usage = body.usage.unwrap_or_default();
            self.total_input_tokens
                .fetch_add(usage.prompt_tokens as u64, Ordering::Relaxed);
            self.total_output_tokens
                .fetch_add(usage.completion_tokens as u64, Ordering::Relaxed);

            debug!(
                model = model,
                input_tokens = usage.prompt_tokens,
                output_tokens = usage.completion_tokens,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Completion received"
            );

            return Ok(CompletionResponse {
                content,
                model: body.model.unwrap_or_else(|| model.to_string()),
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                duration: start.elapsed(),
            });
        }

        // All retries exhausted
        Err(last_error.unwrap_or_else(|| {
            ScriptoriumError::Api(ApiError::MaxRetriesExceeded {
                attempts: self.max_retries,
                last_error: "Unknown error".to_string(),
            })
        }))
    }

    /// Sleep before the next attempt, unless `attempt` was the last one.
    async fn backoff(&self, attempt: u32, hint: Option<Duration>) {
        if attempt + 1 >= self.max_retries {
            return;
        }
        let delay = hint.unwrap_or_else(|| Duration::from_secs(2u64.pow(attempt)));
        debug!(
            attempt = attempt,
            backoff_ms = delay.as_millis() as u64,
            "Retrying chat completion"
        );
        tokio::time::sleep(delay).await;
    }

    /// Get total tokens tracked as (input, output).
    pub fn total_tokens(&self) -> (u64, u64) {
        (
            self.total_input_tokens.load(Ordering::Relaxed),
            self.total_output_tokens.load(Ordering::Relaxed),
        )
    }
}

/// An `LLMClient` bound to one model: the text-generation collaborator.
pub struct ChatGenerator {
    client: Arc<LLMClient>,
    model: String,
}

impl ChatGenerator {
    pub fn new(client: Arc<LLMClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for ChatGenerator {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
        max_output_tokens: Option<u32>,
    ) -> Result<String> {
        let messages = vec![Message::system(system_prompt), Message::user(user_prompt)];
        let response = self
            .client
            .complete(&self.model, messages, max_output_tokens, temperature)
            .await?;
        Ok(response.content)
    }
}
