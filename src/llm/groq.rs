//! Groq (LLaMA-3) client over the OpenAI-compatible chat completions API

use super::retry::{classify_send_error, classify_status, with_retry, RetryPolicy};
use super::{build_http_client, Completion, CompletionRequest, LanguageModel};
use crate::error::AdvisorError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

pub struct GroqClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GroqClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AdvisorError::ConfigError(
                "Groq API key not configured".to_string(),
            ));
        }

        Ok(Self {
            client: build_http_client(timeout)?,
            api_key,
            model,
            base_url: GROQ_API_BASE.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn send_once(&self, body: &ChatCompletionRequest<'_>) -> Result<ChatCompletionResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Groq API request failed: {}", e);
                classify_send_error("Groq", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Groq API error response: {}", error_text);
            return Err(classify_status("Groq", status, &error_text));
        }

        response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!("Failed to parse Groq response: {}", e);
            AdvisorError::LlmError(format!("Groq parse error: {}", e))
        })
    }
}

#[async_trait]
impl LanguageModel for GroqClient {
    fn provider(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<Completion> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
        };

        info!(model = %self.model, "Calling Groq API");

        let response = with_retry(&self.retry, || self.send_once(&body)).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AdvisorError::LlmError("No choices in Groq response".to_string()))?;

        let text = choice.message.content.unwrap_or_default();
        if text.trim().is_empty() {
            warn!(finish_reason = ?choice.finish_reason, "Groq returned an empty message");
        }

        Ok(Completion {
            text,
            finish_reason: choice.finish_reason,
            prompt_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: response.usage.as_ref().map(|u| u.completion_tokens),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
