//! Hosted LLM providers
//!
//! The advisor only needs one capability from a model: turn a system
//! instruction plus a prompt into text. Each provider implements
//! [`LanguageModel`] over its own wire format.

use crate::config::{AdvisorConfig, LlmProvider};
use crate::error::AdvisorError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub mod gemini;
pub mod groq;
pub mod retry;

pub use gemini::GeminiClient;
pub use groq::GroqClient;
pub use retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_instruction: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system_instruction: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            prompt: prompt.into(),
            temperature: 0.3,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub finish_reason: Option<String>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// A text-generation backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider label recorded with each Q&A log (`gemini`, `groq`)
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    async fn generate(&self, request: &CompletionRequest) -> Result<Completion>;
}

/// Shared connection-pooled HTTP client for provider calls
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(8)
        .timeout(timeout)
        .build()
        .map_err(AdvisorError::from)
}

/// Build the model selected by `LLM_PROVIDER`
pub fn build_language_model(config: &AdvisorConfig) -> Result<Arc<dyn LanguageModel>> {
    let retry = RetryPolicy::default().with_max_retries(config.llm_max_retries);

    let model: Arc<dyn LanguageModel> = match config.provider {
        LlmProvider::Gemini => {
            let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                AdvisorError::ConfigError(
                    "GOOGLE_API_KEY (or GEMINI_API_KEY) is required for the gemini provider"
                        .to_string(),
                )
            })?;
            Arc::new(
                GeminiClient::new(api_key, config.gemini_model.clone(), config.http_timeout)?
                    .with_retry_policy(retry),
            )
        }
        LlmProvider::Groq => {
            let api_key = config.groq_api_key.clone().ok_or_else(|| {
                AdvisorError::ConfigError(
                    "GROQ_API_KEY is required for the groq provider".to_string(),
                )
            })?;
            Arc::new(
                GroqClient::new(api_key, config.groq_model.clone(), config.http_timeout)?
                    .with_retry_policy(retry),
            )
        }
    };

    Ok(model)
}
