//! HTTP client for OpenAI-compatible chat completion services

use crate::config::LLMServiceConfig;
use crate::error::{CallscopeError, OracleError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Trait for LLM service clients
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate chat completion
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
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

/// OpenAI-compatible chat client
pub struct HttpChatClient {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
}

impl HttpChatClient {
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(CallscopeError::Http)?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn endpoint(&self) -> String {
        let base = self.config.url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> CallscopeError {
        if e.is_timeout() {
            CallscopeError::Oracle(OracleError::Timeout(self.config.timeout_secs))
        } else {
            CallscopeError::Http(e)
        }
    }
}

#[async_trait]
impl LLMClient for HttpChatClient {
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let start = Instant::now();

        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut req = self.http_client.post(self.endpoint()).json(&request);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await.map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CallscopeError::ExternalError(format!(
                "LLM service error (HTTP {}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| self.transport_error(e))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                CallscopeError::Oracle(OracleError::Malformed(
                    "no choices in LLM response".to_string(),
                ))
            })?
            .message
            .content;

        let elapsed = start.elapsed().as_millis() as u64;
        tracing::debug!(model = %self.config.model, elapsed_ms = elapsed, "chat completion");

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
