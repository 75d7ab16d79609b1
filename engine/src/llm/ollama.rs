//! Ollama LLM Provider
//!
//! Talks to a local Ollama server (`/api/chat`, non-streaming). No
//! credential is required, which makes it the provider of choice for
//! offline runs.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{LLMError, LLMProvider, Message, MessageRole, Result};
use sdk::errors::EngineError;

/// Provider backed by an Ollama server
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// Server root, without trailing slash
    base_url: String,

    /// Model tag (e.g., "llama3.1:8b")
    model: String,

    client: Client,
}

impl OllamaProvider {
    /// Create a provider for `model` served at `base_url`.
    ///
    /// `timeout` bounds each request; local models can be slow on the first
    /// call while the weights load.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        })
    }

    fn chat_request<'a>(&'a self, messages: &'a [Message]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: messages.iter().map(ChatMessage::from).collect(),
            stream: false,
        }
    }

    fn map_status(&self, status: StatusCode, body: String) -> LLMError {
        match status.as_u16() {
            404 => LLMError::InvalidRequest(format!(
                "Model '{}' is not available on {}: {}",
                self.model, self.base_url, body
            )),
            429 => LLMError::RateLimitExceeded,
            _ => LLMError::ProviderUnavailable(format!("Ollama API error ({}): {}", status, body)),
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let request = self.chat_request(messages);

        tracing::debug!(
            "Ollama request: model={}, messages={}, chars={}",
            self.model,
            request.messages.len(),
            request.messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else if e.is_connect() {
                    LLMError::ProviderUnavailable(format!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.base_url
                    ))
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.map_status(status, body));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::debug!(
            "Ollama reply in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        if reply.message.content.trim().is_empty() {
            return Err(LLMError::EmptyResponse);
        }

        Ok(reply.message.content)
    }
}

/// `/api/chat` request body, borrowing from the conversation
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for ChatMessage<'a> {
    fn from(message: &'a Message) -> Self {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };
        Self {
            role,
            content: &message.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}
