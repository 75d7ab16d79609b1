//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for the remote conversational
//! capability behind every agent session. The `LLMProvider` trait is
//! stateless: a session sends its whole history on every turn and receives
//! the reply text, which keeps conversation state on our side of the wire.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::{Config, ProviderKind};
use crate::secrets::SecretString;
use sdk::errors::EngineError;

pub mod gemini;
pub mod ollama;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Empty response from model")]
    EmptyResponse,
}

impl From<LLMError> for EngineError {
    fn from(err: LLMError) -> Self {
        EngineError::Remote(err.to_string())
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "gemini", "ollama")
    fn name(&self) -> &str;

    /// Returns the model identifier requests are sent to
    fn model(&self) -> &str;

    /// Generate the next assistant turn for a conversation
    ///
    /// # Arguments
    /// * `messages` - Full conversation history, oldest first, ending with
    ///   the user turn to answer
    ///
    /// # Returns
    /// * `Ok(String)` - Non-empty reply text
    /// * `Err(LLMError)` - If the request fails or the reply is empty
    async fn generate(&self, messages: &[Message]) -> Result<String>;
}

/// Build the provider selected by `config.llm.provider`.
///
/// `credential` is required for cloud providers and ignored by local ones.
pub fn build_provider(
    config: &Config,
    credential: Option<SecretString>,
) -> std::result::Result<Arc<dyn LLMProvider>, EngineError> {
    match config.llm.provider {
        ProviderKind::Gemini => {
            let credential = credential.ok_or_else(|| {
                EngineError::Config(format!(
                    "Gemini requires an API key (set {} or pass --api-key)",
                    config.llm.gemini.api_key_env
                ))
            })?;
            let model = config.model_config(credential);
            Ok(Arc::new(gemini::GeminiProvider::new(
                config.llm.gemini.base_url.clone(),
                model,
                config.llm.request_timeout(),
            )?))
        }
        ProviderKind::Ollama => Ok(Arc::new(ollama::OllamaProvider::new(
            config.llm.ollama.base_url.clone(),
            config.llm.ollama.model.clone(),
            config.llm.request_timeout(),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(user_msg.content, "Hello");

        let assistant_msg = Message::assistant("Hi there");
        assert_eq!(assistant_msg.role, MessageRole::Assistant);
        assert_eq!(assistant_msg.content, "Hi there");

        assert_eq!(MessageRole::User.to_string(), "user");
        assert_eq!(MessageRole::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::user("test");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"user""#));
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, deserialized);
    }

    #[test]
    fn test_llm_error_maps_to_remote() {
        let err: EngineError = LLMError::RateLimitExceeded.into();
        match err {
            EngineError::Remote(msg) => assert_eq!(msg, "Rate limit exceeded"),
            other => panic!("Expected Remote, got {:?}", other),
        }
    }

    #[test]
    fn test_build_provider_requires_credential_for_gemini() {
        let config = Config::default_config();
        assert_eq!(config.llm.provider, ProviderKind::Gemini);

        let result = build_provider(&config, None);
        assert!(matches!(result, Err(EngineError::Config(_))));

        let provider = build_provider(&config, Some(SecretString::new("key"))).unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.model(), config.llm.gemini.model);
    }

    #[test]
    fn test_build_provider_ollama_needs_no_credential() {
        let mut config = Config::default_config();
        config.llm.provider = ProviderKind::Ollama;

        let provider = build_provider(&config, None).unwrap();
        assert_eq!(provider.name(), "ollama");
    }
}
