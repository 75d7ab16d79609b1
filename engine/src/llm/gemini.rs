//! Gemini LLM Provider
//!
//! Talks to the `generateContent` REST endpoint. Every call carries the full
//! conversation; assistant turns are sent with the `model` role.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use super::{LLMError, LLMProvider, Message, MessageRole, Result};
use crate::config::ModelConfig;
use sdk::errors::EngineError;

pub struct GeminiProvider {
    base_url: String,
    model: ModelConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: ModelConfig,
        timeout: Duration,
    ) -> std::result::Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model,
            client,
        })
    }

    /// Build the JSON request body for a conversation
    fn build_payload(messages: &[Message]) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    MessageRole::Assistant => "model",
                    MessageRole::User => "user",
                };
                json!({
                    "role": role,
                    "parts": [{"text": msg.content}]
                })
            })
            .collect();

        json!({ "contents": contents })
    }

    /// Concatenate the text parts of the first candidate
    fn extract_text(data: &serde_json::Value) -> Result<String> {
        let candidate = data
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| LLMError::ParseError("No candidates in response".to_string()))?;

        let parts = candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .ok_or_else(|| LLMError::ParseError("No parts in candidate content".to_string()))?;

        let mut full_text = String::new();
        for part in parts {
            if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                full_text.push_str(text);
            }
        }

        if full_text.trim().is_empty() {
            return Err(LLMError::EmptyResponse);
        }

        Ok(full_text)
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model.model
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model.model
        );

        let payload = Self::build_payload(messages);

        tracing::debug!(
            "Gemini request: model={}, messages={}",
            self.model.model,
            messages.len()
        );

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", self.model.credential.unsecure())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                400 | 404 => LLMError::InvalidRequest(text),
                401 | 403 => LLMError::AuthenticationFailed(text),
                429 => LLMError::RateLimitExceeded,
                _ => LLMError::ProviderUnavailable(format!(
                    "Gemini API error ({}): {}",
                    status, text
                )),
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        tracing::debug!(
            "Gemini response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        Self::extract_text(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretString;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            ModelConfig {
                credential: SecretString::new("test-key"),
                model: "gemini-2.5-flash".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_provider_properties() {
        let provider = provider();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.model(), "gemini-2.5-flash");
        assert_eq!(
            provider.base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );
    }

    #[test]
    fn test_payload_maps_roles() {
        let messages = vec![
            Message::user("You are Editor"),
            Message::assistant("Understood"),
            Message::user("Message from Requester: hi"),
        ];

        let payload = GeminiProvider::build_payload(&messages);
        let contents = payload["contents"].as_array().unwrap();

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "Message from Requester: hi");
        assert_eq!(payload.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let data = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]}
            }]
        });

        assert_eq!(GeminiProvider::extract_text(&data).unwrap(), "Hello, world");
    }

    #[test]
    fn test_extract_text_rejects_empty_reply() {
        let data = json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "  "}]}}]
        });
        assert!(matches!(
            GeminiProvider::extract_text(&data),
            Err(LLMError::EmptyResponse)
        ));

        let data = json!({"candidates": []});
        assert!(matches!(
            GeminiProvider::extract_text(&data),
            Err(LLMError::ParseError(_))
        ));
    }
}
