//! Integration tests for the HTTP model providers
//!
//! Both providers are exercised against wiremock servers; no real model
//! endpoint is contacted.

use std::time::Duration;

use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use penwright_engine::config::{Config, ModelConfig, ProviderKind};
use penwright_engine::llm::{
    build_provider, gemini::GeminiProvider, ollama::OllamaProvider, LLMError, LLMProvider, Message,
};
use penwright_engine::secrets::SecretString;

const MODEL: &str = "gemini-2.5-flash";

fn gemini(server: &MockServer) -> GeminiProvider {
    GeminiProvider::new(
        server.uri(),
        ModelConfig {
            credential: SecretString::from("test-key"),
            model: MODEL.to_string(),
        },
        Duration::from_secs(5),
    )
    .unwrap()
}

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] }
        }]
    })
}

#[tokio::test]
async fn test_gemini_generate_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/models/{}:generateContent", MODEL)))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "Hello" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = gemini(&server)
        .generate(&[Message::user("Hello")])
        .await
        .unwrap();

    assert_eq!(reply, "Hi there");
}

#[tokio::test]
async fn test_gemini_status_mapping() {
    let cases = [
        (429, "rate"),
        (401, "auth"),
        (400, "invalid"),
        (503, "unavailable"),
    ];

    for (status, kind) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = gemini(&server)
            .generate(&[Message::user("Hello")])
            .await
            .unwrap_err();

        let matched = match kind {
            "rate" => matches!(err, LLMError::RateLimitExceeded),
            "auth" => matches!(err, LLMError::AuthenticationFailed(_)),
            "invalid" => matches!(err, LLMError::InvalidRequest(_)),
            _ => matches!(err, LLMError::ProviderUnavailable(_)),
        };
        assert!(matched, "status {} produced {:?}", status, err);
    }
}

#[tokio::test]
async fn test_gemini_empty_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("   ")))
        .mount(&server)
        .await;

    let err = gemini(&server)
        .generate(&[Message::user("Hello")])
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::EmptyResponse));
}

#[tokio::test]
async fn test_ollama_generate_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "model": "llama3.1:8b", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.1:8b",
            "message": { "role": "assistant", "content": "Outline: A, B, C" },
            "done": true
        })))
        .mount(&server)
        .await;

    let provider =
        OllamaProvider::new(server.uri(), "llama3.1:8b", Duration::from_secs(5)).unwrap();
    let reply = provider.generate(&[Message::user("Plan")]).await.unwrap();

    assert_eq!(provider.name(), "ollama");
    assert_eq!(reply, "Outline: A, B, C");
}

#[tokio::test]
async fn test_ollama_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider =
        OllamaProvider::new(server.uri(), "llama3.1:8b", Duration::from_secs(5)).unwrap();
    let err = provider.generate(&[Message::user("Plan")]).await.unwrap_err();

    assert!(matches!(err, LLMError::ProviderUnavailable(_)));
}

#[tokio::test]
async fn test_build_provider_routes_to_mock() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "role": "assistant", "content": "local reply" },
            "done": true
        })))
        .mount(&server)
        .await;

    let mut config = Config::default_config();
    config.llm.provider = ProviderKind::Ollama;
    config.llm.ollama.base_url = server.uri();

    let provider = build_provider(&config, None).unwrap();
    let reply = provider.generate(&[Message::user("hi")]).await.unwrap();

    assert_eq!(reply, "local reply");
}

#[test]
fn test_build_gemini_without_key_fails() {
    let config = Config::default_config();
    assert!(build_provider(&config, None).is_err());
}
