//! Shared test helpers

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use penwright_engine::agent::Session;
use penwright_engine::llm::{LLMError, LLMProvider, Message, Result};
use sdk::types::Persona;

/// In-memory provider that replays scripted replies in order and records
/// every request it receives.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// A provider that acknowledges priming and then answers `replies`
    pub fn primed(replies: &[&str]) -> Arc<Self> {
        let mut script = vec![Ok("Understood.".to_string())];
        script.extend(replies.iter().map(|r| Ok(r.to_string())));
        Self::new(script)
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The last user message of every request, in order
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LLMError::ProviderUnavailable(
                "script exhausted".to_string(),
            )))
    }
}

/// Acknowledges priming, then never answers another request
pub struct StallingProvider {
    calls: Mutex<usize>,
}

impl StallingProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LLMProvider for StallingProvider {
    fn name(&self) -> &str {
        "stalling"
    }

    fn model(&self) -> &str {
        "stalling-1"
    }

    async fn generate(&self, _messages: &[Message]) -> Result<String> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if call == 1 {
            return Ok("Understood.".to_string());
        }
        std::future::pending().await
    }
}

pub fn editor() -> Persona {
    Persona::new(
        "Editor",
        "Senior Content Editor",
        "You are responsible for planning content",
    )
}

pub fn writer() -> Persona {
    Persona::new("Writer", "Content Writer", "You write engaging blog posts")
}

pub fn reviewer() -> Persona {
    Persona::new("Reviewer", "Fact Checker & Critic", "You are critical")
}

/// An initialized session backed by `provider`
pub async fn ready_session<P>(persona: Persona, provider: Arc<P>) -> Session
where
    P: LLMProvider + 'static,
{
    let mut session = Session::new(persona, provider);
    session
        .initialize()
        .await
        .expect("scripted priming should succeed");
    session
}
