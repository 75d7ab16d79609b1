//! Agent Session
//!
//! A `Session` owns one persona's conversation with the remote model.
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized --initialize ok--> Ready --exchange--> Ready
//!       |
//!       +--two failed primings--> Failed (terminal)
//! ```
//!
//! Priming is retried exactly once after `retry_delay`. Ordinary exchanges
//! are never retried here; recovering from a failed exchange is the
//! workflow's decision.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::history::History;
use super::observer::{RenderedTurn, TurnKind, TurnObserver};
use crate::llm::{LLMProvider, Message};
use sdk::errors::EngineError;
use sdk::types::{Persona, SessionState};

/// Default delay before the single priming retry
pub const DEFAULT_INIT_RETRY_DELAY: Duration = Duration::from_secs(20);

/// One persona's conversational state
pub struct Session {
    persona: Persona,
    provider: Arc<dyn LLMProvider>,
    history: History,
    state: SessionState,
    retry_delay: Duration,
    observers: Vec<Arc<dyn TurnObserver>>,
    cancel: CancellationToken,
}

impl Session {
    /// Create an uninitialized session for `persona`
    pub fn new(persona: Persona, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            persona,
            provider,
            history: History::new(),
            state: SessionState::Uninitialized,
            retry_delay: DEFAULT_INIT_RETRY_DELAY,
            observers: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the delay before the priming retry
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Register an observer notified after every successful turn
    pub fn with_observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Abort priming (including the retry delay) when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn name(&self) -> &str {
        &self.persona.name
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Prime the session with its persona definition.
    ///
    /// Calling this on a `Ready` session is a no-op. On a `Failed` session it
    /// returns `InvalidState` without contacting the provider.
    ///
    /// # Errors
    /// - `InitializationFailure` after the retry also fails (state becomes `Failed`)
    /// - `Cancelled` if cancelled while waiting (state stays `Uninitialized`)
    pub async fn initialize(&mut self) -> Result<(), EngineError> {
        match self.state {
            SessionState::Ready => return Ok(()),
            SessionState::Failed => return Err(self.invalid_state()),
            SessionState::Uninitialized => {}
        }

        let prompt = self.persona.priming_prompt();

        let first_error = match self.prime(&prompt).await {
            Ok(()) => return Ok(()),
            Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
            Err(e) => e,
        };

        warn!(
            "Priming {} failed ({}), retrying in {}s",
            self.persona.name,
            first_error,
            self.retry_delay.as_secs()
        );

        tokio::select! {
            _ = self.cancel.cancelled() => return Err(EngineError::Cancelled),
            _ = tokio::time::sleep(self.retry_delay) => {}
        }

        match self.prime(&prompt).await {
            Ok(()) => Ok(()),
            Err(EngineError::Cancelled) => Err(EngineError::Cancelled),
            Err(e) => {
                self.state = SessionState::Failed;
                error!("Failed to initialize {}: {}", self.persona.name, e);
                Err(EngineError::InitializationFailure {
                    agent: self.persona.name.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// One priming attempt. Only a successful reply touches history or state.
    async fn prime(&mut self, prompt: &str) -> Result<(), EngineError> {
        let request = [Message::user(prompt)];

        let reply = tokio::select! {
            _ = self.cancel.cancelled() => return Err(EngineError::Cancelled),
            reply = self.provider.generate(&request) => reply?,
        };

        self.history
            .record_exchange(Message::user(prompt), Message::assistant(&reply));
        self.state = SessionState::Ready;

        info!(
            "[{}] initialized as {} ({}/{})",
            self.persona.name,
            self.persona.role,
            self.provider.name(),
            self.provider.model()
        );

        self.notify(RenderedTurn {
            kind: TurnKind::Priming,
            agent: self.persona.name.clone(),
            role: self.persona.role.clone(),
            sender_label: "system".to_string(),
            content: prompt.to_string(),
            reply,
        })
        .await;

        Ok(())
    }

    /// Send `content` on behalf of `sender_label` and return the reply.
    ///
    /// The outbound message is `"Message from {sender_label}: {content}"`.
    /// History is only appended once a reply has arrived, so dropping this
    /// future mid-flight leaves the session unchanged.
    ///
    /// # Errors
    /// - `InvalidState` if the session is not `Ready` (no remote call is made)
    /// - `Remote` if the provider fails or returns an empty reply
    pub async fn exchange(
        &mut self,
        content: &str,
        sender_label: &str,
    ) -> Result<String, EngineError> {
        if self.state != SessionState::Ready {
            return Err(self.invalid_state());
        }

        info!("--- {} -> {} ---", sender_label, self.persona.name);

        let prompt = format!("Message from {}: {}", sender_label, content);
        let mut request = self.history.messages().to_vec();
        request.push(Message::user(&prompt));

        debug!(
            "{} request: {} messages, ~{} tokens of history",
            self.persona.name,
            request.len(),
            self.history.token_count()
        );

        let reply = self.provider.generate(&request).await?;

        self.history
            .record_exchange(Message::user(prompt), Message::assistant(&reply));

        self.notify(RenderedTurn {
            kind: TurnKind::Exchange,
            agent: self.persona.name.clone(),
            role: self.persona.role.clone(),
            sender_label: sender_label.to_string(),
            content: content.to_string(),
            reply: reply.clone(),
        })
        .await;

        Ok(reply)
    }

    async fn notify(&self, turn: RenderedTurn) {
        for observer in &self.observers {
            observer.on_turn_rendered(&turn).await;
        }
    }

    fn invalid_state(&self) -> EngineError {
        EngineError::InvalidState {
            agent: self.persona.name.clone(),
            state: self.state,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("persona", &self.persona.name)
            .field("state", &self.state)
            .field("provider", &self.provider.name())
            .field("history_len", &self.history.len())
            .finish()
    }
}
