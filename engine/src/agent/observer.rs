//! Turn observation
//!
//! Presentation shells learn about each completed turn through
//! `TurnObserver` instead of the session printing anything itself.

use async_trait::async_trait;
use serde::Serialize;

/// What kind of turn was rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    /// The persona-definition turn sent by `initialize`
    Priming,
    /// A regular `exchange`
    Exchange,
}

/// A completed request/reply turn
#[derive(Debug, Clone, Serialize)]
pub struct RenderedTurn {
    pub kind: TurnKind,

    /// Name of the agent that replied
    pub agent: String,

    /// Role of the agent that replied
    pub role: String,

    /// Label of whoever sent the request ("system" for priming)
    pub sender_label: String,

    /// Raw content handed to the session, before any prefixing
    pub content: String,

    /// Reply text
    pub reply: String,
}

/// Callback invoked by a session after every successful turn
#[async_trait]
pub trait TurnObserver: Send + Sync {
    async fn on_turn_rendered(&self, turn: &RenderedTurn);
}
