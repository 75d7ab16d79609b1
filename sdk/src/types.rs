//! Persona and session-state types

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed behavioral identity an agent session embodies for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Unique name within a registry (e.g. "Editor")
    pub name: String,

    /// Short role description (e.g. "Senior Content Editor")
    pub role: String,

    /// Free-text behavioral directive
    pub instructions: String,
}

impl Persona {
    /// Create a new persona
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            instructions: instructions.into(),
        }
    }

    /// The priming message that establishes this persona's behavior.
    pub fn priming_prompt(&self) -> String {
        format!(
            "You are {}, a {}. Your instructions are: {}. \
             Keep responses professional but conversational; do not break character.",
            self.name, self.role, self.instructions
        )
    }
}

/// Lifecycle of an agent session.
///
/// `Uninitialized -> Ready` on successful priming, `Uninitialized -> Failed`
/// when priming fails twice. `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Uninitialized,
    Ready,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}
