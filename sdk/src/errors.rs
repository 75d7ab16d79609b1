//! Error types and handling
//!
//! This module provides the error types used throughout the Penwright engine.
//! All errors implement the `PenwrightErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! # Taxonomy
//!
//! - **Setup**: `InitializationFailure`, `NotFound`, `Validation`, `Config`.
//!   Raised before a workflow run starts and prevent it from starting.
//! - **Run**: `Remote`, `Cancelled`. Abort the current run only; the
//!   process and any primed sessions stay usable.
//! - **Contract**: `InvalidState`. A caller used a session outside `Ready`.
//!
//! Credentials never appear in error messages; providers scrub them before
//! constructing an error.

use thiserror::Error;

use crate::types::SessionState;

/// Trait for Penwright error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait PenwrightErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is a static string, safe to display to end users.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors abort a single run; retrying the run (or the failed
    /// step) with the same sessions may succeed. Non-recoverable errors need
    /// a configuration change.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, PenwrightErrorExt};
///
/// let error = EngineError::Remote("quota exhausted".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::NotFound("Editor".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Session errors
    #[error("Failed to initialize agent '{agent}': {reason}")]
    InitializationFailure { agent: String, reason: String },

    #[error("Agent '{agent}' is {state}, expected ready")]
    InvalidState { agent: String, state: SessionState },

    // Registry errors
    #[error("Agent not found: {0}")]
    NotFound(String),

    // Workflow errors
    #[error("Invalid workflow: {0}")]
    Validation(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Operation cancelled")]
    Cancelled,

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PenwrightErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::InitializationFailure { .. } => {
                "Agent could not be primed. Check your API key, model name and quota"
            }
            Self::InvalidState { .. } => {
                "Prime the agent successfully before sending it messages"
            }
            Self::NotFound(_) => "Register every agent the pipeline names before running it",
            Self::Validation(_) => "Fix the pipeline definition before running it",
            Self::Remote(_) => "The model provider failed. Wait a moment and retry the run",
            Self::Cancelled => "The run was cancelled. Completed steps are kept",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::Cancelled | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_errors_are_fatal() {
        let errors = [
            EngineError::Config("bad".to_string()),
            EngineError::NotFound("Editor".to_string()),
            EngineError::Validation("step 2 references step 3".to_string()),
            EngineError::InitializationFailure {
                agent: "Writer".to_string(),
                reason: "429".to_string(),
            },
        ];

        for err in errors {
            assert!(!err.is_recoverable(), "{err} should not be recoverable");
        }
    }

    #[test]
    fn test_run_errors_are_recoverable() {
        assert!(EngineError::Remote("timeout".to_string()).is_recoverable());
        assert!(EngineError::Cancelled.is_recoverable());
    }

    #[test]
    fn test_error_messages_name_the_agent() {
        let err = EngineError::InvalidState {
            agent: "Reviewer".to_string(),
            state: SessionState::Failed,
        };
        assert_eq!(
            err.to_string(),
            "Agent 'Reviewer' is failed, expected ready"
        );

        let err = EngineError::InitializationFailure {
            agent: "Editor".to_string(),
            reason: "network down".to_string(),
        };
        assert!(err.to_string().contains("Editor"));
        assert!(err.to_string().contains("network down"));
    }
}
