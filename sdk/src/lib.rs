//! Penwright SDK
//!
//! Shared types used by the engine and by presentation shells that drive it.
//! Shells only need this crate to interpret errors and describe personas.

/// Error types and handling
pub mod errors;

/// Persona and session-state types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, PenwrightErrorExt};
pub use types::{Persona, SessionState};
