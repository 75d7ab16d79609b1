//! Agents
//!
//! A persona-bound `Session` holds one conversation with the remote model.
//! The `AgentRegistry` lets a workflow address sessions by name without
//! taking ownership of them.

pub mod history;
pub mod observer;
pub mod registry;
pub mod session;

pub use history::History;
pub use observer::{RenderedTurn, TurnKind, TurnObserver};
pub use registry::AgentRegistry;
pub use session::{Session, DEFAULT_INIT_RETRY_DELAY};
