//! Penwright Engine Library
//!
//! Persona-bound agent sessions, a name-indexed agent registry and a
//! sequential workflow engine in which an Editor, a Writer and a Reviewer
//! collaborate on a piece of content. Used by the `penwright` binary and by
//! the integration tests.

/// Configuration management module
pub mod config;

/// Credential handling
pub mod secrets;

/// Model provider abstraction layer
pub mod llm;

/// Persona sessions and the agent registry
pub mod agent;

/// Pipelines and the workflow engine
pub mod workflow;

/// Message bus for progress events
pub mod message_bus;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
