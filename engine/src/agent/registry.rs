//! Agent Registry
//!
//! Maps agent names to live sessions for the duration of a run. The registry
//! borrows sessions rather than owning them: whoever created a session keeps
//! it, and the borrow checker guarantees the registry cannot outlive it.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::session::Session;
use sdk::errors::EngineError;

/// Name-indexed view over borrowed sessions
#[derive(Debug, Default)]
pub struct AgentRegistry<'a> {
    sessions: HashMap<String, &'a mut Session>,
}

impl<'a> AgentRegistry<'a> {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Register a session under its persona name.
    ///
    /// Registering a second session with the same name replaces the first.
    pub fn register(&mut self, session: &'a mut Session) {
        let name = session.name().to_string();
        if self.sessions.insert(name.clone(), session).is_some() {
            warn!("Agent '{}' re-registered, previous session replaced", name);
        } else {
            debug!("Registered agent '{}'", name);
        }
    }

    /// Look up a session for exchanging messages.
    ///
    /// # Errors
    /// `NotFound` if no session is registered under `name`.
    pub fn resolve(&mut self, name: &str) -> Result<&mut Session, EngineError> {
        self.sessions
            .get_mut(name)
            .map(|session| &mut **session)
            .ok_or_else(|| EngineError::NotFound(format!("agent '{}'", name)))
    }

    /// Read-only lookup
    pub fn get(&self, name: &str) -> Result<&Session, EngineError> {
        self.sessions
            .get(name)
            .map(|session| &**session)
            .ok_or_else(|| EngineError::NotFound(format!("agent '{}'", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sessions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sessions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMProvider, Message};
    use async_trait::async_trait;
    use sdk::types::Persona;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl LLMProvider for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo"
        }

        async fn generate(&self, messages: &[Message]) -> crate::llm::Result<String> {
            Ok(messages.last().map(|m| m.content.clone()).unwrap_or_default())
        }
    }

    fn session(name: &str, role: &str) -> Session {
        Session::new(Persona::new(name, role, "Do the job"), Arc::new(Echo))
    }

    #[test]
    fn test_resolve_unknown_is_not_found() {
        let mut registry = AgentRegistry::new();
        let err = registry.resolve("Ghost").unwrap_err();
        assert!(matches!(err, EngineError::NotFound(ref s) if s.contains("Ghost")));
        assert!(registry.get("Ghost").is_err());
    }

    #[test]
    fn test_register_and_resolve() {
        let mut editor = session("Editor", "Senior Content Editor");
        let mut writer = session("Writer", "Content Writer");

        let mut registry = AgentRegistry::new();
        registry.register(&mut editor);
        registry.register(&mut writer);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["Editor", "Writer"]);
        assert_eq!(registry.resolve("Writer").unwrap().name(), "Writer");
        assert!(registry.contains("Editor"));
    }

    #[test]
    fn test_duplicate_name_overwrites() {
        let mut first = session("Editor", "First");
        let mut second = session("Editor", "Second");

        let mut registry = AgentRegistry::new();
        registry.register(&mut first);
        registry.register(&mut second);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Editor").unwrap().persona().role, "Second");
    }

    #[tokio::test]
    async fn test_resolved_session_mutations_are_visible_to_owner() {
        let mut editor = session("Editor", "Senior Content Editor");
        {
            let mut registry = AgentRegistry::new();
            registry.register(&mut editor);
            let resolved = registry.resolve("Editor").unwrap();
            resolved.initialize().await.unwrap();
        }
        assert!(editor.is_ready());
        assert_eq!(editor.history().len(), 2);
    }
}
