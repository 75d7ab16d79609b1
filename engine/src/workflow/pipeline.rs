//! Pipeline definitions
//!
//! A `Pipeline` is an ordered list of steps. Each step names the agent that
//! answers it, the label the request is sent under, and a prompt template
//! that may reference the topic and any earlier step's output.
//!
//! Pipelines are plain data so they can be written in TOML:
//!
//! ```toml
//! name = "blog-post"
//!
//! [[steps]]
//! title = "Plan"
//! participant = "Editor"
//! sender_label = "Requester"
//! template = "We need content about '{{ topic }}'. Create a detailed outline."
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::template::{self, Placeholder};
use crate::agent::AgentRegistry;
use sdk::errors::EngineError;

/// One step of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Short human-readable name ("Plan", "Draft", ...)
    pub title: String,

    /// Name of the agent that answers this step
    pub participant: String,

    /// Label the request is attributed to
    pub sender_label: String,

    /// Prompt template
    pub template: String,

    /// Overrides the engine's cooldown after this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_after_secs: Option<u64>,
}

impl StepSpec {
    pub fn new(
        title: impl Into<String>,
        participant: impl Into<String>,
        sender_label: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            participant: participant.into(),
            sender_label: sender_label.into(),
            template: template.into(),
            cooldown_after_secs: None,
        }
    }

    pub fn with_cooldown_after(mut self, secs: u64) -> Self {
        self.cooldown_after_secs = Some(secs);
        self
    }
}

/// An ordered sequence of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    pub steps: Vec<StepSpec>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, steps: Vec<StepSpec>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step by 1-based index
    pub fn step(&self, index: usize) -> Option<&StepSpec> {
        index.checked_sub(1).and_then(|i| self.steps.get(i))
    }

    /// Distinct participants in order of first appearance
    pub fn participants(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for step in &self.steps {
            if !seen.contains(&step.participant.as_str()) {
                seen.push(&step.participant);
            }
        }
        seen
    }

    /// Statically check the pipeline against a registry.
    ///
    /// # Errors
    /// - `NotFound` if a participant is not registered
    /// - `Validation` for an empty pipeline, a blank label, an unknown
    ///   placeholder, or a reference to a step that does not run earlier
    pub fn validate(&self, registry: &AgentRegistry<'_>) -> Result<(), EngineError> {
        self.validate_with(|name| registry.contains(name))
    }

    /// Same as [`validate`](Self::validate) with a caller-supplied
    /// participant check, for validating before any session exists.
    pub fn validate_with<F>(&self, is_registered: F) -> Result<(), EngineError>
    where
        F: Fn(&str) -> bool,
    {
        if self.steps.is_empty() {
            return Err(EngineError::Validation(format!(
                "Pipeline '{}' has no steps",
                self.name
            )));
        }

        for (i, step) in self.steps.iter().enumerate() {
            let index = i + 1;

            if step.participant.trim().is_empty() {
                return Err(EngineError::Validation(format!(
                    "Step {} has no participant",
                    index
                )));
            }
            if !is_registered(&step.participant) {
                return Err(EngineError::NotFound(format!(
                    "agent '{}' (step {})",
                    step.participant, index
                )));
            }
            if step.sender_label.trim().is_empty() {
                return Err(EngineError::Validation(format!(
                    "Step {} has an empty sender label",
                    index
                )));
            }

            let placeholders = template::placeholders(&step.template).map_err(|e| match e {
                EngineError::Validation(msg) => {
                    EngineError::Validation(format!("Step {}: {}", index, msg))
                }
                other => other,
            })?;

            for placeholder in placeholders {
                if let Placeholder::StepOutput(referenced) = placeholder {
                    if referenced >= index {
                        return Err(EngineError::Validation(format!(
                            "Step {} references the output of step {}, which has not run yet",
                            index, referenced
                        )));
                    }
                }
            }
        }

        debug!(
            "Pipeline '{}' validated: {} steps, participants {:?}",
            self.name,
            self.steps.len(),
            self.participants()
        );

        Ok(())
    }

    /// Load a pipeline from a TOML file
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!(
                "Failed to read pipeline file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&contents)
    }

    /// Parse a pipeline from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse pipeline: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(name: &str) -> bool {
        matches!(name, "Editor" | "Writer" | "Reviewer")
    }

    #[test]
    fn test_blog_post_is_valid() {
        Pipeline::blog_post().validate_with(known).unwrap();
    }

    #[test]
    fn test_empty_pipeline_rejected() {
        let err = Pipeline::new("empty", vec![]).validate_with(known).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_unknown_participant_is_not_found() {
        let pipeline = Pipeline::new(
            "p",
            vec![StepSpec::new("Plan", "Publisher", "Requester", "{{ topic }}")],
        );
        let err = pipeline.validate_with(known).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(ref m) if m.contains("Publisher")));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let pipeline = Pipeline::new(
            "p",
            vec![
                StepSpec::new("Plan", "Editor", "Requester", "{{ steps.2.output }}"),
                StepSpec::new("Draft", "Writer", "Editor", "{{ topic }}"),
            ],
        );
        let err = pipeline.validate_with(known).unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref m) if m.contains("step 2")));
    }

    #[test]
    fn test_self_reference_rejected() {
        let pipeline = Pipeline::new(
            "p",
            vec![StepSpec::new("Plan", "Editor", "Requester", "{{ steps.1.output }}")],
        );
        assert!(pipeline.validate_with(known).is_err());
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let pipeline = Pipeline::new(
            "p",
            vec![StepSpec::new("Plan", "Editor", "Requester", "{{ author }}")],
        );
        let err = pipeline.validate_with(known).unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref m) if m.starts_with("Step 1: ")));
        assert_eq!(err.to_string().matches("Invalid workflow").count(), 1);
    }

    #[test]
    fn test_blank_sender_label_rejected() {
        let pipeline = Pipeline::new(
            "p",
            vec![StepSpec::new("Plan", "Editor", "  ", "{{ topic }}")],
        );
        assert!(matches!(
            pipeline.validate_with(known),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_participants_deduplicated_in_order() {
        assert_eq!(
            Pipeline::blog_post().participants(),
            vec!["Editor", "Writer", "Reviewer"]
        );
    }

    #[test]
    fn test_step_is_one_based() {
        let pipeline = Pipeline::blog_post();
        assert!(pipeline.step(0).is_none());
        assert_eq!(pipeline.step(1).unwrap().participant, "Editor");
        assert_eq!(pipeline.step(4).unwrap().participant, "Writer");
        assert!(pipeline.step(5).is_none());
    }

    #[test]
    fn test_parse_toml_pipeline() {
        let toml = r#"
name = "short"

[[steps]]
title = "Plan"
participant = "Editor"
sender_label = "Requester"
template = "Outline '{{ topic }}'"
cooldown_after_secs = 3

[[steps]]
title = "Draft"
participant = "Writer"
sender_label = "Editor"
template = "Write it.\nOutline: {{ steps.1.output }}"
"#;
        let pipeline = Pipeline::from_toml_str(toml).unwrap();
        assert_eq!(pipeline.name, "short");
        assert_eq!(pipeline.len(), 2);
        assert_eq!(
            pipeline.steps[0],
            StepSpec::new("Plan", "Editor", "Requester", "Outline '{{ topic }}'")
                .with_cooldown_after(3)
        );
        assert_eq!(pipeline.steps[1].cooldown_after_secs, None);
        pipeline.validate_with(known).unwrap();
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Pipeline::from_toml_str("name = ").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
