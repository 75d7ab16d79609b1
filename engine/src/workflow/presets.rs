//! Built-in personas and the blog-post pipeline

use sdk::types::Persona;

use super::pipeline::{Pipeline, StepSpec};

/// The Editor, Writer and Reviewer personas
pub fn default_personas() -> Vec<Persona> {
    vec![
        Persona::new(
            "Editor",
            "Senior Content Editor",
            "You are responsible for planning content. You create strong outlines and give clear direction",
        ),
        Persona::new(
            "Writer",
            "Content Writer",
            "You write engaging, high-quality blog posts based on outlines. You accept feedback gracefully",
        ),
        Persona::new(
            "Reviewer",
            "Fact Checker & Critic",
            "You are critical. You look for shallow content, logical errors, and boring introductions. Be constructive",
        ),
    ]
}

impl Pipeline {
    /// Plan, draft, critique, revise
    pub fn blog_post() -> Self {
        Pipeline::new(
            "blog-post",
            vec![
                StepSpec::new(
                    "Plan",
                    "Editor",
                    "Requester",
                    "We need content about '{{ topic }}'. Create a detailed outline.",
                ),
                StepSpec::new(
                    "Draft",
                    "Writer",
                    "Editor",
                    "Here is the outline. Write the full piece.\nOutline: {{ steps.1.output }}",
                ),
                StepSpec::new(
                    "Critique",
                    "Reviewer",
                    "Writer",
                    "Review this draft and give constructive feedback.\nDraft: {{ steps.2.output }}",
                ),
                StepSpec::new(
                    "Revise",
                    "Writer",
                    "Reviewer",
                    "Here is feedback. Revise accordingly.\nFeedback: {{ steps.3.output }}",
                ),
            ],
        )
    }
}
