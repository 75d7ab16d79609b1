//! Step prompt templates
//!
//! Templates reference the run topic and earlier step outputs:
//!
//! ```text
//! We need content about '{{ topic }}'.
//! Outline: {{ steps.1.output }}
//! ```
//!
//! Step indices are 1-based. Rendering is a single left-to-right pass, so
//! text substituted from a step output is never scanned for placeholders.

use std::sync::OnceLock;

use regex::Regex;

use sdk::errors::EngineError;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("Invalid placeholder pattern")
    })
}

/// A parsed `{{ ... }}` reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `{{ topic }}`
    Topic,
    /// `{{ steps.N.output }}`
    StepOutput(usize),
}

impl Placeholder {
    /// Parse the text between the braces
    pub fn parse(expr: &str) -> Result<Self, EngineError> {
        let expr = expr.trim();
        if expr == "topic" {
            return Ok(Self::Topic);
        }

        let parts: Vec<&str> = expr.split('.').collect();
        match parts.as_slice() {
            ["steps", index, "output"] => index
                .parse::<usize>()
                .ok()
                .filter(|i| *i > 0)
                .map(Self::StepOutput)
                .ok_or_else(|| {
                    EngineError::Validation(format!(
                        "Invalid step index '{}' in placeholder '{{{{ {} }}}}'",
                        index, expr
                    ))
                }),
            _ => Err(EngineError::Validation(format!(
                "Unknown placeholder '{{{{ {} }}}}'",
                expr
            ))),
        }
    }
}

/// Every placeholder in `template`, in order of appearance
pub fn placeholders(template: &str) -> Result<Vec<Placeholder>, EngineError> {
    placeholder_regex()
        .captures_iter(template)
        .map(|caps| Placeholder::parse(caps.get(1).map_or("", |m| m.as_str())))
        .collect()
}

/// Render `template` against `topic` and stored step outputs.
///
/// `output` returns the stored output for a 1-based step index.
///
/// # Errors
/// `Validation` for an unknown placeholder or a reference to a step with no
/// stored output.
pub fn render<'a, F>(template: &str, topic: &str, output: F) -> Result<String, EngineError>
where
    F: Fn(usize) -> Option<&'a str>,
{
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for caps in placeholder_regex().captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        let expr = caps.get(1).map_or("", |m| m.as_str());

        rendered.push_str(&template[last..whole.start()]);
        match Placeholder::parse(expr)? {
            Placeholder::Topic => rendered.push_str(topic),
            Placeholder::StepOutput(index) => {
                let text = output(index).ok_or_else(|| {
                    EngineError::Validation(format!("Step {} has no output yet", index))
                })?;
                rendered.push_str(text);
            }
        }
        last = whole.end();
    }

    rendered.push_str(&template[last..]);
    Ok(rendered)
}
