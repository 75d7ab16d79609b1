//! Workflow Run record
//!
//! Everything a run has produced so far. A run that aborted still carries
//! the outputs of every step that completed, so it can be inspected or
//! handed back to `WorkflowEngine::resume`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Aborted,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Aborted => write!(f, "aborted"),
        }
    }
}

/// What one step produced
#[derive(Debug, Clone, Serialize)]
pub struct StepOutput {
    pub participant: String,
    pub sender_label: String,

    /// Rendered prompt, before the session adds the sender prefix
    pub prompt: String,

    /// Reply text
    pub output: String,
    pub duration_ms: u64,
}

/// One execution of a pipeline
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRun {
    pub id: Uuid,
    pub pipeline: String,
    pub topic: String,

    /// Outputs keyed by 1-based step index
    pub outputs: BTreeMap<usize, StepOutput>,

    /// Step currently executing, or the last one attempted
    pub current_step: Option<usize>,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Number of steps in the pipeline
    pub total_steps: usize,
}

impl WorkflowRun {
    pub fn new(pipeline: impl Into<String>, topic: impl Into<String>, total_steps: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            pipeline: pipeline.into(),
            topic: topic.into(),
            outputs: BTreeMap::new(),
            current_step: None,
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            total_steps,
        }
    }

    /// Output text of a 1-based step
    pub fn output(&self, index: usize) -> Option<&str> {
        self.outputs.get(&index).map(|s| s.output.as_str())
    }

    /// Full record of a 1-based step
    pub fn step(&self, index: usize) -> Option<&StepOutput> {
        self.outputs.get(&index)
    }

    /// Output of the last step, once the run has completed
    pub fn final_artifact(&self) -> Option<&str> {
        match self.status {
            RunStatus::Completed => self.output(self.total_steps),
            _ => None,
        }
    }

    /// First step without a stored output
    pub fn next_step_index(&self) -> Option<usize> {
        (1..=self.total_steps).find(|i| !self.outputs.contains_key(i))
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub(crate) fn record(&mut self, index: usize, output: StepOutput) {
        self.outputs.insert(index, output);
    }

    pub(crate) fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }
}
