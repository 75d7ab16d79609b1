//! Workflow observation
//!
//! Shells subscribe to run progress through `WorkflowObserver`. Only
//! `on_step_complete` is required.

use std::time::Duration;

use async_trait::async_trait;

use super::run::WorkflowRun;

#[async_trait]
pub trait WorkflowObserver: Send + Sync {
    /// A step is about to send its request
    async fn on_step_started(&self, _step_index: usize, _participant: &str, _title: &str) {}

    /// A step produced `output`
    async fn on_step_complete(&self, step_index: usize, participant: &str, output: &str);

    /// The engine is pausing after `step_index`
    async fn on_cooldown(&self, _step_index: usize, _duration: Duration) {}

    /// The run completed or aborted
    async fn on_run_finished(&self, _run: &WorkflowRun) {}
}
