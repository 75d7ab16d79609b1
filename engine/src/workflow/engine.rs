//! Workflow Engine
//!
//! Runs a `Pipeline` over registered sessions, one step at a time:
//!
//! 1. Render the step template from the topic and stored outputs
//! 2. Send it to the participant's session
//! 3. Store the reply under the step index and notify observers
//! 4. Cool down before the next step (never after the last one)
//!
//! The first failing step aborts the run. The error carries the step index,
//! the participant and the partial run, which can be passed to
//! [`WorkflowEngine::resume`] once the cause is dealt with.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::cooldown::CooldownPolicy;
use super::observer::WorkflowObserver;
use super::pipeline::{Pipeline, StepSpec};
use super::run::{RunStatus, StepOutput, WorkflowRun};
use super::template;
use crate::agent::AgentRegistry;
use sdk::errors::EngineError;

/// A step failed and the run was aborted
#[derive(Debug)]
pub struct WorkflowFailure {
    /// 1-based index of the failed step
    pub step_index: usize,
    pub participant: String,
    pub error: EngineError,

    /// Everything produced before the failure
    pub run: WorkflowRun,
}

impl std::fmt::Display for WorkflowFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Step {} ({}) failed: {}",
            self.step_index, self.participant, self.error
        )
    }
}

/// Errors returned by [`WorkflowEngine::run`] and [`WorkflowEngine::resume`]
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The pipeline or registry was rejected before any step ran
    #[error("Workflow setup failed: {0}")]
    Setup(#[from] EngineError),

    /// A step failed mid-run
    #[error("{0}")]
    StepFailed(Box<WorkflowFailure>),
}

impl WorkflowError {
    pub fn failure(&self) -> Option<&WorkflowFailure> {
        match self {
            WorkflowError::StepFailed(failure) => Some(failure),
            WorkflowError::Setup(_) => None,
        }
    }

    /// The partial run, if any step was attempted
    pub fn into_run(self) -> Option<WorkflowRun> {
        match self {
            WorkflowError::StepFailed(failure) => Some(failure.run),
            WorkflowError::Setup(_) => None,
        }
    }

    /// The underlying engine error
    pub fn cause(&self) -> &EngineError {
        match self {
            WorkflowError::Setup(e) => e,
            WorkflowError::StepFailed(failure) => &failure.error,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.cause(), EngineError::Cancelled)
    }
}

/// Sequential step executor
pub struct WorkflowEngine {
    cooldown: Arc<dyn CooldownPolicy>,
    observers: Vec<Arc<dyn WorkflowObserver>>,
    cancel: CancellationToken,
}

impl WorkflowEngine {
    pub fn new(cooldown: Arc<dyn CooldownPolicy>) -> Self {
        Self {
            cooldown,
            observers: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn WorkflowObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Abort in-flight exchanges and cooldowns when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Execute `pipeline` for `topic`.
    ///
    /// The pipeline is validated and every participant must be `Ready`
    /// before the first step is sent.
    pub async fn run(
        &self,
        topic: &str,
        registry: &mut AgentRegistry<'_>,
        pipeline: &Pipeline,
    ) -> Result<WorkflowRun, WorkflowError> {
        Self::check_runnable(registry, pipeline)?;

        let run = WorkflowRun::new(&pipeline.name, topic, pipeline.len());
        info!(
            "Starting run {} of '{}' ({} steps) on '{}'",
            run.id,
            pipeline.name,
            pipeline.len(),
            topic
        );

        self.execute(run, registry, pipeline).await
    }

    /// Continue an aborted run from its first missing step.
    ///
    /// Stored outputs are reused as-is and no cooldown is applied before the
    /// resumed step. A completed run is returned unchanged.
    pub async fn resume(
        &self,
        mut run: WorkflowRun,
        registry: &mut AgentRegistry<'_>,
        pipeline: &Pipeline,
    ) -> Result<WorkflowRun, WorkflowError> {
        if run.pipeline != pipeline.name || run.total_steps != pipeline.len() {
            return Err(WorkflowError::Setup(EngineError::Validation(format!(
                "Run {} belongs to pipeline '{}' ({} steps), not '{}' ({} steps)",
                run.id,
                run.pipeline,
                run.total_steps,
                pipeline.name,
                pipeline.len()
            ))));
        }

        if run.is_complete() {
            return Ok(run);
        }

        Self::check_runnable(registry, pipeline)?;

        info!(
            "Resuming run {} at step {}",
            run.id,
            run.next_step_index().unwrap_or(pipeline.len())
        );
        run.status = RunStatus::Running;
        run.finished_at = None;

        self.execute(run, registry, pipeline).await
    }

    fn check_runnable(
        registry: &AgentRegistry<'_>,
        pipeline: &Pipeline,
    ) -> Result<(), EngineError> {
        pipeline.validate(registry)?;

        for name in pipeline.participants() {
            let session = registry.get(name)?;
            if !session.is_ready() {
                return Err(EngineError::InvalidState {
                    agent: name.to_string(),
                    state: session.state(),
                });
            }
        }

        Ok(())
    }

    async fn execute(
        &self,
        mut run: WorkflowRun,
        registry: &mut AgentRegistry<'_>,
        pipeline: &Pipeline,
    ) -> Result<WorkflowRun, WorkflowError> {
        let total = pipeline.len();

        for (i, step) in pipeline.steps.iter().enumerate() {
            let index = i + 1;
            if run.outputs.contains_key(&index) {
                continue;
            }

            run.current_step = Some(index);

            if self.cancel.is_cancelled() {
                return Err(self.abort(run, index, step, EngineError::Cancelled).await);
            }

            let prompt = match template::render(&step.template, &run.topic, |n| run.output(n)) {
                Ok(prompt) => prompt,
                Err(e) => return Err(self.abort(run, index, step, e).await),
            };

            info!("Step {}/{}: {} ({})", index, total, step.title, step.participant);
            for observer in &self.observers {
                observer
                    .on_step_started(index, &step.participant, &step.title)
                    .await;
            }

            let started = Instant::now();
            let reply = match registry.resolve(&step.participant) {
                Ok(session) => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => Err(EngineError::Cancelled),
                        reply = session.exchange(&prompt, &step.sender_label) => reply,
                    }
                }
                Err(e) => Err(e),
            };

            let output = match reply {
                Ok(output) => output,
                Err(e) => return Err(self.abort(run, index, step, e).await),
            };

            let duration_ms = started.elapsed().as_millis() as u64;
            debug!(
                "Step {} produced {} chars in {}ms",
                index,
                output.len(),
                duration_ms
            );

            run.record(
                index,
                StepOutput {
                    participant: step.participant.clone(),
                    sender_label: step.sender_label.clone(),
                    prompt,
                    output: output.clone(),
                    duration_ms,
                },
            );

            for observer in &self.observers {
                observer
                    .on_step_complete(index, &step.participant, &output)
                    .await;
            }

            if index < total {
                let pause = self.pause_after(index, step);
                if !pause.is_zero() {
                    info!("Cooling down for {}s", pause.as_secs_f64());
                    for observer in &self.observers {
                        observer.on_cooldown(index, pause).await;
                    }

                    let cancelled = tokio::select! {
                        _ = self.cancel.cancelled() => true,
                        _ = tokio::time::sleep(pause) => false,
                    };

                    if cancelled {
                        let next = &pipeline.steps[index];
                        run.current_step = Some(index + 1);
                        return Err(self.abort(run, index + 1, next, EngineError::Cancelled).await);
                    }
                }
            }
        }

        run.finish(RunStatus::Completed);
        info!("Run {} completed ({} steps)", run.id, run.outputs.len());
        for observer in &self.observers {
            observer.on_run_finished(&run).await;
        }

        Ok(run)
    }

    fn pause_after(&self, index: usize, step: &StepSpec) -> Duration {
        step.cooldown_after_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.cooldown.cooldown(index))
    }

    async fn abort(
        &self,
        mut run: WorkflowRun,
        index: usize,
        step: &StepSpec,
        error: EngineError,
    ) -> WorkflowError {
        run.finish(RunStatus::Aborted);

        match error {
            EngineError::Cancelled => info!("Run {} cancelled at step {}", run.id, index),
            ref e => error!(
                "Run {} aborted at step {} ({}): {}",
                run.id, index, step.participant, e
            ),
        }

        for observer in &self.observers {
            observer.on_run_finished(&run).await;
        }

        WorkflowError::StepFailed(Box::new(WorkflowFailure {
            step_index: index,
            participant: step.participant.clone(),
            error,
            run,
        }))
    }
}
