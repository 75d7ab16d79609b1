//! Workflows
//!
//! Multi-agent collaboration as an ordered pipeline of steps executed by
//! the `WorkflowEngine`.

pub mod cooldown;
pub mod engine;
pub mod observer;
pub mod pipeline;
pub mod presets;
pub mod run;
pub mod template;

pub use cooldown::{CooldownPolicy, FixedCooldown, NoCooldown};
pub use engine::{WorkflowEngine, WorkflowError, WorkflowFailure};
pub use observer::WorkflowObserver;
pub use pipeline::{Pipeline, StepSpec};
pub use presets::default_personas;
pub use run::{RunStatus, StepOutput, WorkflowRun};
