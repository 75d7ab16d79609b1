//! Command handlers for CLI operations
//!
//! - run: prime the personas and execute a pipeline on a topic
//! - validate: static pipeline check, no model calls
//! - personas: list configured personas

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::agent::{AgentRegistry, Session};
use crate::config::{Config, ProviderKind};
use crate::llm::build_provider;
use crate::message_bus::{Event, EventType, MessageBus};
use crate::secrets::{resolve_credential, scrub_secrets};
use crate::workflow::{FixedCooldown, Pipeline, WorkflowEngine, WorkflowError};
use sdk::errors::{EngineError, PenwrightErrorExt};
use sdk::types::Persona;

/// Topic used when none is given
pub const DEFAULT_TOPIC: &str = "The Future of AI Agents";

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON lines for machine consumption
    Json,
}

/// Arguments of `penwright run`
#[derive(Debug, Default)]
pub struct RunArgs {
    pub topic: Option<String>,
    pub pipeline: Option<std::path::PathBuf>,
    pub cooldown: Option<u64>,
    pub api_key: Option<String>,
}

/// Load a pipeline file, or the blog-post pipeline when `path` is `None`
pub fn load_pipeline(path: Option<&Path>) -> Result<Pipeline> {
    match path {
        Some(path) => Pipeline::load_from_path(path)
            .with_context(|| format!("Failed to load pipeline {}", path.display())),
        None => Ok(Pipeline::blog_post()),
    }
}

/// Personas the pipeline needs, in order of first appearance.
///
/// Fails if the pipeline does not validate against the configured personas.
pub fn personas_for(config: &Config, pipeline: &Pipeline) -> Result<Vec<Persona>, EngineError> {
    pipeline.validate_with(|name| config.agents.iter().any(|p| p.name == name))?;

    Ok(pipeline
        .participants()
        .into_iter()
        .filter_map(|name| config.agents.iter().find(|p| p.name == name).cloned())
        .collect())
}

/// Initialize `sessions` in order, pausing `stagger` between them
async fn prime_sessions(
    sessions: &mut [Session],
    stagger: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    for (i, session) in sessions.iter_mut().enumerate() {
        if i > 0 && !stagger.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(EngineError::Cancelled.into()),
                _ = tokio::time::sleep(stagger) => {}
            }
        }

        let name = session.name().to_string();
        session
            .initialize()
            .await
            .map_err(|e| anyhow::anyhow!(scrub_secrets(&e.to_string())))
            .with_context(|| format!("Could not initialize {}", name))?;
    }
    Ok(())
}

/// Run a collaboration
///
/// Primes one session per participating persona, pausing between primings,
/// then executes the pipeline. Progress is streamed through a `MessageBus`
/// printer task; the final artifact is printed once the run completes.
pub async fn handle_run(
    args: RunArgs,
    config: &Config,
    format: OutputFormat,
    cancel: CancellationToken,
) -> Result<()> {
    let pipeline = load_pipeline(args.pipeline.as_deref())?;
    let personas = personas_for(config, &pipeline).context("Pipeline is not runnable")?;

    let topic = match args.topic {
        Some(topic) => topic,
        None => prompt_topic()?,
    };

    let credential = match config.llm.provider {
        ProviderKind::Gemini => Some(resolve_credential(
            args.api_key.as_deref(),
            &config.llm.gemini.api_key_env,
        )?),
        ProviderKind::Ollama => None,
    };
    let provider = build_provider(config, credential)?;

    let bus = MessageBus::new();
    let printer = spawn_printer(bus.subscribe(EventType::All).await, format);

    if format == OutputFormat::Text {
        println!("Topic: {}", topic);
        println!(
            "Initializing {} agents on {} ({})...",
            personas.len(),
            provider.name(),
            provider.model()
        );
    }

    let mut sessions: Vec<Session> = personas
        .into_iter()
        .map(|persona| {
            Session::new(persona, Arc::clone(&provider))
                .with_retry_delay(config.session.init_retry_delay())
                .with_observer(Arc::new(bus.clone()))
                .with_cancellation(cancel.clone())
        })
        .collect();

    if let Err(e) = prime_sessions(&mut sessions, config.session.init_stagger(), &cancel).await {
        drop(sessions);
        drop(bus);
        printer.await.ok();
        return Err(e);
    }

    let cooldown_secs = args.cooldown.unwrap_or(config.workflow.cooldown_secs);
    let engine = WorkflowEngine::new(Arc::new(FixedCooldown::from_secs(cooldown_secs)))
        .with_observer(Arc::new(bus.clone()))
        .with_cancellation(cancel);

    let result = {
        let mut registry = AgentRegistry::new();
        for session in sessions.iter_mut() {
            registry.register(session);
        }
        engine.run(&topic, &mut registry, &pipeline).await
    };

    // Every bus clone must be gone before the printer sees end-of-stream
    drop(engine);
    drop(sessions);
    drop(bus);
    printer.await.ok();

    match result {
        Ok(run) => {
            match format {
                OutputFormat::Text => {
                    println!();
                    println!("=== FINAL RESULT ===");
                    println!("{}", run.final_artifact().unwrap_or_default());
                    println!();
                    println!("✓ Run {} completed", run.id);
                    for (index, step) in &run.outputs {
                        println!(
                            "  Step {} ({}): {}ms",
                            index, step.participant, step.duration_ms
                        );
                    }
                }
                OutputFormat::Json => {
                    let output = json!({
                        "status": "completed",
                        "final": run.final_artifact(),
                        "run": run,
                    });
                    println!("{}", serde_json::to_string(&output)?);
                }
            }
            Ok(())
        }
        Err(e) => {
            let message = scrub_secrets(&e.to_string());
            match format {
                OutputFormat::Text => {
                    println!();
                    println!("✗ {}", message);
                    println!("  Hint: {}", e.cause().user_hint());
                    if let WorkflowError::StepFailed(failure) = &e {
                        let done: Vec<String> =
                            failure.run.outputs.keys().map(|i| i.to_string()).collect();
                        if !done.is_empty() {
                            println!("  Completed steps: {}", done.join(", "));
                        }
                    }
                }
                OutputFormat::Json => {
                    let failure = e.failure();
                    let status = if e.is_cancelled() { "cancelled" } else { "failed" };
                    let output = json!({
                        "status": status,
                        "error": message,
                        "step_index": failure.map(|f| f.step_index),
                        "participant": failure.map(|f| f.participant.as_str()),
                        "run": failure.map(|f| &f.run),
                    });
                    println!("{}", serde_json::to_string(&output)?);
                }
            }
            Err(anyhow::anyhow!(message))
        }
    }
}

/// Statically validate a pipeline against the configured personas
pub async fn handle_validate(
    pipeline: Option<&Path>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let pipeline = load_pipeline(pipeline)?;
    let result = personas_for(config, &pipeline);

    match format {
        OutputFormat::Text => match &result {
            Ok(_) => {
                println!(
                    "✓ Pipeline '{}' is valid ({} steps)",
                    pipeline.name,
                    pipeline.len()
                );
                for (i, step) in pipeline.steps.iter().enumerate() {
                    println!(
                        "  {}. {} -> {} [{}]",
                        i + 1,
                        step.sender_label,
                        step.participant,
                        step.title
                    );
                }
            }
            Err(e) => {
                println!("✗ Pipeline '{}' is invalid: {}", pipeline.name, e);
                println!("  Hint: {}", e.user_hint());
            }
        },
        OutputFormat::Json => {
            let output = json!({
                "pipeline": pipeline.name,
                "valid": result.is_ok(),
                "steps": pipeline.len(),
                "error": result.as_ref().err().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    result.map(|_| ()).map_err(Into::into)
}

/// List configured personas
pub async fn handle_personas(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Personas ({}):", config.agents.len());
            println!();
            for persona in &config.agents {
                println!("  {} - {}", persona.name, persona.role);
                println!("    {}", persona.instructions);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "personas": config.agents,
                "count": config.agents.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Ask for a topic on the terminal, falling back to [`DEFAULT_TOPIC`]
fn prompt_topic() -> Result<String> {
    if !io::stdin().is_terminal() {
        return Ok(DEFAULT_TOPIC.to_string());
    }

    print!("Enter a topic [{}]: ", DEFAULT_TOPIC);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read topic")?;

    let topic = line.trim();
    Ok(if topic.is_empty() {
        DEFAULT_TOPIC.to_string()
    } else {
        topic.to_string()
    })
}

/// Print bus events until every publisher is dropped
fn spawn_printer(
    mut rx: tokio::sync::mpsc::Receiver<Event>,
    format: OutputFormat,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match format {
                OutputFormat::Json => match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Failed to serialize event: {}", e),
                },
                OutputFormat::Text => print_event(&event),
            }
        }
    })
}

fn print_event(event: &Event) {
    match event {
        Event::SessionPrimed { agent, role } => println!("✓ {} ready ({})", agent, role),
        Event::StepStarted {
            step_index,
            participant,
            title,
        } => {
            println!();
            println!("--- Step {}: {} ({}) ---", step_index, title, participant);
        }
        Event::StepCompleted { output, .. } => println!("{}", output),
        Event::Cooldown { seconds, .. } => println!("(pausing {}s)", seconds),
        Event::TurnRendered { .. } | Event::RunFinished { .. } => {}
    }
}
