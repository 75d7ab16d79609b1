//! Message Bus for run progress
//!
//! The MessageBus fans session and workflow progress out to any number of
//! subscribers (the terminal printer, a JSON emitter, tests) without the
//! core knowing who is listening. It implements both `TurnObserver` and
//! `WorkflowObserver`, so it can be handed to sessions and to the engine
//! directly.
//!
//! Channels are bounded. Publishing never waits on a slow subscriber: if a
//! subscriber's buffer is full the event is dropped for that subscriber and
//! a warning is logged.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;
use uuid::Uuid;

use crate::agent::{RenderedTurn, TurnKind, TurnObserver};
use crate::workflow::{RunStatus, WorkflowObserver, WorkflowRun};

/// Channel buffer size for bounded channels
const CHANNEL_BUFFER_SIZE: usize = 100;

/// Event types that can be published on the message bus
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum EventType {
    /// A session finished priming
    SessionPrimed,
    /// A session completed an exchange
    TurnRendered,
    /// A workflow step was sent
    StepStarted,
    /// A workflow step produced output
    StepCompleted,
    /// The engine is pausing between steps
    Cooldown,
    /// A run completed or aborted
    RunFinished,
    /// Subscribe to all event types
    All,
}

/// Events that can be published on the message bus
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    SessionPrimed {
        agent: String,
        role: String,
    },
    TurnRendered {
        agent: String,
        sender_label: String,
        reply: String,
    },
    StepStarted {
        step_index: usize,
        participant: String,
        title: String,
    },
    StepCompleted {
        step_index: usize,
        participant: String,
        output: String,
    },
    Cooldown {
        step_index: usize,
        seconds: f64,
    },
    RunFinished {
        run_id: Uuid,
        status: RunStatus,
        steps_completed: usize,
    },
}

impl Event {
    /// Get the event type for this event
    pub fn event_type(&self) -> EventType {
        match self {
            Event::SessionPrimed { .. } => EventType::SessionPrimed,
            Event::TurnRendered { .. } => EventType::TurnRendered,
            Event::StepStarted { .. } => EventType::StepStarted,
            Event::StepCompleted { .. } => EventType::StepCompleted,
            Event::Cooldown { .. } => EventType::Cooldown,
            Event::RunFinished { .. } => EventType::RunFinished,
        }
    }
}

/// Message bus for pub/sub communication between components
#[derive(Clone)]
pub struct MessageBus {
    /// Subscribers per event type, each with a bounded channel
    channels: Arc<Mutex<HashMap<EventType, Vec<mpsc::Sender<Event>>>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to a specific event type, or `EventType::All`
    pub async fn subscribe(&self, event_type: EventType) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let mut channels = self.channels.lock().await;
        channels.entry(event_type).or_default().push(tx);
        rx
    }

    /// Publish an event to its type's subscribers and to `All` subscribers.
    ///
    /// Subscribers whose receiver was dropped are removed.
    pub async fn publish(&self, event: Event) {
        let mut channels = self.channels.lock().await;
        let event_type = event.event_type();

        for key in [event_type, EventType::All] {
            if let Some(subscribers) = channels.get_mut(&key) {
                subscribers.retain(|tx| match tx.try_send(event.clone()) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!("Subscriber for {:?} is full, dropping event", key);
                        true
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                });
            }
        }
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TurnObserver for MessageBus {
    async fn on_turn_rendered(&self, turn: &RenderedTurn) {
        let event = match turn.kind {
            TurnKind::Priming => Event::SessionPrimed {
                agent: turn.agent.clone(),
                role: turn.role.clone(),
            },
            TurnKind::Exchange => Event::TurnRendered {
                agent: turn.agent.clone(),
                sender_label: turn.sender_label.clone(),
                reply: turn.reply.clone(),
            },
        };
        self.publish(event).await;
    }
}

#[async_trait]
impl WorkflowObserver for MessageBus {
    async fn on_step_started(&self, step_index: usize, participant: &str, title: &str) {
        self.publish(Event::StepStarted {
            step_index,
            participant: participant.to_string(),
            title: title.to_string(),
        })
        .await;
    }

    async fn on_step_complete(&self, step_index: usize, participant: &str, output: &str) {
        self.publish(Event::StepCompleted {
            step_index,
            participant: participant.to_string(),
            output: output.to_string(),
        })
        .await;
    }

    async fn on_cooldown(&self, step_index: usize, duration: Duration) {
        self.publish(Event::Cooldown {
            step_index,
            seconds: duration.as_secs_f64(),
        })
        .await;
    }

    async fn on_run_finished(&self, run: &WorkflowRun) {
        self.publish(Event::RunFinished {
            run_id: run.id,
            status: run.status,
            steps_completed: run.outputs.len(),
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(step_index: usize) -> Event {
        Event::StepCompleted {
            step_index,
            participant: "Editor".to_string(),
            output: "Outline: A, B, C".to_string(),
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe(EventType::StepCompleted).await;

        bus.publish(completed(1)).await;

        match rx.recv().await.unwrap() {
            Event::StepCompleted {
                step_index, output, ..
            } => {
                assert_eq!(step_index, 1);
                assert_eq!(output, "Outline: A, B, C");
            }
            other => panic!("Wrong event received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_event_type() {
        let bus = MessageBus::new();
        let mut rx_all = bus.subscribe(EventType::All).await;
        let mut rx_cooldown = bus.subscribe(EventType::Cooldown).await;

        bus.publish(completed(2)).await;

        assert!(matches!(
            rx_all.recv().await.unwrap(),
            Event::StepCompleted { step_index: 2, .. }
        ));
        assert!(rx_cooldown.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_subscriber_does_not_block_publisher() {
        let bus = MessageBus::new();
        let _rx = bus.subscribe(EventType::StepCompleted).await;

        for i in 0..CHANNEL_BUFFER_SIZE + 10 {
            bus.publish(completed(i)).await;
        }
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let bus = MessageBus::new();
        let rx = bus.subscribe(EventType::StepCompleted).await;
        drop(rx);

        bus.publish(completed(1)).await;

        let channels = bus.channels.lock().await;
        assert!(channels
            .get(&EventType::StepCompleted)
            .map_or(true, |s| s.is_empty()));
    }

    #[tokio::test]
    async fn test_observer_impls_publish_events() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe(EventType::All).await;

        bus.on_turn_rendered(&RenderedTurn {
            kind: TurnKind::Priming,
            agent: "Writer".to_string(),
            role: "Content Writer".to_string(),
            sender_label: "system".to_string(),
            content: "You are Writer".to_string(),
            reply: "Understood".to_string(),
        })
        .await;
        bus.on_cooldown(1, Duration::from_secs(15)).await;

        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::SessionPrimed { ref agent, .. } if agent == "Writer"
        ));
        match rx.recv().await.unwrap() {
            Event::Cooldown { step_index, seconds } => {
                assert_eq!(step_index, 1);
                assert_eq!(seconds, 15.0);
            }
            other => panic!("Wrong event received: {:?}", other),
        }
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(completed(3)).unwrap();
        assert_eq!(json["event"], "step_completed");
        assert_eq!(json["step_index"], 3);
    }
}
