//! Structured progress events emitted by the orchestration core
//!
//! After each state transition or progress update the core emits an
//! `OrchestrationEvent` to an `EventSink`. Delivery (WebSocket, log,
//! queue) is the collaborator's concern; the default sink just logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

/// What kind of entity an event refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Execution,
    CollaborativeTask,
    Provider,
}

/// A structured progress event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestrationEvent {
    pub entity_id: Uuid,
    pub kind: EventKind,
    pub status: String,
    pub message: String,
    pub progress: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl OrchestrationEvent {
    /// Create an event stamped with the current time
    pub fn new<S1, S2>(
        entity_id: Uuid,
        kind: EventKind,
        status: S1,
        message: S2,
        progress: Option<u32>,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            entity_id,
            kind,
            status: status.into(),
            message: message.into(),
            progress,
            timestamp: Utc::now(),
        }
    }
}

/// Sink for orchestration events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: OrchestrationEvent);
}

/// Default sink that forwards events to the tracing subscriber
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: OrchestrationEvent) {
        tracing::info!(
            entity_id = %event.entity_id,
            kind = ?event.kind,
            status = %event.status,
            progress = ?event.progress,
            "{}",
            event.message
        );
    }
}

/// Sink that buffers events in memory, for tests and inspection
#[derive(Debug, Default)]
pub struct BufferingEventSink {
    events: Mutex<Vec<OrchestrationEvent>>,
}

impl BufferingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events emitted so far
    pub fn events(&self) -> Vec<OrchestrationEvent> {
        self.events.lock().expect("event buffer poisoned").clone()
    }

    /// Number of events emitted so far
    pub fn len(&self) -> usize {
        self.events.lock().expect("event buffer poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for BufferingEventSink {
    fn emit(&self, event: OrchestrationEvent) {
        self.events.lock().expect("event buffer poisoned").push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffering_sink_collects_events() {
        let sink = BufferingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(OrchestrationEvent::new(
            Uuid::new_v4(),
            EventKind::Execution,
            "running",
            "execution started",
            Some(0),
        ));
        sink.emit(OrchestrationEvent::new(
            Uuid::new_v4(),
            EventKind::CollaborativeTask,
            "blocked",
            "no available agent for backend-developer",
            None,
        ));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].status, "running");
        assert_eq!(events[1].kind, EventKind::CollaborativeTask);
    }
}
