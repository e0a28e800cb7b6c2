//! Pipeline events
//!
//! Every notification a research run produces travels through one ordered
//! stream of [`PipelineEvent`]s, fanned out to the subscribed [`EventSink`]s.

use crate::planner::Task;
use chrono::{DateTime, Utc};
use scout_common::search::SearchResult;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Kind and payload of a pipeline notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Free-form narration of what the pipeline is doing
    Thinking { text: String },
    /// Stage label with optional detail
    Progress {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// A provider call is about to be made
    ToolCall { name: String, params: serde_json::Value },
    /// Current ranked sources
    SourcesUpdate { results: Vec<SearchResult> },
    /// One task finished with its results
    StepResult {
        step_index: usize,
        task: Task,
        results: Vec<SearchResult>,
    },
    /// Short summary after a task
    StepComplete { step_index: usize, summary: String },
    /// Whether synthetic results were involved
    MockDetected { detected: bool },
    /// Streamed generation text
    Token { text: String },
    /// Run failed
    Error { message: String },
}

impl PipelineEvent {
    pub fn thinking(text: impl Into<String>) -> Self {
        PipelineEvent::Thinking { text: text.into() }
    }

    pub fn progress(label: impl Into<String>, details: Option<String>) -> Self {
        PipelineEvent::Progress {
            label: label.into(),
            details,
        }
    }

    /// Name of the variant, used as the SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::Thinking { .. } => "thinking",
            PipelineEvent::Progress { .. } => "progress",
            PipelineEvent::ToolCall { .. } => "tool_call",
            PipelineEvent::SourcesUpdate { .. } => "sources_update",
            PipelineEvent::StepResult { .. } => "step_result",
            PipelineEvent::StepComplete { .. } => "step_complete",
            PipelineEvent::MockDetected { .. } => "mock_detected",
            PipelineEvent::Token { .. } => "token",
            PipelineEvent::Error { .. } => "error",
        }
    }
}

/// An event stamped with identity and position in its run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// Position within the bus, starting at 0
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: PipelineEvent,
}

/// Receiver of pipeline events. Called synchronously, in emission order.
pub trait EventSink: Send + Sync {
    fn emit(&self, envelope: &EventEnvelope);
}

impl EventSink for mpsc::UnboundedSender<EventEnvelope> {
    fn emit(&self, envelope: &EventEnvelope) {
        // A dropped receiver means the client went away; the run still completes.
        let _ = self.send(envelope.clone());
    }
}

/// Fan-out of one run's events to its subscribers
#[derive(Default)]
pub struct EventBus {
    sinks: Vec<Arc<dyn EventSink>>,
    sequence: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber
    pub fn subscribe(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Stamp `event` and deliver it to every subscriber
    pub fn emit(&self, event: PipelineEvent) {
        let envelope = EventEnvelope {
            id: Uuid::new_v4(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            timestamp: Utc::now(),
            event,
        };

        for sink in &self.sinks {
            sink.emit(&envelope);
        }
    }

    /// Number of events emitted so far
    pub fn emitted(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

/// Sink that keeps every event in memory
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<EventEnvelope>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events, oldest first
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.envelopes().into_iter().map(|e| e.event).collect()
    }

    pub fn envelopes(&self) -> Vec<EventEnvelope> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for EventRecorder {
    fn emit(&self, envelope: &EventEnvelope) {
        match self.events.lock() {
            Ok(mut events) => events.push(envelope.clone()),
            Err(poisoned) => poisoned.into_inner().push(envelope.clone()),
        }
    }
}
