//! Workflow execution domain model
//!
//! An execution is one running instantiation of a template. Its status
//! follows a fixed state machine: `Pending -> Running <-> Paused`, with
//! `Running` terminating into `Completed`, `Failed` or `Cancelled`, and
//! `Pending`/`Paused` also cancellable directly. Terminal states absorb
//! every further transition attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One running instantiation of a workflow template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub template_id: Uuid,
    pub context: ExecutionContext,
    pub status: ExecutionStatus,
    pub progress: ExecutionProgress,
    /// Per-provider request/success/error counters, keyed by provider id
    pub provider_usage: HashMap<String, ProviderUsage>,
    pub metadata: ExecutionMetadata,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_activity_at: DateTime<Utc>,
}

/// What the execution is attached to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionContext {
    pub context_id: Uuid,
    pub context_type: ContextType,
}

/// Kind of entity an execution runs on behalf of
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    Project,
    Agent,
}

/// Lifecycle status of a workflow execution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Whether this status permits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        match (self, next) {
            (Pending, Running) => true,
            (Pending, Cancelled) => true,
            (Running, Paused) => true,
            (Running, Completed) | (Running, Failed) | (Running, Cancelled) => true,
            (Paused, Running) => true,
            (Paused, Cancelled) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Paused => "paused",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }
}

/// Step-level progress of an execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExecutionProgress {
    pub total_steps: u32,
    pub completed_steps: u32,
    pub current_step: Option<String>,
    /// Always `completed_steps / total_steps * 100`, rounded
    pub percentage: u32,
}

impl ExecutionProgress {
    /// Recompute the percentage from the step counters
    pub fn recompute(&mut self) {
        if self.total_steps > 0 {
            self.percentage =
                ((self.completed_steps as f64 / self.total_steps as f64) * 100.0).round() as u32;
        }
    }
}

/// Request counters for a single provider within one execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProviderUsage {
    pub request_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub total_tokens: u64,
}

impl ProviderUsage {
    /// Record one request outcome
    pub fn record(&mut self, success: bool, tokens: Option<u64>) {
        self.request_count += 1;
        if success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
        if let Some(tokens) = tokens {
            self.total_tokens += tokens;
        }
    }
}

/// Free-form execution metadata: trigger, priority, final result or error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionMetadata {
    pub triggered_by: String,
    pub priority: ExecutionPriority,
    pub result: Option<String>,
    pub error: Option<String>,
}

/// Priority assigned to an execution at creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPriority {
    Low,
    Normal,
    High,
}

impl WorkflowExecution {
    /// Create a pending execution with zeroed progress
    pub fn new(
        template_id: Uuid,
        context: ExecutionContext,
        triggered_by: String,
        priority: ExecutionPriority,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            template_id,
            context,
            status: ExecutionStatus::Pending,
            progress: ExecutionProgress::default(),
            provider_usage: HashMap::new(),
            metadata: ExecutionMetadata {
                triggered_by,
                priority,
                result: None,
                error: None,
            },
            created_at: now,
            started_at: None,
            completed_at: None,
            last_activity_at: now,
        }
    }

    /// Attempt a status transition; returns false (leaving state
    /// unchanged) when the state machine forbids it.
    pub fn transition_to(&mut self, next: ExecutionStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.last_activity_at = Utc::now();
        match next {
            ExecutionStatus::Running if self.started_at.is_none() => {
                self.started_at = Some(self.last_activity_at);
            }
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled => {
                self.completed_at = Some(self.last_activity_at);
            }
            _ => {}
        }
        true
    }
}
