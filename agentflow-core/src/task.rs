//! Step task domain model
//!
//! A step task is one generated work item attached to a workflow step
//! (identified by its approval id) for a particular agent type. Tasks
//! carry the context fingerprint they were generated from so the
//! currentness service can detect drift when files, requirements or
//! configuration change underneath them.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A generated work item for a workflow step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepTask {
    pub id: Uuid,
    /// Identity of the step approval this task was generated for
    pub approval_id: Uuid,
    pub agent_type: String,
    pub title: String,
    pub description: String,
    pub task_type: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    /// Fingerprint of the context (files, requirements, configuration)
    /// this task was generated from
    pub context_hash: Option<String>,
    pub expected_files: Vec<String>,
    pub expected_requirements: Vec<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Priority of a step task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Lifecycle status of a step task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Blocked,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Whether the task has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// Whether the task may be rewritten in place without corrupting
    /// work an agent has already claimed
    pub fn is_safe_to_update(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Blocked)
    }
}

impl StepTask {
    /// Create a new pending step task with validation
    pub fn new(
        approval_id: Uuid,
        agent_type: String,
        title: String,
        description: String,
        task_type: String,
        priority: TaskPriority,
    ) -> Result<Self> {
        if title.trim().is_empty() {
            return Err(Error::validation("Task title cannot be empty"));
        }
        if agent_type.trim().is_empty() {
            return Err(Error::validation("Task agent type cannot be empty"));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            approval_id,
            agent_type,
            title,
            description,
            task_type,
            priority,
            status: TaskStatus::Pending,
            context_hash: None,
            expected_files: Vec::new(),
            expected_requirements: Vec::new(),
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        })
    }

    /// Attach the context fingerprint and the inputs it covers
    pub fn with_context(
        mut self,
        context_hash: String,
        expected_files: Vec<String>,
        expected_requirements: Vec<String>,
    ) -> Self {
        self.context_hash = Some(context_hash);
        self.expected_files = expected_files;
        self.expected_requirements = expected_requirements;
        self
    }

    /// Update the task status, stamping the update time
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
