//! Task currentness service: reconciling generated tasks with context
//!
//! Given the current context of a workflow step (uploaded files,
//! requirements, configuration), the service computes the task set the
//! step should have, diffs it against the tasks that exist, and decides
//! per task whether to keep it, rewrite it in place, or recreate it.
//!
//! Change detection is two-layered: a sha-256 context hash gives a
//! cheap exact-change detector, while normalized Levenshtein similarity
//! on titles tolerates minor template wording drift without spurious
//! recreation. Tasks that are pending or blocked are safe to rewrite;
//! anything an agent has already picked up is recreated instead so
//! in-flight work is never silently mutated.

use crate::repositories::TaskRepository;
use crate::Result;
use agentflow_core::task::{StepTask, TaskPriority};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Titles closer than this are considered the same task
const SIMILARITY_THRESHOLD: f64 = 0.7;

/// Current context of a workflow step, as provided by the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TaskValidationContext {
    pub template_title: String,
    /// Agent types the step generates one task for each of
    pub agent_types: Vec<String>,
    pub uploaded_files: Vec<String>,
    pub requirements: Vec<String>,
    pub step_configuration: HashMap<String, String>,
}

/// A task the step is expected to have, derived from the context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpectedTask {
    pub agent_type: String,
    pub title: String,
    pub description: String,
    pub task_type: String,
    pub priority: TaskPriority,
    pub context_hash: String,
}

/// Outcome of one reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CurrentnessReport {
    /// Matched tasks whose context is unchanged
    pub valid: usize,
    /// Matched tasks whose context drifted, plus obsolete leftovers
    pub outdated: usize,
    /// Expected tasks that had no existing counterpart
    pub missing: usize,
    /// Human-readable explanation of every decision taken
    pub reasons: Vec<String>,
    pub created_ids: Vec<Uuid>,
    pub updated_ids: Vec<Uuid>,
    /// Ids of the fresh tasks created by recreation
    pub recreated_ids: Vec<Uuid>,
    /// Ids deleted by recreation or obsolescence
    pub removed_ids: Vec<Uuid>,
}

impl CurrentnessReport {
    /// Whether the run changed anything at all
    pub fn is_noop(&self) -> bool {
        self.created_ids.is_empty()
            && self.updated_ids.is_empty()
            && self.recreated_ids.is_empty()
            && self.removed_ids.is_empty()
    }
}

/// Service reconciling step tasks against their generating context
pub struct CurrentnessService {
    tasks: Arc<TaskRepository>,
}

impl CurrentnessService {
    /// Create a currentness service over the task repository
    pub fn new(tasks: Arc<TaskRepository>) -> Self {
        Self { tasks }
    }

    /// Reconcile the tasks of one step against its current context.
    ///
    /// Expected tasks are generated per agent type, matched against the
    /// existing set by exact title or by similarity, and each pair is
    /// classified: unchanged context keeps the task, drifted context
    /// rewrites it in place when its status is still safe to mutate and
    /// recreates it otherwise. Expected tasks with no counterpart are
    /// created; leftovers with no expected counterpart are obsolete.
    /// Running twice with an unchanged context performs zero operations
    /// on the second run.
    pub async fn validate_and_update_step_tasks(
        &self,
        approval_id: Uuid,
        context: &TaskValidationContext,
    ) -> Result<CurrentnessReport> {
        let existing = self.tasks.list_by_approval(approval_id).await?;
        let expected = Self::generate_expected_tasks(approval_id, context);
        debug!(
            "Reconciling step {}: {} existing, {} expected",
            approval_id,
            existing.len(),
            expected.len()
        );

        let mut report = CurrentnessReport::default();
        let mut claimed = vec![false; existing.len()];

        let sorted_files = sorted(&context.uploaded_files);
        let sorted_requirements = sorted(&context.requirements);

        for exp in &expected {
            match Self::find_match(&existing, &claimed, exp) {
                Some(index) => {
                    claimed[index] = true;
                    let task = &existing[index];
                    let current = task.context_hash.as_deref() == Some(exp.context_hash.as_str())
                        && task.expected_files == sorted_files
                        && task.expected_requirements == sorted_requirements;

                    if current {
                        report.valid += 1;
                        continue;
                    }

                    report.outdated += 1;
                    if task.status.is_safe_to_update() {
                        let mut updated = task.clone();
                        updated.title = exp.title.clone();
                        updated.description = exp.description.clone();
                        updated.task_type = exp.task_type.clone();
                        updated.priority = exp.priority;
                        updated.context_hash = Some(exp.context_hash.clone());
                        updated.expected_files = sorted_files.clone();
                        updated.expected_requirements = sorted_requirements.clone();
                        updated.updated_at = chrono::Utc::now();
                        self.tasks.update(&updated).await?;
                        report.updated_ids.push(updated.id);
                        report
                            .reasons
                            .push(format!("task '{}' outdated: updated in place", task.title));
                    } else {
                        // In-flight work is never rewritten; replace it
                        self.tasks.delete(task.id).await?;
                        report.removed_ids.push(task.id);
                        let fresh = self
                            .create_from_expected(approval_id, exp, &sorted_files, &sorted_requirements)
                            .await?;
                        report.recreated_ids.push(fresh);
                        report.reasons.push(format!(
                            "task '{}' outdated while {:?}: recreated",
                            task.title, task.status
                        ));
                    }
                }
                None => {
                    report.missing += 1;
                    let id = self
                        .create_from_expected(approval_id, exp, &sorted_files, &sorted_requirements)
                        .await?;
                    report.created_ids.push(id);
                    report
                        .reasons
                        .push(format!("task '{}' missing: created", exp.title));
                }
            }
        }

        // Leftover existing tasks have no expected counterpart
        for (index, task) in existing.iter().enumerate() {
            if claimed[index] {
                continue;
            }
            report.outdated += 1;
            if task.status.is_safe_to_update() {
                self.tasks.delete(task.id).await?;
                report.removed_ids.push(task.id);
                report
                    .reasons
                    .push(format!("task '{}' obsolete: removed", task.title));
            } else {
                report.reasons.push(format!(
                    "task '{}' obsolete but {:?}: left untouched",
                    task.title, task.status
                ));
            }
        }

        info!(
            "Reconciled step {}: {} valid, {} outdated, {} missing",
            approval_id, report.valid, report.outdated, report.missing
        );
        Ok(report)
    }

    /// Expected tasks for a context: one per agent type, each carrying
    /// the context hash it was derived from
    pub fn generate_expected_tasks(
        approval_id: Uuid,
        context: &TaskValidationContext,
    ) -> Vec<ExpectedTask> {
        context
            .agent_types
            .iter()
            .map(|agent_type| {
                let (action, task_type, priority) = Self::blueprint(agent_type);
                ExpectedTask {
                    agent_type: agent_type.clone(),
                    title: format!("{} for {}", action, context.template_title),
                    description: format!(
                        "{} for '{}' based on {} uploaded file(s) and {} requirement(s)",
                        action,
                        context.template_title,
                        context.uploaded_files.len(),
                        context.requirements.len()
                    ),
                    task_type: task_type.to_string(),
                    priority,
                    context_hash: compute_context_hash(
                        approval_id,
                        agent_type,
                        &context.uploaded_files,
                        &context.requirements,
                        &context.template_title,
                        &context.step_configuration,
                    ),
                }
            })
            .collect()
    }

    fn blueprint(agent_type: &str) -> (&'static str, &'static str, TaskPriority) {
        match agent_type {
            "business-analyst" => ("Analyze business requirements", "analysis", TaskPriority::High),
            "architect" => ("Design system architecture", "design", TaskPriority::High),
            "backend-developer" => {
                ("Implement backend services", "implementation", TaskPriority::Medium)
            }
            "frontend-developer" => {
                ("Implement user interface", "implementation", TaskPriority::Medium)
            }
            "qa-engineer" => ("Verify acceptance criteria", "testing", TaskPriority::Medium),
            _ => ("Complete assigned work", "general", TaskPriority::Medium),
        }
    }

    /// Find the existing task matching an expected one: exact title
    /// first, then best similarity among tasks of the same type and
    /// priority above the threshold
    fn find_match(existing: &[StepTask], claimed: &[bool], expected: &ExpectedTask) -> Option<usize> {
        if let Some((index, _)) = existing
            .iter()
            .enumerate()
            .find(|(i, task)| !claimed[*i] && task.title == expected.title)
        {
            return Some(index);
        }

        existing
            .iter()
            .enumerate()
            .filter(|(i, task)| {
                !claimed[*i]
                    && task.task_type == expected.task_type
                    && task.priority == expected.priority
            })
            .map(|(i, task)| (i, title_similarity(&task.title, &expected.title)))
            .filter(|(_, similarity)| *similarity >= SIMILARITY_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    async fn create_from_expected(
        &self,
        approval_id: Uuid,
        expected: &ExpectedTask,
        sorted_files: &[String],
        sorted_requirements: &[String],
    ) -> Result<Uuid> {
        let task = StepTask::new(
            approval_id,
            expected.agent_type.clone(),
            expected.title.clone(),
            expected.description.clone(),
            expected.task_type.clone(),
            expected.priority,
        )
        .map_err(crate::Error::Core)?
        .with_context(
            expected.context_hash.clone(),
            sorted_files.to_vec(),
            sorted_requirements.to_vec(),
        );
        let id = task.id;
        self.tasks.create(&task).await?;
        Ok(id)
    }
}

/// Deterministic fingerprint of the inputs a task was generated from.
/// Files, requirements and configuration are sorted first so ordering
/// differences never register as drift.
pub fn compute_context_hash(
    approval_id: Uuid,
    agent_type: &str,
    uploaded_files: &[String],
    requirements: &[String],
    template_title: &str,
    configuration: &HashMap<String, String>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(approval_id.as_bytes());
    hasher.update([0]);
    hasher.update(agent_type.as_bytes());
    for file in sorted(uploaded_files) {
        hasher.update([0]);
        hasher.update(file.as_bytes());
    }
    hasher.update([1]);
    for requirement in sorted(requirements) {
        hasher.update([0]);
        hasher.update(requirement.as_bytes());
    }
    hasher.update([1]);
    hasher.update(template_title.as_bytes());
    let mut entries: Vec<(&String, &String)> = configuration.iter().collect();
    entries.sort();
    for (key, value) in entries {
        hasher.update([0]);
        hasher.update(key.as_bytes());
        hasher.update([0]);
        hasher.update(value.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Normalized title similarity: `1 - levenshtein(a, b) / max(len)`.
/// Identical strings score 1.0, fully distinct strings approach 0.0.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let max_len = a_len.max(b_len);
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Character-level Levenshtein edit distance, two-row dynamic program
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

fn sorted(values: &[String]) -> Vec<String> {
    let mut values = values.to_vec();
    values.sort();
    values
}
