//! Workflow execution lifecycle and step driving
//!
//! The manager owns every live execution and is the only writer of
//! execution state: status transitions, progress counters and provider
//! usage all go through it, so concurrent readers always observe a
//! consistent snapshot and counters only move forward.
//!
//! The step driver honors the declared dependency graph: steps run in
//! waves of ready steps (all dependencies completed), with independent
//! steps of a wave executed concurrently under a bounded pool. Failures
//! are retried against the same provider up to the step's retry budget,
//! then against each strategy fallback in order. Pause and cancellation
//! are cooperative, checked at step boundaries only.

use crate::config::ExecutionConfig;
use crate::event::{EventKind, EventSink, OrchestrationEvent, TracingEventSink};
use crate::execution::{
    ExecutionContext, ExecutionPriority, ExecutionStatus, WorkflowExecution,
};
use crate::orchestration::provider_manager::ProviderManager;
use crate::provider::{GenerationRequest, HealthStatus};
use crate::template::{WorkflowStep, WorkflowTemplate};
use crate::{Error, Result};
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Options for creating a new execution
#[derive(Debug, Clone)]
pub struct CreateExecutionOptions {
    pub template_id: Uuid,
    pub context: ExecutionContext,
    pub triggered_by: String,
    pub priority: ExecutionPriority,
}

/// Partial progress update; absent fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub total_steps: Option<u32>,
    pub completed_steps: Option<u32>,
    pub current_step: Option<String>,
}

/// Result of driving one step to completion
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub step: String,
    pub state: StepState,
    pub output: Option<String>,
    pub error: Option<String>,
    pub attempts: u32,
}

/// Final state of a driven step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Completed,
    Failed,
    /// Not attempted because a dependency failed or the run was cancelled
    Skipped,
}

/// Owner and driver of workflow executions
pub struct WorkflowExecutionManager {
    executions: Arc<RwLock<HashMap<Uuid, WorkflowExecution>>>,
    config: ExecutionConfig,
    events: Arc<dyn EventSink>,
}

impl WorkflowExecutionManager {
    /// Create a manager with the given config and event sink
    pub fn new(config: ExecutionConfig, events: Arc<dyn EventSink>) -> Self {
        Self {
            executions: Arc::new(RwLock::new(HashMap::new())),
            config,
            events,
        }
    }

    /// Allocate a pending execution with zeroed progress. No work starts.
    pub async fn create(&self, options: CreateExecutionOptions) -> WorkflowExecution {
        let execution = WorkflowExecution::new(
            options.template_id,
            options.context,
            options.triggered_by,
            options.priority,
        );
        info!(
            "Created execution {} for template {}",
            execution.id, execution.template_id
        );
        self.emit(&execution, "execution created");
        self.executions
            .write()
            .await
            .insert(execution.id, execution.clone());
        execution
    }

    /// Snapshot of one execution
    pub async fn get(&self, id: Uuid) -> Result<WorkflowExecution> {
        self.executions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("WorkflowExecution", id.to_string()))
    }

    /// Snapshots of all executions
    pub async fn list(&self) -> Vec<WorkflowExecution> {
        self.executions.read().await.values().cloned().collect()
    }

    /// Current status of one execution
    pub async fn status(&self, id: Uuid) -> Result<ExecutionStatus> {
        Ok(self.get(id).await?.status)
    }

    /// Move a pending execution into running. Returns false from any
    /// other state; resuming a paused execution goes through `resume`.
    pub async fn start(&self, id: Uuid) -> Result<bool> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("WorkflowExecution", id.to_string()))?;
        if execution.status != ExecutionStatus::Pending {
            return Ok(false);
        }
        let moved = execution.transition_to(ExecutionStatus::Running);
        if moved {
            self.emit(execution, "execution started");
        }
        Ok(moved)
    }

    /// Pause a running execution. Returns false from any other state.
    pub async fn pause(&self, id: Uuid) -> Result<bool> {
        self.try_transition(id, ExecutionStatus::Paused, "execution paused")
            .await
    }

    /// Resume a paused execution. Returns false from any other state.
    pub async fn resume(&self, id: Uuid) -> Result<bool> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("WorkflowExecution", id.to_string()))?;
        if execution.status != ExecutionStatus::Paused {
            return Ok(false);
        }
        let moved = execution.transition_to(ExecutionStatus::Running);
        if moved {
            self.emit(execution, "execution resumed");
        }
        Ok(moved)
    }

    /// Cancel an execution from any non-terminal state
    pub async fn cancel(&self, id: Uuid) -> Result<bool> {
        self.try_transition(id, ExecutionStatus::Cancelled, "execution cancelled")
            .await
    }

    /// Apply a progress update, recomputing the percentage
    pub async fn update_progress(&self, id: Uuid, update: ProgressUpdate) -> Result<()> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("WorkflowExecution", id.to_string()))?;

        if let Some(total) = update.total_steps {
            execution.progress.total_steps = total;
        }
        if let Some(completed) = update.completed_steps {
            execution.progress.completed_steps = completed;
        }
        if let Some(step) = update.current_step {
            execution.progress.current_step = Some(step);
        }
        execution.progress.recompute();
        execution.last_activity_at = chrono::Utc::now();
        self.emit(execution, "progress updated");
        Ok(())
    }

    /// Record one provider request outcome, creating the counter bucket
    /// lazily on first use
    pub async fn record_provider_usage(
        &self,
        id: Uuid,
        provider: &str,
        success: bool,
        tokens: Option<u64>,
    ) -> Result<()> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("WorkflowExecution", id.to_string()))?;
        execution
            .provider_usage
            .entry(provider.to_string())
            .or_default()
            .record(success, tokens);
        execution.last_activity_at = chrono::Utc::now();
        Ok(())
    }

    /// Finish an execution as completed or failed, storing the result
    /// or error in its metadata
    pub async fn complete(
        &self,
        id: Uuid,
        success: bool,
        result: Option<String>,
        error: Option<String>,
    ) -> Result<bool> {
        let target = if success {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("WorkflowExecution", id.to_string()))?;
        let moved = execution.transition_to(target);
        if moved {
            execution.metadata.result = result;
            execution.metadata.error = error;
            self.emit(execution, "execution finished");
        }
        Ok(moved)
    }

    /// Drive an execution through every step of its template.
    ///
    /// Steps become ready when all of their dependencies have completed;
    /// ready steps run concurrently, bounded by the configured pool.
    /// Steps downstream of a failure are skipped, independent steps
    /// continue, and the execution fails if any step failed. Returns the
    /// final execution snapshot together with the per-step outcomes.
    pub async fn run(
        &self,
        id: Uuid,
        template: &WorkflowTemplate,
        providers: &ProviderManager,
    ) -> Result<(WorkflowExecution, Vec<StepOutcome>)> {
        if !self.start(id).await? {
            let current = self.status(id).await?;
            return Err(Error::invalid_transition(
                "execution",
                current.as_str(),
                ExecutionStatus::Running.as_str(),
            ));
        }

        self.update_progress(
            id,
            ProgressUpdate {
                total_steps: Some(template.steps.len() as u32),
                ..Default::default()
            },
        )
        .await?;

        let mut completed: HashSet<String> = HashSet::new();
        let mut failed: HashSet<String> = HashSet::new();
        let mut skipped: HashSet<String> = HashSet::new();
        let mut outcomes: Vec<StepOutcome> = Vec::new();
        let mut cancelled = false;

        loop {
            if !self.wait_while_paused(id).await? {
                cancelled = true;
                break;
            }

            // Steps downstream of a failure can never become ready
            Self::propagate_skips(template, &completed, &failed, &mut skipped);

            let ready: Vec<&WorkflowStep> = template
                .steps
                .iter()
                .filter(|step| {
                    !completed.contains(&step.name)
                        && !failed.contains(&step.name)
                        && !skipped.contains(&step.name)
                        && step.depends_on.iter().all(|dep| completed.contains(dep))
                })
                .collect();

            if ready.is_empty() {
                break;
            }

            let wave: Vec<StepOutcome> = futures::stream::iter(
                ready
                    .into_iter()
                    .map(|step| self.execute_step(id, step, template, providers)),
            )
            .buffer_unordered(self.config.max_parallel_steps)
            .collect()
            .await;

            for outcome in wave {
                match outcome.state {
                    StepState::Completed => {
                        completed.insert(outcome.step.clone());
                        self.update_progress(
                            id,
                            ProgressUpdate {
                                completed_steps: Some(completed.len() as u32),
                                current_step: Some(outcome.step.clone()),
                                ..Default::default()
                            },
                        )
                        .await?;
                    }
                    StepState::Failed => {
                        failed.insert(outcome.step.clone());
                    }
                    StepState::Skipped => {
                        skipped.insert(outcome.step.clone());
                    }
                }
                outcomes.push(outcome);
            }
        }

        // Record anything never attempted (failed dependency or cancel)
        for step in &template.steps {
            let seen = completed.contains(&step.name)
                || failed.contains(&step.name)
                || outcomes.iter().any(|o| o.step == step.name);
            if !seen {
                outcomes.push(StepOutcome {
                    step: step.name.clone(),
                    state: StepState::Skipped,
                    output: None,
                    error: None,
                    attempts: 0,
                });
            }
        }

        if !cancelled {
            if failed.is_empty() {
                let summary = serde_json::json!({
                    "steps_completed": completed.len(),
                    "steps_total": template.steps.len(),
                })
                .to_string();
                self.complete(id, true, Some(summary), None).await?;
            } else {
                let mut names: Vec<&str> = failed.iter().map(|s| s.as_str()).collect();
                names.sort();
                let error = format!("steps failed: {}", names.join(", "));
                self.complete(id, false, None, Some(error)).await?;
            }
        }

        Ok((self.get(id).await?, outcomes))
    }

    /// Execute one step: primary provider with retries, then fallbacks.
    async fn execute_step(
        &self,
        id: Uuid,
        step: &WorkflowStep,
        template: &WorkflowTemplate,
        providers: &ProviderManager,
    ) -> StepOutcome {
        // Cooperative cancel check: refuse to start once cancelled
        match self.status(id).await {
            Ok(ExecutionStatus::Running) => {}
            _ => {
                return StepOutcome {
                    step: step.name.clone(),
                    state: StepState::Skipped,
                    output: None,
                    error: None,
                    attempts: 0,
                };
            }
        }

        let _ = self
            .update_progress(
                id,
                ProgressUpdate {
                    current_step: Some(step.name.clone()),
                    ..Default::default()
                },
            )
            .await;

        let unhealthy: HashSet<String> = providers
            .health()
            .await
            .into_iter()
            .filter(|h| h.status == HealthStatus::Unhealthy)
            .map(|h| h.provider)
            .collect();

        let order = template.provider_strategy.provider_order();
        let timeout = std::time::Duration::from_secs(
            step.timeout_seconds
                .unwrap_or(self.config.step_timeout_seconds),
        );
        let prompt = Self::build_step_prompt(step, template);

        let mut attempted: Vec<String> = Vec::new();
        let mut attempts = 0u32;
        let mut last_error: Option<String> = None;

        for provider_name in &order {
            let Some(provider) = providers.get(provider_name).await else {
                continue;
            };
            if unhealthy.contains(*provider_name) {
                debug!(
                    "Skipping unhealthy provider '{}' for step '{}'",
                    provider_name, step.name
                );
                continue;
            }
            attempted.push(provider_name.to_string());

            for attempt in 0..=step.max_retries {
                attempts += 1;
                let request = GenerationRequest::new(prompt.clone());
                let outcome = tokio::time::timeout(timeout, provider.generate(request)).await;

                match outcome {
                    Ok(Ok(response)) => {
                        let tokens = response.usage.map(|u| u.total());
                        let _ = self
                            .record_provider_usage(id, provider_name, true, tokens)
                            .await;
                        return StepOutcome {
                            step: step.name.clone(),
                            state: StepState::Completed,
                            output: Some(response.text),
                            error: None,
                            attempts,
                        };
                    }
                    Ok(Err(e)) => {
                        warn!(
                            "Step '{}' attempt {} on '{}' failed: {}",
                            step.name,
                            attempt + 1,
                            provider_name,
                            e
                        );
                        let _ = self
                            .record_provider_usage(id, provider_name, false, None)
                            .await;
                        last_error = Some(e.to_string());
                    }
                    Err(_) => {
                        warn!(
                            "Step '{}' attempt {} on '{}' timed out after {}s",
                            step.name,
                            attempt + 1,
                            provider_name,
                            timeout.as_secs()
                        );
                        let _ = self
                            .record_provider_usage(id, provider_name, false, None)
                            .await;
                        last_error = Some(
                            Error::timeout(step.name.clone(), timeout.as_secs()).to_string(),
                        );
                    }
                }

                if attempt < step.max_retries {
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
            }
        }

        let error = if attempted.is_empty() {
            Error::provider_unavailable(
                step.name.clone(),
                order.iter().map(|s| s.to_string()).collect(),
            )
            .to_string()
        } else {
            last_error.unwrap_or_else(|| "step failed".to_string())
        };

        StepOutcome {
            step: step.name.clone(),
            state: StepState::Failed,
            output: None,
            error: Some(error),
            attempts,
        }
    }

    /// Block at a step boundary while the execution is paused.
    /// Returns false once the execution has been cancelled or otherwise
    /// left the running/paused pair.
    async fn wait_while_paused(&self, id: Uuid) -> Result<bool> {
        loop {
            match self.status(id).await? {
                ExecutionStatus::Running => return Ok(true),
                ExecutionStatus::Paused => {
                    tokio::time::sleep(self.config.pause_poll()).await;
                }
                _ => return Ok(false),
            }
        }
    }

    /// Extend the skipped set with every step depending, transitively,
    /// on a failed or already-skipped step
    fn propagate_skips(
        template: &WorkflowTemplate,
        completed: &HashSet<String>,
        failed: &HashSet<String>,
        skipped: &mut HashSet<String>,
    ) {
        loop {
            let mut changed = false;
            for step in &template.steps {
                if completed.contains(&step.name)
                    || failed.contains(&step.name)
                    || skipped.contains(&step.name)
                {
                    continue;
                }
                if step
                    .depends_on
                    .iter()
                    .any(|dep| failed.contains(dep) || skipped.contains(dep))
                {
                    skipped.insert(step.name.clone());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn build_step_prompt(step: &WorkflowStep, template: &WorkflowTemplate) -> String {
        let mut prompt = format!(
            "Execute workflow step '{}' of workflow '{}'.\n",
            step.name, template.name
        );
        if !step.configuration.is_empty() {
            let mut entries: Vec<(&String, &String)> = step.configuration.iter().collect();
            entries.sort();
            prompt.push_str("Configuration:\n");
            for (key, value) in entries {
                prompt.push_str(&format!("- {}: {}\n", key, value));
            }
        }
        prompt
    }

    async fn try_transition(
        &self,
        id: Uuid,
        target: ExecutionStatus,
        message: &str,
    ) -> Result<bool> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("WorkflowExecution", id.to_string()))?;
        let moved = execution.transition_to(target);
        if moved {
            self.emit(execution, message);
        } else {
            debug!(
                "Refused transition of {} from {} to {}",
                id,
                execution.status.as_str(),
                target.as_str()
            );
        }
        Ok(moved)
    }

    fn emit(&self, execution: &WorkflowExecution, message: &str) {
        self.events.emit(OrchestrationEvent::new(
            execution.id,
            EventKind::Execution,
            execution.status.as_str(),
            message,
            Some(execution.progress.percentage),
        ));
    }
}

impl Default for WorkflowExecutionManager {
    fn default() -> Self {
        Self::new(ExecutionConfig::default(), Arc::new(TracingEventSink))
    }
}
