//! Multi-agent collaboration service: sequential chain hand-off
//!
//! A collaborative task walks a linear chain of agent links. Assignment
//! picks an eligible agent (matching type, workload below the cap, skill
//! intersection when required) with ties broken by lowest workload; the
//! selection and the workload increment happen atomically inside the
//! agent repository. Hand-off is the only operation that advances the
//! chain and is serialized per task id, so at most one link is ever
//! active and `current_agent_index` only moves forward.

use crate::repositories::{AgentRepository, CollaborationRepository};
use crate::{Error, Result};
use agentflow_core::collaboration::{
    CollaborationPlan, CollaborationStatus, CollaborativeTask, HandoffData, LinkStatus,
};
use agentflow_core::config::CollaborationConfig;
use agentflow_core::event::{EventKind, EventSink, OrchestrationEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Status snapshot for a collaborative task, with human-readable
/// reasons when progress has stalled
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollaborationSnapshot {
    pub task: CollaborativeTask,
    pub reasons: Vec<String>,
}

/// Aggregate counts across all collaborative tasks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CollaborationStatistics {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub blocked: usize,
    pub failed: usize,
}

/// Service coordinating agent chains over the repositories
pub struct CollaborationService {
    collaborations: Arc<CollaborationRepository>,
    agents: Arc<AgentRepository>,
    /// Per-task hand-off serialization
    handoff_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    events: Arc<dyn EventSink>,
    config: CollaborationConfig,
}

impl CollaborationService {
    /// Create a collaboration service over the given repositories
    pub fn new(
        collaborations: Arc<CollaborationRepository>,
        agents: Arc<AgentRepository>,
        events: Arc<dyn EventSink>,
        config: CollaborationConfig,
    ) -> Self {
        Self {
            collaborations,
            agents,
            handoff_locks: Mutex::new(HashMap::new()),
            events,
            config,
        }
    }

    /// Build a collaborative task from a plan, persist it, and
    /// immediately attempt to assign the first link
    pub async fn create_collaborative_task(
        &self,
        title: String,
        plan: &CollaborationPlan,
    ) -> Result<CollaborativeTask> {
        let task = CollaborativeTask::from_plan(title, plan)?;
        info!(
            "Created collaborative task '{}' with {} links",
            task.title,
            task.agent_chain.len()
        );
        self.collaborations.create(&task).await?;
        self.emit(&task, "collaborative task created");

        self.assign_next_agent_in_chain(task.id).await?;
        self.load(task.id).await
    }

    /// Assign the link at the current chain index, or complete the
    /// collaboration when the chain is exhausted.
    ///
    /// Returns `Ok(false)` without error when no eligible agent exists;
    /// the link and the collaboration are both left blocked and the
    /// caller may retry later.
    pub async fn assign_next_agent_in_chain(&self, task_id: Uuid) -> Result<bool> {
        let mut task = self.load(task_id).await?;

        if task.is_chain_exhausted() {
            if task.status != CollaborationStatus::Completed {
                task.mark_completed();
                self.collaborations.update(&task).await?;
                info!(
                    "Collaborative task '{}' completed: {} deliverables, {} minutes",
                    task.title,
                    task.aggregated_deliverables().len(),
                    task.total_actual_minutes()
                );
                self.emit(&task, "collaboration completed");
            }
            return Ok(true);
        }

        let (agent_type, required_skills) = {
            let link = task.active_link().expect("index checked above");
            (link.agent_type.clone(), link.required_skills.clone())
        };

        match self
            .agents
            .reserve_least_loaded(
                &agent_type,
                &required_skills,
                self.config.max_concurrent_tasks_per_agent,
            )
            .await
        {
            Some(agent) => {
                let index = task.current_agent_index;
                let link = task.active_link_mut().expect("index checked above");
                link.status = LinkStatus::Assigned;
                link.assigned_agent_id = Some(agent.id);
                task.status = CollaborationStatus::InProgress;
                task.updated_at = chrono::Utc::now();
                self.collaborations.update(&task).await?;
                info!(
                    "Assigned link {} of '{}' to agent '{}'",
                    index, task.title, agent.name
                );
                self.emit(&task, "chain link assigned");
                Ok(true)
            }
            None => {
                let link = task.active_link_mut().expect("index checked above");
                link.status = LinkStatus::Blocked;
                task.status = CollaborationStatus::Blocked;
                task.updated_at = chrono::Utc::now();
                self.collaborations.update(&task).await?;
                warn!(
                    "Collaborative task '{}' blocked: no eligible agent of type '{}'",
                    task.title, agent_type
                );
                self.emit(&task, "collaboration blocked");
                Ok(false)
            }
        }
    }

    /// Complete the current link on behalf of its assigned agent and
    /// advance the chain.
    ///
    /// This is the only way the chain advances. Hand-off is serialized
    /// per task, so two agents can never complete the same link
    /// concurrently. Fails with `AgentMismatch` when the caller does not
    /// own the current link.
    pub async fn complete_agent_part_and_handoff(
        &self,
        task_id: Uuid,
        agent_id: Uuid,
        completion: HandoffData,
    ) -> Result<CollaborativeTask> {
        let lock = self.task_lock(task_id).await;
        let _guard = lock.lock().await;

        let mut task = self.load(task_id).await?;

        if task.is_chain_exhausted() {
            return Err(agentflow_core::Error::invalid_transition(
                "collaborative_task",
                task.status.as_str(),
                "in_progress",
            )
            .into());
        }
        let link = task.active_link_mut().expect("chain is not exhausted");

        match link.assigned_agent_id {
            Some(assigned) if assigned == agent_id => {}
            Some(assigned) => {
                return Err(agentflow_core::Error::agent_mismatch(
                    assigned.to_string(),
                    agent_id.to_string(),
                )
                .into());
            }
            None => {
                return Err(agentflow_core::Error::agent_mismatch(
                    "unassigned",
                    agent_id.to_string(),
                )
                .into());
            }
        }

        link.status = LinkStatus::Completed;
        link.actual_minutes = completion.actual_minutes;
        link.handoff = Some(completion);
        let index = task.current_agent_index;
        task.recompute_progress();
        task.advance();
        self.collaborations.update(&task).await?;
        if let Err(e) = self.agents.release_assignment(agent_id).await {
            debug!("Could not release workload for agent {}: {}", agent_id, e);
        }
        info!(
            "Agent {} completed link {} of '{}'",
            agent_id, index, task.title
        );
        self.emit(&task, "chain link completed");

        self.assign_next_agent_in_chain(task_id).await?;
        self.load(task_id).await
    }

    /// Current state of a collaborative task plus the reasons progress
    /// has stalled, if any
    pub async fn get_collaboration_status(&self, task_id: Uuid) -> Result<CollaborationSnapshot> {
        let task = self.load(task_id).await?;
        let mut reasons = Vec::new();
        if task.status == CollaborationStatus::Blocked {
            if let Some(link) = task.active_link() {
                reasons.push(format!("no available agent for {}", link.agent_type));
            }
        }
        Ok(CollaborationSnapshot { task, reasons })
    }

    /// Aggregate counts across all collaborative tasks
    pub async fn statistics(&self) -> Result<CollaborationStatistics> {
        let tasks = self.collaborations.list().await?;
        let mut stats = CollaborationStatistics {
            total: tasks.len(),
            ..Default::default()
        };
        for task in tasks {
            match task.status {
                CollaborationStatus::Pending => stats.pending += 1,
                CollaborationStatus::InProgress => stats.in_progress += 1,
                CollaborationStatus::Completed => stats.completed += 1,
                CollaborationStatus::Blocked => stats.blocked += 1,
                CollaborationStatus::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }

    async fn load(&self, task_id: Uuid) -> Result<CollaborativeTask> {
        self.collaborations
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| Error::not_found("CollaborativeTask", task_id.to_string()))
    }

    async fn task_lock(&self, task_id: Uuid) -> Arc<Mutex<()>> {
        self.handoff_locks
            .lock()
            .await
            .entry(task_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn emit(&self, task: &CollaborativeTask, message: &str) {
        self.events.emit(OrchestrationEvent::new(
            task.id,
            EventKind::CollaborativeTask,
            task.status.as_str(),
            message,
            Some(task.overall_progress),
        ));
    }
}
