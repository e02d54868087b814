//! Collaborative task and agent chain domain model
//!
//! A complex task is modeled as a linear chain of agent links: each link
//! names the agent type that must complete it, the skills it requires and
//! the deliverables it produces. Exactly one link is active at a time;
//! completing it advances `current_agent_index`, which never decreases.
//! The collaboration is completed exactly when the index has walked past
//! the end of the chain.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plan describing the agent sequence for a collaborative task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollaborationPlan {
    pub agent_sequence: Vec<PlannedLink>,
}

/// One planned hand-off in a collaboration plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannedLink {
    pub agent_type: String,
    pub role: String,
    pub estimated_minutes: u32,
    pub required_skills: Vec<String>,
    pub dependencies: Vec<String>,
    pub deliverables: Vec<String>,
}

/// One link in an agent chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentChainLink {
    pub agent_type: String,
    pub role: String,
    /// Position of this link in the chain, 0-based
    pub sequence: usize,
    pub estimated_minutes: u32,
    pub actual_minutes: Option<u32>,
    pub required_skills: Vec<String>,
    pub dependencies: Vec<String>,
    pub deliverables: Vec<String>,
    pub status: LinkStatus,
    pub assigned_agent_id: Option<Uuid>,
    pub handoff: Option<HandoffData>,
}

/// Status of a single chain link
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Blocked,
    Skipped,
}

/// Aggregate status of a collaboration chain
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
    Failed,
}

impl CollaborationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollaborationStatus::Pending => "pending",
            CollaborationStatus::InProgress => "in_progress",
            CollaborationStatus::Completed => "completed",
            CollaborationStatus::Blocked => "blocked",
            CollaborationStatus::Failed => "failed",
        }
    }
}

/// Data recorded when an agent completes its part and hands off
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HandoffData {
    pub notes: String,
    pub deliverables: Vec<String>,
    pub actual_minutes: Option<u32>,
}

/// A complex task handed off along a chain of specialized agents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollaborativeTask {
    pub id: Uuid,
    pub title: String,
    pub agent_chain: Vec<AgentChainLink>,
    /// Index of the active link; monotonic, never decreases
    pub current_agent_index: usize,
    /// Completed links over total links, as a rounded percentage
    pub overall_progress: u32,
    pub status: CollaborationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CollaborativeTask {
    /// Build a task from a plan: every link pending, index at zero
    pub fn from_plan(title: String, plan: &CollaborationPlan) -> Result<Self> {
        if title.trim().is_empty() {
            return Err(Error::validation("Collaborative task title cannot be empty"));
        }
        if plan.agent_sequence.is_empty() {
            return Err(Error::validation(
                "Collaboration plan must contain at least one agent",
            ));
        }
        for (index, link) in plan.agent_sequence.iter().enumerate() {
            if link.agent_type.trim().is_empty() {
                return Err(Error::validation(format!(
                    "Planned link {} has an empty agent type",
                    index
                )));
            }
        }

        let agent_chain = plan
            .agent_sequence
            .iter()
            .enumerate()
            .map(|(sequence, planned)| AgentChainLink {
                agent_type: planned.agent_type.clone(),
                role: planned.role.clone(),
                sequence,
                estimated_minutes: planned.estimated_minutes,
                actual_minutes: None,
                required_skills: planned.required_skills.clone(),
                dependencies: planned.dependencies.clone(),
                deliverables: planned.deliverables.clone(),
                status: LinkStatus::Pending,
                assigned_agent_id: None,
                handoff: None,
            })
            .collect();

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            title,
            agent_chain,
            current_agent_index: 0,
            overall_progress: 0,
            status: CollaborationStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    /// The link at `current_agent_index`, if the chain is not exhausted
    pub fn active_link(&self) -> Option<&AgentChainLink> {
        self.agent_chain.get(self.current_agent_index)
    }

    /// Mutable access to the active link
    pub fn active_link_mut(&mut self) -> Option<&mut AgentChainLink> {
        self.agent_chain.get_mut(self.current_agent_index)
    }

    /// Whether the index has walked past the end of the chain
    pub fn is_chain_exhausted(&self) -> bool {
        self.current_agent_index >= self.agent_chain.len()
    }

    /// Recompute `overall_progress` from completed links
    pub fn recompute_progress(&mut self) {
        let total = self.agent_chain.len();
        if total == 0 {
            return;
        }
        let completed = self
            .agent_chain
            .iter()
            .filter(|l| l.status == LinkStatus::Completed)
            .count();
        self.overall_progress = ((completed as f64 / total as f64) * 100.0).round() as u32;
    }

    /// Advance the chain index by one. The index only ever moves forward.
    pub fn advance(&mut self) {
        self.current_agent_index += 1;
        self.updated_at = Utc::now();
    }

    /// Mark the whole collaboration completed and aggregate chain totals
    pub fn mark_completed(&mut self) {
        self.status = CollaborationStatus::Completed;
        self.recompute_progress();
        let now = Utc::now();
        self.updated_at = now;
        self.completed_at = Some(now);
    }

    /// All deliverables recorded across completed links, in chain order
    pub fn aggregated_deliverables(&self) -> Vec<String> {
        self.agent_chain
            .iter()
            .filter_map(|l| l.handoff.as_ref())
            .flat_map(|h| h.deliverables.iter().cloned())
            .collect()
    }

    /// Total actual minutes recorded across completed links
    pub fn total_actual_minutes(&self) -> u32 {
        self.agent_chain
            .iter()
            .filter_map(|l| l.actual_minutes)
            .sum()
    }

    /// Verify the chain invariant: completed iff the index is past the
    /// end, links before the index completed or skipped, links after it
    /// pending.
    pub fn check_invariants(&self) -> Result<()> {
        let exhausted = self.is_chain_exhausted();
        let completed = self.status == CollaborationStatus::Completed;
        if exhausted != completed {
            return Err(Error::validation(format!(
                "Chain invariant violated: index {} of {} but status {:?}",
                self.current_agent_index,
                self.agent_chain.len(),
                self.status
            )));
        }
        for link in &self.agent_chain[..self.current_agent_index.min(self.agent_chain.len())] {
            if !matches!(link.status, LinkStatus::Completed | LinkStatus::Skipped) {
                return Err(Error::validation(format!(
                    "Link {} behind the index is {:?}",
                    link.sequence, link.status
                )));
            }
        }
        if !exhausted {
            for link in &self.agent_chain[self.current_agent_index + 1..] {
                if link.status != LinkStatus::Pending {
                    return Err(Error::validation(format!(
                        "Link {} ahead of the index is {:?}",
                        link.sequence, link.status
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn three_link_plan() -> CollaborationPlan {
        let link = |agent_type: &str, role: &str| PlannedLink {
            agent_type: agent_type.to_string(),
            role: role.to_string(),
            estimated_minutes: 60,
            required_skills: Vec::new(),
            dependencies: Vec::new(),
            deliverables: Vec::new(),
        };
        CollaborationPlan {
            agent_sequence: vec![
                link("business-analyst", "requirements"),
                link("architect", "design"),
                link("backend-developer", "implementation"),
            ],
        }
    }

    #[test]
    fn test_from_plan_builds_pending_chain() {
        let task = CollaborativeTask::from_plan("Build checkout".to_string(), &three_link_plan())
            .unwrap();

        assert_eq!(task.agent_chain.len(), 3);
        assert_eq!(task.current_agent_index, 0);
        assert_eq!(task.status, CollaborationStatus::Pending);
        assert!(task
            .agent_chain
            .iter()
            .all(|l| l.status == LinkStatus::Pending));
        assert_eq!(task.active_link().unwrap().agent_type, "business-analyst");
        task.check_invariants().unwrap();
    }

    #[test]
    fn test_from_plan_validation() {
        let empty_plan = CollaborationPlan {
            agent_sequence: Vec::new(),
        };
        assert!(CollaborativeTask::from_plan("t".to_string(), &empty_plan).is_err());
        assert!(CollaborativeTask::from_plan("  ".to_string(), &three_link_plan()).is_err());
    }

    #[test]
    fn test_progress_rollup() {
        let mut task =
            CollaborativeTask::from_plan("Build checkout".to_string(), &three_link_plan()).unwrap();

        task.agent_chain[0].status = LinkStatus::Completed;
        task.recompute_progress();
        assert_eq!(task.overall_progress, 33);

        task.agent_chain[1].status = LinkStatus::Completed;
        task.recompute_progress();
        assert_eq!(task.overall_progress, 67);
    }

    #[test]
    fn test_completion_invariant() {
        let mut task =
            CollaborativeTask::from_plan("Build checkout".to_string(), &three_link_plan()).unwrap();

        for i in 0..3 {
            task.agent_chain[i].status = LinkStatus::Completed;
            task.advance();
        }
        assert!(task.is_chain_exhausted());
        task.mark_completed();
        assert_eq!(task.status, CollaborationStatus::Completed);
        assert_eq!(task.overall_progress, 100);
        task.check_invariants().unwrap();
    }

    #[test]
    fn test_invariant_detects_mismatch() {
        let mut task =
            CollaborativeTask::from_plan("Build checkout".to_string(), &three_link_plan()).unwrap();
        // Completed status without an exhausted chain violates the invariant
        task.status = CollaborationStatus::Completed;
        assert!(task.check_invariants().is_err());
    }

    #[test]
    fn test_deliverable_aggregation() {
        let mut task =
            CollaborativeTask::from_plan("Build checkout".to_string(), &three_link_plan()).unwrap();
        task.agent_chain[0].handoff = Some(HandoffData {
            notes: "done".to_string(),
            deliverables: vec!["requirements.md".to_string()],
            actual_minutes: Some(45),
        });
        task.agent_chain[0].actual_minutes = Some(45);
        task.agent_chain[1].handoff = Some(HandoffData {
            notes: "done".to_string(),
            deliverables: vec!["design.md".to_string(), "erd.png".to_string()],
            actual_minutes: Some(90),
        });
        task.agent_chain[1].actual_minutes = Some(90);

        assert_eq!(
            task.aggregated_deliverables(),
            vec!["requirements.md", "design.md", "erd.png"]
        );
        assert_eq!(task.total_actual_minutes(), 135);
    }
}
