//! In-memory repository for agent profiles
//!
//! Backs the collaboration service's agent pool. The repository owns the
//! atomic select-and-increment used at assignment time: candidate
//! filtering, tie-breaking and the workload increment all happen under
//! one write lock, so two concurrent assignments can never push an agent
//! past the workload cap.

use crate::{Error, Result};
use agentflow_core::agent::AgentProfile;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Document store for agent profiles, keyed by id
pub struct AgentRepository {
    agents: Arc<RwLock<HashMap<Uuid, AgentProfile>>>,
}

impl AgentRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            agents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a new agent profile
    pub async fn create(&self, agent: &AgentProfile) -> Result<()> {
        let mut agents = self.agents.write().await;
        if agents.contains_key(&agent.id) {
            return Err(Error::conflict(format!(
                "Agent {} already exists",
                agent.id
            )));
        }
        if agents.values().any(|a| a.name == agent.name) {
            return Err(Error::conflict(format!(
                "Agent with name '{}' already exists",
                agent.name
            )));
        }
        debug!("Storing agent '{}' ({})", agent.name, agent.id);
        agents.insert(agent.id, agent.clone());
        Ok(())
    }

    /// Find an agent by id
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AgentProfile>> {
        Ok(self.agents.read().await.get(&id).cloned())
    }

    /// Find an agent by name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<AgentProfile>> {
        Ok(self
            .agents
            .read()
            .await
            .values()
            .find(|a| a.name == name)
            .cloned())
    }

    /// All agents
    pub async fn list(&self) -> Result<Vec<AgentProfile>> {
        let mut agents: Vec<AgentProfile> = self.agents.read().await.values().cloned().collect();
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(agents)
    }

    /// All agents of a given type
    pub async fn list_by_type(&self, agent_type: &str) -> Result<Vec<AgentProfile>> {
        let mut agents: Vec<AgentProfile> = self
            .agents
            .read()
            .await
            .values()
            .filter(|a| a.agent_type == agent_type)
            .cloned()
            .collect();
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(agents)
    }

    /// Replace a stored agent profile
    pub async fn update(&self, agent: &AgentProfile) -> Result<()> {
        let mut agents = self.agents.write().await;
        match agents.get_mut(&agent.id) {
            Some(stored) => {
                *stored = agent.clone();
                Ok(())
            }
            None => Err(Error::not_found("Agent", agent.id.to_string())),
        }
    }

    /// Remove an agent
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        match self.agents.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::not_found("Agent", id.to_string())),
        }
    }

    /// Number of stored agents
    pub async fn count(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Atomically pick the least-loaded eligible agent and reserve one
    /// workload slot on it.
    ///
    /// Eligible means: matching type, available, workload below the cap
    /// and, when `required_skills` is non-empty, a non-empty skill
    /// intersection. Ties are broken by lowest current workload, then by
    /// name for determinism. Returns the reserved profile, or `None`
    /// when no agent qualifies.
    pub async fn reserve_least_loaded(
        &self,
        agent_type: &str,
        required_skills: &[String],
        max_concurrent: u32,
    ) -> Option<AgentProfile> {
        let mut agents = self.agents.write().await;
        let candidate = agents
            .values()
            .filter(|a| a.agent_type == agent_type)
            .filter(|a| a.has_capacity(max_concurrent))
            .filter(|a| required_skills.is_empty() || a.has_any_skill(required_skills))
            .min_by(|a, b| {
                a.active_tasks
                    .cmp(&b.active_tasks)
                    .then_with(|| a.name.cmp(&b.name))
            })
            .map(|a| a.id)?;

        let agent = agents.get_mut(&candidate).expect("candidate vanished");
        agent.active_tasks += 1;
        agent.touch();
        debug!(
            "Reserved agent '{}' ({} active tasks)",
            agent.name, agent.active_tasks
        );
        Some(agent.clone())
    }

    /// Release one previously reserved workload slot
    pub async fn release_assignment(&self, id: Uuid) -> Result<()> {
        let mut agents = self.agents.write().await;
        match agents.get_mut(&id) {
            Some(agent) => {
                agent.active_tasks = agent.active_tasks.saturating_sub(1);
                agent.touch();
                Ok(())
            }
            None => Err(Error::not_found("Agent", id.to_string())),
        }
    }
}

impl Default for AgentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(repo: &AgentRepository, name: &str, agent_type: &str, skills: &[&str]) -> Uuid {
        let agent = AgentProfile::builder()
            .name(name)
            .agent_type(agent_type)
            .skills(skills.iter().copied())
            .build()
            .unwrap();
        let id = agent.id;
        repo.create(&agent).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_crud_roundtrip() {
        let repo = AgentRepository::new();
        let id = seed(&repo, "dev-01", "backend-developer", &["rust"]).await;

        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.name, "dev-01");
        assert!(repo.find_by_name("dev-01").await.unwrap().is_some());
        assert_eq!(repo.count().await, 1);

        repo.delete(id).await.unwrap();
        assert!(repo.find_by_id(id).await.unwrap().is_none());
        assert!(repo.delete(id).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_name_conflict() {
        let repo = AgentRepository::new();
        seed(&repo, "dev-01", "backend-developer", &[]).await;

        let dup = AgentProfile::builder()
            .name("dev-01")
            .agent_type("frontend-developer")
            .build()
            .unwrap();
        assert!(matches!(repo.create(&dup).await, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_reserve_prefers_lowest_workload() {
        let repo = AgentRepository::new();
        let busy = seed(&repo, "dev-busy", "backend-developer", &[]).await;
        seed(&repo, "dev-idle", "backend-developer", &[]).await;

        // Push one agent to a single task
        repo.reserve_least_loaded("backend-developer", &[], 2).await;
        let first = repo.find_by_name("dev-busy").await.unwrap().unwrap();
        // Alphabetical tie-break picks dev-busy first
        assert_eq!(first.id, busy);
        assert_eq!(first.active_tasks, 1);

        // Next reservation goes to the idle agent
        let second = repo
            .reserve_least_loaded("backend-developer", &[], 2)
            .await
            .unwrap();
        assert_eq!(second.name, "dev-idle");
    }

    #[tokio::test]
    async fn test_reserve_respects_cap_and_skills() {
        let repo = AgentRepository::new();
        let id = seed(&repo, "qa-01", "qa-engineer", &["selenium"]).await;

        // Skill filter applies when required skills are declared
        assert!(repo
            .reserve_least_loaded("qa-engineer", &["cypress".to_string()], 2)
            .await
            .is_none());

        // Fill the agent to the cap
        for _ in 0..2 {
            assert!(repo
                .reserve_least_loaded("qa-engineer", &["selenium".to_string()], 2)
                .await
                .is_some());
        }
        assert!(repo
            .reserve_least_loaded("qa-engineer", &["selenium".to_string()], 2)
            .await
            .is_none());

        // Releasing a slot makes the agent eligible again
        repo.release_assignment(id).await.unwrap();
        assert!(repo
            .reserve_least_loaded("qa-engineer", &[], 2)
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_reserve_ignores_other_types() {
        let repo = AgentRepository::new();
        seed(&repo, "dev-01", "backend-developer", &[]).await;
        assert!(repo
            .reserve_least_loaded("architect", &[], 2)
            .await
            .is_none());
    }
}
