//! Storage manager bundling the repositories
//!
//! One instance owns every in-memory store; services receive the
//! repositories they need from here instead of creating their own.

use crate::repositories::{AgentRepository, CollaborationRepository, TaskRepository};
use std::sync::Arc;
use tracing::info;

/// Main storage manager coordinating all repositories
pub struct StorageManager {
    agents: Arc<AgentRepository>,
    tasks: Arc<TaskRepository>,
    collaborations: Arc<CollaborationRepository>,
}

impl StorageManager {
    /// Create a storage manager with empty stores
    pub fn new() -> Self {
        info!("Initializing in-memory storage");
        Self {
            agents: Arc::new(AgentRepository::new()),
            tasks: Arc::new(TaskRepository::new()),
            collaborations: Arc::new(CollaborationRepository::new()),
        }
    }

    /// Get the agent repository
    pub fn agents(&self) -> Arc<AgentRepository> {
        self.agents.clone()
    }

    /// Get the step task repository
    pub fn tasks(&self) -> Arc<TaskRepository> {
        self.tasks.clone()
    }

    /// Get the collaborative task repository
    pub fn collaborations(&self) -> Arc<CollaborationRepository> {
        self.collaborations.clone()
    }

    /// Get storage statistics
    pub async fn stats(&self) -> StorageStats {
        StorageStats {
            agents_count: self.agents.count().await,
            tasks_count: self.tasks.count().await,
            collaborations_count: self.collaborations.count().await,
        }
    }
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    pub agents_count: usize,
    pub tasks_count: usize,
    pub collaborations_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_core::agent::AgentProfile;

    #[tokio::test]
    async fn test_stats_reflect_stores() {
        let storage = StorageManager::new();
        let agent = AgentProfile::builder()
            .name("dev-01")
            .agent_type("backend-developer")
            .build()
            .unwrap();
        storage.agents().create(&agent).await.unwrap();

        let stats = storage.stats().await;
        assert_eq!(stats.agents_count, 1);
        assert_eq!(stats.tasks_count, 0);
        assert_eq!(stats.collaborations_count, 0);
    }
}
