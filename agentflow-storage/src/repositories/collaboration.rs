//! In-memory repository for collaborative tasks
//!
//! Chain state lives in explicit typed fields on `CollaborativeTask`,
//! not in a metadata blob; the repository just stores and retrieves
//! whole documents by id.

use crate::{Error, Result};
use agentflow_core::collaboration::{CollaborationStatus, CollaborativeTask};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Document store for collaborative tasks, keyed by id
pub struct CollaborationRepository {
    tasks: Arc<RwLock<HashMap<Uuid, CollaborativeTask>>>,
}

impl CollaborationRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a new collaborative task
    pub async fn create(&self, task: &CollaborativeTask) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(Error::conflict(format!(
                "Collaborative task {} already exists",
                task.id
            )));
        }
        debug!("Storing collaborative task '{}' ({})", task.title, task.id);
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    /// Find a collaborative task by id
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CollaborativeTask>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    /// Replace a stored collaborative task
    pub async fn update(&self, task: &CollaborativeTask) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.id) {
            Some(stored) => {
                *stored = task.clone();
                Ok(())
            }
            None => Err(Error::not_found("CollaborativeTask", task.id.to_string())),
        }
    }

    /// All collaborative tasks
    pub async fn list(&self) -> Result<Vec<CollaborativeTask>> {
        let mut tasks: Vec<CollaborativeTask> =
            self.tasks.read().await.values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    /// All collaborative tasks in a given status
    pub async fn list_by_status(&self, status: CollaborationStatus) -> Result<Vec<CollaborativeTask>> {
        Ok(self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect())
    }

    /// Remove a collaborative task
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        match self.tasks.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::not_found("CollaborativeTask", id.to_string())),
        }
    }

    /// Number of stored collaborative tasks
    pub async fn count(&self) -> usize {
        self.tasks.read().await.len()
    }
}

impl Default for CollaborationRepository {
    fn default() -> Self {
        Self::new()
    }
}
