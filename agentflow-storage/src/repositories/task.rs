//! In-memory repository for step tasks
//!
//! Tasks are keyed by id and queried by the approval (step) they were
//! generated for. The currentness service is the main writer.

use crate::{Error, Result};
use agentflow_core::task::{StepTask, TaskStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Document store for step tasks, keyed by id
pub struct TaskRepository {
    tasks: Arc<RwLock<HashMap<Uuid, StepTask>>>,
}

impl TaskRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a new task
    pub async fn create(&self, task: &StepTask) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(Error::conflict(format!("Task {} already exists", task.id)));
        }
        debug!("Storing task '{}' ({})", task.title, task.id);
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    /// Find a task by id
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<StepTask>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    /// All tasks generated for one step approval, oldest first
    pub async fn list_by_approval(&self, approval_id: Uuid) -> Result<Vec<StepTask>> {
        let mut tasks: Vec<StepTask> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.approval_id == approval_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tasks)
    }

    /// All tasks in a given status
    pub async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<StepTask>> {
        Ok(self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect())
    }

    /// Replace a stored task
    pub async fn update(&self, task: &StepTask) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.id) {
            Some(stored) => {
                *stored = task.clone();
                Ok(())
            }
            None => Err(Error::not_found("StepTask", task.id.to_string())),
        }
    }

    /// Remove a task
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        match self.tasks.write().await.remove(&id) {
            Some(task) => {
                debug!("Deleted task '{}' ({})", task.title, id);
                Ok(())
            }
            None => Err(Error::not_found("StepTask", id.to_string())),
        }
    }

    /// Number of stored tasks
    pub async fn count(&self) -> usize {
        self.tasks.read().await.len()
    }
}

impl Default for TaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_core::task::TaskPriority;

    fn task_for(approval_id: Uuid, title: &str) -> StepTask {
        StepTask::new(
            approval_id,
            "business-analyst".to_string(),
            title.to_string(),
            "description".to_string(),
            "analysis".to_string(),
            TaskPriority::Medium,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_crud_roundtrip() {
        let repo = TaskRepository::new();
        let approval = Uuid::new_v4();
        let task = task_for(approval, "Analyze requirements");
        repo.create(&task).await.unwrap();

        assert!(repo.find_by_id(task.id).await.unwrap().is_some());
        assert!(repo.create(&task).await.is_err());

        let mut updated = task.clone();
        updated.title = "Analyze business requirements".to_string();
        repo.update(&updated).await.unwrap();
        assert_eq!(
            repo.find_by_id(task.id).await.unwrap().unwrap().title,
            "Analyze business requirements"
        );

        repo.delete(task.id).await.unwrap();
        assert!(repo.delete(task.id).await.is_err());
        assert_eq!(repo.count().await, 0);
    }

    #[tokio::test]
    async fn test_list_by_approval_is_scoped() {
        let repo = TaskRepository::new();
        let approval_a = Uuid::new_v4();
        let approval_b = Uuid::new_v4();
        repo.create(&task_for(approval_a, "first")).await.unwrap();
        repo.create(&task_for(approval_a, "second")).await.unwrap();
        repo.create(&task_for(approval_b, "other")).await.unwrap();

        assert_eq!(repo.list_by_approval(approval_a).await.unwrap().len(), 2);
        assert_eq!(repo.list_by_approval(approval_b).await.unwrap().len(), 1);
        assert!(repo
            .list_by_approval(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let repo = TaskRepository::new();
        let approval = Uuid::new_v4();
        let mut task = task_for(approval, "first");
        repo.create(&task).await.unwrap();

        task.set_status(TaskStatus::InProgress);
        repo.update(&task).await.unwrap();

        assert!(repo
            .list_by_status(TaskStatus::Pending)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            repo.list_by_status(TaskStatus::InProgress).await.unwrap().len(),
            1
        );
    }
}
