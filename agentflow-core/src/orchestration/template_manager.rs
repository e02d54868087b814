//! In-memory catalog of reusable workflow templates
//!
//! The manager owns the template catalog and is the single validation
//! gate: requirements are checked against the registered providers
//! first (reporting every missing id at once), then each step is
//! validated independently. Validation is pure; only a template that
//! passes lands in the catalog.

use crate::template::WorkflowTemplate;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Catalog and validator for workflow templates
pub struct WorkflowTemplateManager {
    templates: Arc<RwLock<HashMap<Uuid, WorkflowTemplate>>>,
}

impl WorkflowTemplateManager {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            templates: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Validate a template against the currently available providers.
    ///
    /// Pure, no side effects. Requirements are checked before any step
    /// validation so a caller sees every missing provider in one error.
    /// Must pass before an execution of the template is created.
    pub fn validate_requirements(
        template: &WorkflowTemplate,
        available_providers: &[String],
    ) -> Result<()> {
        template.validate_requirements(available_providers)?;
        template.validate_steps()
    }

    /// Validate the template's structure and store it, returning its id
    pub async fn create(&self, template: WorkflowTemplate) -> Result<Uuid> {
        template.validate_steps()?;

        let id = template.id;
        info!("Registered workflow template '{}' ({})", template.name, id);
        self.templates.write().await.insert(id, template);
        Ok(id)
    }

    /// Look up a template by id
    pub async fn get(&self, id: Uuid) -> Result<WorkflowTemplate> {
        self.templates
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("WorkflowTemplate", id.to_string()))
    }

    /// All templates in the catalog
    pub async fn list(&self) -> Vec<WorkflowTemplate> {
        let mut templates: Vec<WorkflowTemplate> =
            self.templates.read().await.values().cloned().collect();
        templates.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        templates
    }

    /// Remove a template. Returns an error if the id is unknown.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        match self.templates.write().await.remove(&id) {
            Some(template) => {
                debug!("Deleted workflow template '{}' ({})", template.name, id);
                Ok(())
            }
            None => Err(Error::not_found("WorkflowTemplate", id.to_string())),
        }
    }

    /// Number of templates in the catalog
    pub async fn count(&self) -> usize {
        self.templates.read().await.len()
    }
}

impl Default for WorkflowTemplateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{ProviderStrategy, StepType, WorkflowStep};

    fn sample_template() -> WorkflowTemplate {
        WorkflowTemplate::builder()
            .name("api-feature")
            .category("development")
            .step(WorkflowStep::new("analyze", StepType::AiGeneration))
            .step(WorkflowStep::new("validate", StepType::Validation).depends_on(["analyze"]))
            .provider_strategy(ProviderStrategy::new("openai"))
            .require_provider("openai")
            .build()
            .unwrap()
    }

    fn providers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_get_list_delete() {
        let manager = WorkflowTemplateManager::new();
        let template = sample_template();
        let id = manager.create(template.clone()).await.unwrap();

        assert_eq!(manager.get(id).await.unwrap().name, "api-feature");
        assert_eq!(manager.list().await.len(), 1);
        assert_eq!(manager.count().await, 1);

        manager.delete(id).await.unwrap();
        assert!(manager.get(id).await.is_err());
        assert!(manager.delete(id).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_providers_checked_before_steps() {
        // Both the provider requirement and a step are invalid; the
        // requirements failure must win and name every absent provider.
        let mut template = sample_template();
        template.requirements.required_providers.push("anthropic".to_string());
        template.steps[0].name = String::new();

        let err = WorkflowTemplateManager::validate_requirements(&template, &providers(&["local"]))
            .unwrap_err();
        match err {
            Error::MissingProviders { providers } => {
                assert_eq!(providers, vec!["openai", "anthropic"])
            }
            other => panic!("expected MissingProviders, got {other:?}"),
        }

        // With the providers present, the step failure surfaces
        let err = WorkflowTemplateManager::validate_requirements(
            &template,
            &providers(&["openai", "anthropic"]),
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_invalid_step_rejected_and_not_stored() {
        let manager = WorkflowTemplateManager::new();
        let mut template = sample_template();
        template.steps[1].depends_on = vec!["nonexistent".to_string()];

        let err = manager.create(template).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(manager.count().await, 0);
    }

    #[tokio::test]
    async fn test_get_unknown_template() {
        let manager = WorkflowTemplateManager::new();
        let result = manager.get(Uuid::new_v4()).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }
}
