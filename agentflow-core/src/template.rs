//! Workflow template domain model
//!
//! A template is the reusable, validated blueprint for a workflow: an
//! ordered list of typed steps with dependencies, a provider strategy
//! (primary plus ordered fallbacks) and the provider requirements that
//! must be satisfied before the template can be executed. Templates are
//! immutable once created and identified by id.
//!
//! # Examples
//!
//! ```rust
//! use agentflow_core::template::*;
//!
//! let template = WorkflowTemplate::builder()
//!     .name("feature-delivery")
//!     .category("development")
//!     .complexity(ComplexityTier::Standard)
//!     .step(WorkflowStep::new("analyze", StepType::AiGeneration))
//!     .step(WorkflowStep::new("implement", StepType::AiGeneration).depends_on(["analyze"]))
//!     .provider_strategy(ProviderStrategy::new("openai").fallback("anthropic"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(template.steps.len(), 2);
//! ```

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Reusable blueprint for a multi-step workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowTemplate {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub complexity: ComplexityTier,
    pub steps: Vec<WorkflowStep>,
    pub provider_strategy: ProviderStrategy,
    pub requirements: TemplateRequirements,
    pub created_at: DateTime<Utc>,
}

/// Complexity tier of a workflow template
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    Simple,
    Standard,
    Complex,
}

/// One unit of work within a template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStep {
    pub name: String,
    pub step_type: StepType,
    /// Names of earlier steps whose output this step needs
    pub depends_on: Vec<String>,
    pub configuration: HashMap<String, String>,
    pub max_retries: u32,
    pub timeout_seconds: Option<u64>,
}

/// The fixed set of step types a template may use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    AiGeneration,
    HumanReview,
    DataProcessing,
    Integration,
    Validation,
}

/// Provider selection strategy for a template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderStrategy {
    pub primary: String,
    /// Ordered fallbacks tried after the primary is exhausted
    pub fallbacks: Vec<String>,
    pub prefer_low_cost: bool,
    pub context_affinity: bool,
}

/// Provider requirements a template imposes on its environment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TemplateRequirements {
    pub required_providers: Vec<String>,
    pub optional_providers: Vec<String>,
    pub shared_context: bool,
    pub workspace_access: bool,
}

impl WorkflowStep {
    /// Create a step with defaults (no dependencies, one retry)
    pub fn new<S: Into<String>>(name: S, step_type: StepType) -> Self {
        Self {
            name: name.into(),
            step_type,
            depends_on: Vec::new(),
            configuration: HashMap::new(),
            max_retries: 1,
            timeout_seconds: None,
        }
    }

    /// Declare dependencies on earlier steps by name
    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(names.into_iter().map(|n| n.into()));
        self
    }

    /// Set a configuration entry
    pub fn config<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }

    /// Set the retry budget for this step
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set a per-step timeout
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }
}

impl ProviderStrategy {
    /// Create a strategy with a primary provider and no fallbacks
    pub fn new<S: Into<String>>(primary: S) -> Self {
        Self {
            primary: primary.into(),
            fallbacks: Vec::new(),
            prefer_low_cost: false,
            context_affinity: false,
        }
    }

    /// Append a fallback provider
    pub fn fallback<S: Into<String>>(mut self, provider: S) -> Self {
        self.fallbacks.push(provider.into());
        self
    }

    /// All providers in selection order: primary first, then fallbacks
    pub fn provider_order(&self) -> Vec<&str> {
        std::iter::once(self.primary.as_str())
            .chain(self.fallbacks.iter().map(|s| s.as_str()))
            .collect()
    }
}

impl WorkflowTemplate {
    /// Create a builder for constructing a WorkflowTemplate
    pub fn builder() -> WorkflowTemplateBuilder {
        WorkflowTemplateBuilder::new()
    }

    /// Validate structural correctness of the template's steps.
    ///
    /// Each step is checked independently: non-empty name, unique name,
    /// and dependencies that reference only earlier steps.
    pub fn validate_steps(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::validation("Template must have at least one step"));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(Error::validation(format!(
                    "Step {} has an empty name",
                    index
                )));
            }
            if !seen.insert(step.name.as_str()) {
                return Err(Error::validation(format!(
                    "Duplicate step name '{}'",
                    step.name
                )));
            }
            for dep in &step.depends_on {
                if dep == &step.name {
                    return Err(Error::validation(format!(
                        "Step '{}' cannot depend on itself",
                        step.name
                    )));
                }
                // Only earlier steps are valid dependency targets, which
                // also rules out cycles in the declared graph.
                if !self.steps[..index].iter().any(|s| &s.name == dep) {
                    return Err(Error::validation(format!(
                        "Step '{}' depends on unknown or later step '{}'",
                        step.name, dep
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check the template's provider requirements against the providers
    /// actually registered, failing with every absent id at once.
    pub fn validate_requirements(&self, available_providers: &[String]) -> Result<()> {
        let missing: Vec<String> = self
            .requirements
            .required_providers
            .iter()
            .filter(|p| !available_providers.contains(p))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(Error::missing_providers(missing));
        }
        Ok(())
    }

    /// Look up a step by name
    pub fn step(&self, name: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Builder for constructing WorkflowTemplate instances with validation
#[derive(Debug, Clone, Default)]
pub struct WorkflowTemplateBuilder {
    name: Option<String>,
    category: Option<String>,
    complexity: Option<ComplexityTier>,
    steps: Vec<WorkflowStep>,
    provider_strategy: Option<ProviderStrategy>,
    requirements: TemplateRequirements,
}

impl WorkflowTemplateBuilder {
    /// Create a new template builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the template name
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the template category
    pub fn category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the complexity tier
    pub fn complexity(mut self, complexity: ComplexityTier) -> Self {
        self.complexity = Some(complexity);
        self
    }

    /// Append a step
    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Set the provider strategy
    pub fn provider_strategy(mut self, strategy: ProviderStrategy) -> Self {
        self.provider_strategy = Some(strategy);
        self
    }

    /// Mark a provider as required
    pub fn require_provider<S: Into<String>>(mut self, provider: S) -> Self {
        self.requirements.required_providers.push(provider.into());
        self
    }

    /// Mark a provider as optional
    pub fn optional_provider<S: Into<String>>(mut self, provider: S) -> Self {
        self.requirements.optional_providers.push(provider.into());
        self
    }

    /// Require shared context across steps
    pub fn shared_context(mut self, shared: bool) -> Self {
        self.requirements.shared_context = shared;
        self
    }

    /// Require workspace access
    pub fn workspace_access(mut self, access: bool) -> Self {
        self.requirements.workspace_access = access;
        self
    }

    /// Build the WorkflowTemplate, validating structure
    pub fn build(self) -> Result<WorkflowTemplate> {
        let name = self
            .name
            .ok_or_else(|| Error::validation("Template name is required"))?;
        if name.trim().is_empty() {
            return Err(Error::validation("Template name cannot be empty"));
        }
        let provider_strategy = self
            .provider_strategy
            .ok_or_else(|| Error::validation("Provider strategy is required"))?;
        if provider_strategy.primary.trim().is_empty() {
            return Err(Error::validation("Primary provider cannot be empty"));
        }

        let template = WorkflowTemplate {
            id: Uuid::new_v4(),
            name,
            category: self.category.unwrap_or_else(|| "general".to_string()),
            complexity: self.complexity.unwrap_or(ComplexityTier::Standard),
            steps: self.steps,
            provider_strategy,
            requirements: self.requirements,
            created_at: Utc::now(),
        };
        template.validate_steps()?;
        Ok(template)
    }
}
