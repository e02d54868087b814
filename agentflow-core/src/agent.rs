//! Agent profile domain model
//!
//! Agents are the specialized workers (business analyst, architect,
//! developer, QA and so on) that collaborative tasks are handed off to.
//! A profile carries the agent's type, its skill set and its current
//! collaboration workload, which the assignment logic reads when picking
//! the next link owner in a chain.
//!
//! # Examples
//!
//! ```rust
//! use agentflow_core::agent::*;
//!
//! let agent = AgentProfile::builder()
//!     .name("backend-01")
//!     .agent_type("backend-developer")
//!     .skill("rust")
//!     .skill("api-design")
//!     .build()
//!     .unwrap();
//!
//! assert!(agent.is_available());
//! assert!(agent.has_skill("rust"));
//! ```

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A specialized agent available for collaborative task assignment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentProfile {
    pub id: Uuid,
    pub name: String,
    pub agent_type: String,
    pub skills: Vec<String>,
    pub availability: AgentAvailability,
    /// Number of collaboration chain links currently assigned to this agent
    pub active_tasks: u32,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Availability of an agent for new assignments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentAvailability {
    Available,
    Busy,
    Offline,
}

impl AgentProfile {
    /// Create a new agent profile with validation
    pub fn new(name: String, agent_type: String, skills: Vec<String>) -> Result<Self> {
        Self::validate_name(&name)?;
        Self::validate_agent_type(&agent_type)?;
        Self::validate_skills(&skills)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            agent_type,
            skills,
            availability: AgentAvailability::Available,
            active_tasks: 0,
            created_at: now,
            last_seen: now,
        })
    }

    /// Create a builder for constructing an AgentProfile
    pub fn builder() -> AgentProfileBuilder {
        AgentProfileBuilder::new()
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::validation("Agent name cannot be empty"));
        }
        if name.len() > 100 {
            return Err(Error::validation("Agent name cannot exceed 100 characters"));
        }
        Ok(())
    }

    fn validate_agent_type(agent_type: &str) -> Result<()> {
        if agent_type.trim().is_empty() {
            return Err(Error::validation("Agent type cannot be empty"));
        }
        if !agent_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::validation(
                "Agent type can only contain alphanumeric characters, hyphens, and underscores",
            ));
        }
        Ok(())
    }

    fn validate_skills(skills: &[String]) -> Result<()> {
        for skill in skills {
            if skill.trim().is_empty() {
                return Err(Error::validation("Skill cannot be empty"));
            }
            if skill.len() > 50 {
                return Err(Error::validation("Skill name cannot exceed 50 characters"));
            }
        }
        Ok(())
    }

    /// Update the agent's last seen timestamp
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    /// Check if the agent can take on new work
    pub fn is_available(&self) -> bool {
        matches!(self.availability, AgentAvailability::Available)
    }

    /// Update availability
    pub fn set_availability(&mut self, availability: AgentAvailability) {
        self.availability = availability;
        self.touch();
    }

    /// Check if the agent has a specific skill
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s == skill)
    }

    /// Check if the agent has at least one of the given skills
    pub fn has_any_skill(&self, skills: &[String]) -> bool {
        skills.iter().any(|s| self.has_skill(s))
    }

    /// Check if the agent can accept another collaboration link given a cap
    pub fn has_capacity(&self, max_concurrent: u32) -> bool {
        self.is_available() && self.active_tasks < max_concurrent
    }
}

/// Builder for constructing AgentProfile instances with validation
#[derive(Debug, Clone, Default)]
pub struct AgentProfileBuilder {
    name: Option<String>,
    agent_type: Option<String>,
    skills: Vec<String>,
}

impl AgentProfileBuilder {
    /// Create a new agent profile builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the agent name
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the agent type
    pub fn agent_type<S: Into<String>>(mut self, agent_type: S) -> Self {
        self.agent_type = Some(agent_type.into());
        self
    }

    /// Add a skill
    pub fn skill<S: Into<String>>(mut self, skill: S) -> Self {
        self.skills.push(skill.into());
        self
    }

    /// Add multiple skills
    pub fn skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills.extend(skills.into_iter().map(|s| s.into()));
        self
    }

    /// Build the AgentProfile instance
    pub fn build(self) -> Result<AgentProfile> {
        let name = self
            .name
            .ok_or_else(|| Error::validation("Agent name is required"))?;
        let agent_type = self
            .agent_type
            .ok_or_else(|| Error::validation("Agent type is required"))?;

        AgentProfile::new(name, agent_type, self.skills)
    }
}
