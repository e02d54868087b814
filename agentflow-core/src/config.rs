//! Configuration for the orchestration engine
//!
//! Plain config structs with sensible defaults, owned by the service
//! instances they configure and passed in at construction time.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for execution step driving
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionConfig {
    /// Default per-step timeout when the step does not set its own
    pub step_timeout_seconds: u64,
    /// Delay between retry attempts against the same provider
    pub retry_delay_seconds: u64,
    /// Poll interval while an execution sits in paused state
    pub pause_poll_millis: u64,
    /// Maximum number of mutually independent steps run concurrently
    pub max_parallel_steps: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            step_timeout_seconds: 300,
            retry_delay_seconds: 5,
            pause_poll_millis: 200,
            max_parallel_steps: 4,
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.step_timeout_seconds == 0 {
            return Err(Error::validation("Step timeout must be positive"));
        }
        if self.max_parallel_steps == 0 {
            return Err(Error::validation("Max parallel steps must be positive"));
        }
        Ok(())
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }

    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_millis)
    }
}

/// Configuration for the provider health cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthCacheConfig {
    /// How long a cached health entry stays fresh
    pub ttl_seconds: u64,
    /// Upper bound on a single health probe
    pub probe_timeout_seconds: u64,
}

impl Default for HealthCacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            probe_timeout_seconds: 10,
        }
    }
}

impl HealthCacheConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_seconds as i64)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }
}

/// Configuration for multi-agent collaboration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollaborationConfig {
    /// Cap on concurrent collaboration links per agent
    pub max_concurrent_tasks_per_agent: u32,
}

impl Default for CollaborationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks_per_agent: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_config_defaults() {
        let config = ExecutionConfig::default();
        assert_eq!(config.step_timeout_seconds, 300);
        assert_eq!(config.retry_delay_seconds, 5);
        assert_eq!(config.max_parallel_steps, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_execution_config_validation() {
        let config = ExecutionConfig {
            step_timeout_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ExecutionConfig {
            max_parallel_steps: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_health_cache_defaults() {
        let config = HealthCacheConfig::default();
        assert_eq!(config.ttl_seconds, 300);
        assert_eq!(config.ttl(), chrono::Duration::minutes(5));
    }

    #[test]
    fn test_collaboration_defaults() {
        assert_eq!(
            CollaborationConfig::default().max_concurrent_tasks_per_agent,
            2
        );
    }
}
