//! Provider seam: the narrow interface to external language-model backends
//!
//! The orchestration core never assumes a specific wire protocol. A
//! provider implements text generation and a health probe; everything
//! else (HTTP clients, auth, model naming) lives behind the trait.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request for a text generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    /// Create a request with default generation options
    pub fn new<S: Into<String>>(prompt: S) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Response from a text generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationResponse {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Token accounting for one generation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Result of a provider health probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderStatus {
    pub status: HealthStatus,
    pub latency_ms: Option<u64>,
    pub message: Option<String>,
}

/// Health classification of a provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl HealthStatus {
    /// Whether a provider in this state should receive work
    pub fn is_usable(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
        }
    }
}

/// Cached health entry for a registered provider. Derived, not
/// authoritative; recomputed when the cache entry expires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderHealth {
    pub provider: String,
    pub status: HealthStatus,
    pub last_checked: DateTime<Utc>,
    pub latency_ms: Option<u64>,
    pub message: Option<String>,
}

impl ProviderHealth {
    /// An entry for a provider that has not been probed yet
    pub fn unknown<S: Into<String>>(provider: S) -> Self {
        Self {
            provider: provider.into(),
            status: HealthStatus::Unknown,
            last_checked: Utc::now(),
            latency_ms: None,
            message: None,
        }
    }
}

/// Main trait implemented by every language-model backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable provider id used in strategies and usage counters
    fn name(&self) -> &str;

    /// Generate text for a prompt
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse>;

    /// Probe the provider's health
    async fn health_check(&self) -> Result<ProviderStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_health_status_usability() {
        assert!(HealthStatus::Healthy.is_usable());
        assert!(HealthStatus::Degraded.is_usable());
        assert!(!HealthStatus::Unhealthy.is_usable());
        assert!(!HealthStatus::Unknown.is_usable());
    }

    #[test]
    fn test_unknown_health_entry() {
        let health = ProviderHealth::unknown("openai");
        assert_eq!(health.provider, "openai");
        assert_eq!(health.status, HealthStatus::Unknown);
    }
}
