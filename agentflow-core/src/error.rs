//! Error types for the orchestration core

use thiserror::Error;

/// Core error type for orchestration operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid transition: {entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    #[error("Missing providers: {}", .providers.join(", "))]
    MissingProviders { providers: Vec<String> },

    #[error("No provider available for step '{step}' (attempted: {})", .attempted.join(", "))]
    ProviderUnavailable { step: String, attempted: Vec<String> },

    #[error("Agent mismatch: expected {expected}, got {actual}")]
    AgentMismatch { expected: String, actual: String },

    #[error("No eligible agent of type '{agent_type}'")]
    NoEligibleAgent { agent_type: String },

    #[error("Operation timeout: {operation} exceeded {timeout_seconds}s")]
    Timeout {
        operation: String,
        timeout_seconds: u64,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl Error {
    /// Create a validation error with a formatted message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error for a specific entity type and ID
    pub fn not_found<S1: Into<String>, S2: Into<String>>(entity_type: S1, id: S2) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition<S1, S2, S3>(entity: S1, from: S2, to: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidTransition {
            entity: entity.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create a missing providers error from the absent provider ids
    pub fn missing_providers(providers: Vec<String>) -> Self {
        Self::MissingProviders { providers }
    }

    /// Create a provider unavailable error for a step
    pub fn provider_unavailable<S: Into<String>>(step: S, attempted: Vec<String>) -> Self {
        Self::ProviderUnavailable {
            step: step.into(),
            attempted,
        }
    }

    /// Create an agent mismatch error
    pub fn agent_mismatch<S1: Into<String>, S2: Into<String>>(expected: S1, actual: S2) -> Self {
        Self::AgentMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a no eligible agent error
    pub fn no_eligible_agent<S: Into<String>>(agent_type: S) -> Self {
        Self::NoEligibleAgent {
            agent_type: agent_type.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, timeout_seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_seconds,
        }
    }

    /// Check if this error is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Check if this error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this error is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Check if this error is recoverable (caller can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. } | Error::ProviderUnavailable { .. } | Error::NoEligibleAgent { .. }
        )
    }

    /// Get the error category for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation",
            Error::NotFound { .. } => "not_found",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::MissingProviders { .. } => "missing_providers",
            Error::ProviderUnavailable { .. } => "provider_unavailable",
            Error::AgentMismatch { .. } => "agent_mismatch",
            Error::NoEligibleAgent { .. } => "no_eligible_agent",
            Error::Timeout { .. } => "timeout",
            Error::Serialization(_) => "serialization",
            Error::Internal(_) => "internal",
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, Error>;
