//! Persistence seam and collaboration services for Agentflow
//!
//! This crate provides the in-memory document stores behind the
//! repository interfaces, plus the two stateful services that operate
//! over them: multi-agent chain hand-off and task currentness
//! reconciliation.

pub mod error;
pub mod manager;
pub mod repositories;
pub mod services;

pub use error::{Error, Result};
pub use manager::StorageManager;

/// Re-export core types for convenience
pub use agentflow_core as core;
