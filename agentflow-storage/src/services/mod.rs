//! Service layer for collaboration and task reconciliation

pub mod collaboration;
pub mod currentness;

#[cfg(test)]
mod collaboration_tests;

pub use collaboration::{CollaborationService, CollaborationSnapshot, CollaborationStatistics};
pub use currentness::{
    compute_context_hash, title_similarity, CurrentnessReport, CurrentnessService, ExpectedTask,
    TaskValidationContext,
};
