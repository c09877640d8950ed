//! Domain error types.

use common::Identifier;
use event_store::EventStoreError;
use thiserror::Error;

use crate::repository::RepositoryError;
use crate::workflow::WorkflowError;

/// Errors returned by the workflow service.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The workflow rejected the change.
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(Identifier),

    #[error("Workflow already exists: {0}")]
    WorkflowAlreadyExists(Identifier),

    /// The id belonged to a deleted workflow. Its event stream is closed
    /// and the id cannot be reused.
    #[error("Workflow id {0} belonged to a deleted workflow")]
    WorkflowIdRetired(Identifier),

    /// Structural edit attempted on an active workflow while live edits are
    /// disabled.
    #[error("Workflow {0} is active; deactivate it before editing")]
    WorkflowActive(Identifier),
}

impl DomainError {
    /// Returns true when the target workflow (or something in it) does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            DomainError::WorkflowNotFound(_) => true,
            DomainError::Repository(RepositoryError::NotFound(_)) => true,
            DomainError::Workflow(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// Returns true for duplicates and lost concurrent updates.
    pub fn is_conflict(&self) -> bool {
        match self {
            DomainError::WorkflowAlreadyExists(_) | DomainError::WorkflowIdRetired(_) => true,
            DomainError::Repository(RepositoryError::ConcurrencyConflict { .. }) => true,
            DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => true,
            DomainError::Workflow(err) => err.is_conflict(),
            _ => false,
        }
    }
}
