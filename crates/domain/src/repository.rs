//! Workflow persistence contract and the in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::Identifier;
use event_store::Version;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::aggregate::AggregateRoot;
use crate::workflow::Workflow;

/// Errors raised by workflow repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Workflow not found: {0}")]
    NotFound(Identifier),

    /// The stored workflow is at least as new as the one being saved and differs from it.
    #[error(
        "Concurrency conflict for workflow {id}: stored version {stored}, attempted {attempted}"
    )]
    ConcurrencyConflict {
        id: Identifier,
        stored: Version,
        attempted: Version,
    },

    /// The backing store failed.
    #[error("Persistence error: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepositoryError {
    /// Wraps a backend error.
    pub fn persistence(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        RepositoryError::Persistence(err.into())
    }
}

/// Storage for workflow aggregates.
///
/// Implementations persist the aggregate's state only; pending events are
/// never stored and a loaded workflow has none.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Inserts or replaces a workflow.
    ///
    /// Re-saving an identical document is allowed. Saving a workflow whose
    /// version does not advance past the stored one otherwise fails with
    /// [`RepositoryError::ConcurrencyConflict`], so two writers that started
    /// from the same version cannot both win.
    async fn save(&self, workflow: &Workflow) -> Result<(), RepositoryError>;

    /// Loads a workflow, or `None` if the id is unknown.
    async fn find_by_id(&self, id: Identifier) -> Result<Option<Workflow>, RepositoryError>;

    /// Removes a workflow. Fails with [`RepositoryError::NotFound`] if absent.
    async fn delete(&self, id: Identifier) -> Result<(), RepositoryError>;

    /// Returns all workflows, oldest first.
    async fn find_all(&self) -> Result<Vec<Workflow>, RepositoryError>;

    async fn exists(&self, id: Identifier) -> Result<bool, RepositoryError> {
        Ok(self.find_by_id(id).await?.is_some())
    }
}

#[derive(Debug, Clone)]
struct StoredWorkflow {
    version: Version,
    document: serde_json::Value,
}

/// In-memory workflow repository.
///
/// Workflows are kept as serialized documents, the same shape the
/// PostgreSQL repository stores. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkflowRepository {
    workflows: Arc<RwLock<HashMap<Identifier, StoredWorkflow>>>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.workflows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workflows.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.workflows.write().await.clear();
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn save(&self, workflow: &Workflow) -> Result<(), RepositoryError> {
        let document = serde_json::to_value(workflow)?;
        let mut workflows = self.workflows.write().await;

        if let Some(stored) = workflows.get(&workflow.id()) {
            if stored.version >= workflow.version() && stored.document != document {
                return Err(RepositoryError::ConcurrencyConflict {
                    id: workflow.id(),
                    stored: stored.version,
                    attempted: workflow.version(),
                });
            }
        }

        workflows.insert(
            workflow.id(),
            StoredWorkflow {
                version: workflow.version(),
                document,
            },
        );
        Ok(())
    }

    async fn find_by_id(&self, id: Identifier) -> Result<Option<Workflow>, RepositoryError> {
        let workflows = self.workflows.read().await;
        workflows
            .get(&id)
            .map(|stored| serde_json::from_value(stored.document.clone()))
            .transpose()
            .map_err(RepositoryError::from)
    }

    async fn delete(&self, id: Identifier) -> Result<(), RepositoryError> {
        match self.workflows.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound(id)),
        }
    }

    async fn find_all(&self) -> Result<Vec<Workflow>, RepositoryError> {
        let workflows = self.workflows.read().await;
        let mut all = workflows
            .values()
            .map(|stored| serde_json::from_value::<Workflow>(stored.document.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        all.sort_by_key(|w| (w.created_at(), w.id()));
        Ok(all)
    }
}
