//! Workflow aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod queries;
mod service;
mod state;
mod value_objects;

pub use aggregate::Workflow;
pub use commands::*;
pub use events::{
    ConnectionData, NodeAddedData, NodeRemovedData, NodeUpdatedData, WorkflowCreatedData,
    WorkflowDeletedData, WorkflowEvent, WorkflowEventKind, WorkflowRenamedData,
};
pub use queries::{QueryResult, WorkflowQuery, WorkflowSummary};
pub use service::{CommandResult, WorkflowService};
pub use state::WorkflowState;
pub use value_objects::{Connection, ConnectionKind, DEFAULT_PORT, Node, NodePatch, Position};

use common::{IdentifierError, ReadableIdentifier};
use thiserror::Error;

use crate::event_queue::QueueFull;

/// Errors raised by workflow operations.
///
/// A failed operation never changes the workflow or its pending events.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    /// Input violates a workflow rule (empty name, empty node type, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Node not found: {node_id}")]
    NodeNotFound { node_id: ReadableIdentifier },

    #[error("Connection not found: {source_node_id} -> {target_node_id}")]
    ConnectionNotFound {
        source_node_id: ReadableIdentifier,
        target_node_id: ReadableIdentifier,
    },

    #[error("Node already exists: {node_id}")]
    DuplicateNode { node_id: ReadableIdentifier },

    #[error("Connection already exists: {source_node_id} -> {target_node_id}")]
    DuplicateConnection {
        source_node_id: ReadableIdentifier,
        target_node_id: ReadableIdentifier,
    },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    /// The pending-event queue has no room for the events this change records.
    #[error(transparent)]
    EventQueueFull(#[from] QueueFull),
}

impl WorkflowError {
    /// Returns true for errors about a missing node or connection.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorkflowError::NodeNotFound { .. } | WorkflowError::ConnectionNotFound { .. }
        )
    }

    /// Returns true for errors about something that already exists.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            WorkflowError::DuplicateNode { .. } | WorkflowError::DuplicateConnection { .. }
        )
    }
}
