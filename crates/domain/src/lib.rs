//! Domain layer for the workflow platform.
//!
//! This crate provides the core domain abstractions including:
//! - AggregateRoot and DomainEvent traits for state-stored aggregates
//! - A bounded event queue aggregates record into
//! - The Workflow aggregate with its commands, queries and service
//! - The WorkflowRepository contract and an in-memory implementation

pub mod aggregate;
pub mod config;
pub mod error;
pub mod event_queue;
pub mod repository;
pub mod workflow;

pub use aggregate::{AggregateRoot, DomainEvent, to_envelopes};
pub use config::{EditPolicy, ServiceConfig};
pub use error::DomainError;
pub use event_queue::{EventQueue, QueueFull};
pub use repository::{InMemoryWorkflowRepository, RepositoryError, WorkflowRepository};
pub use workflow::{
    ActivateWorkflow, AddConnection, AddNode, CommandResult, Connection, ConnectionKind,
    CreateWorkflow, DEFAULT_PORT, DeactivateWorkflow, DeleteWorkflow, DuplicateWorkflow, Node,
    NodePatch, Position, QueryResult, RemoveConnection, RemoveNode, RenameWorkflow, UpdateNode,
    Workflow, WorkflowCommand, WorkflowError, WorkflowEvent, WorkflowEventKind, WorkflowQuery,
    WorkflowService, WorkflowState, WorkflowSummary,
};
