//! PostgreSQL persistence for the workflow platform.
//!
//! Provides [`PostgresWorkflowRepository`], the production implementation of
//! the domain's `WorkflowRepository`, and [`StorageConfig`] for building its
//! connection pool.

mod config;
mod postgres;

pub use config::StorageConfig;
pub use postgres::PostgresWorkflowRepository;
