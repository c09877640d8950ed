use thiserror::Error;

use crate::{Identifier, Version};

/// Errors that can occur when interacting with the event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Another writer stamped the same aggregate version first.
    #[error("Concurrency conflict for aggregate {aggregate_id}: version {version} already exists")]
    ConcurrencyConflict {
        aggregate_id: Identifier,
        version: Version,
    },

    /// The batch passed to `append` cannot be stored as-is.
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    /// An envelope builder was missing a required field.
    #[error("Missing envelope field: {0}")]
    MissingField(&'static str),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
