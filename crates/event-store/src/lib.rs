//! Append-only log for domain events dispatched by the workflow service.
//!
//! Aggregates never publish their own events. The application layer drains
//! them after a command and appends them here as [`EventEnvelope`]s.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::Identifier;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::EventQuery;
pub use store::{EventStore, EventStoreExt, EventStream};
