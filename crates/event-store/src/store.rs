use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{EventEnvelope, EventQuery, EventStoreError, Identifier, Result, Version};

/// A stream of events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Append-only event log.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of events for one aggregate.
    ///
    /// The batch is stored atomically and stamped with consecutive versions
    /// following the aggregate's current one. Returns the last stamped
    /// version.
    async fn append(&self, events: Vec<EventEnvelope>) -> Result<Version>;

    /// Retrieves all events for an aggregate in version order.
    async fn events_for_aggregate(&self, aggregate_id: Identifier) -> Result<Vec<EventEnvelope>>;

    /// Retrieves events of one type in occurrence order.
    async fn events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>>;

    /// Retrieves events matching a query.
    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>>;

    /// Streams every stored event in insertion order.
    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Returns the latest version of an aggregate's stream, or None if the
    /// aggregate has no events.
    async fn aggregate_version(&self, aggregate_id: Identifier) -> Result<Option<Version>>;
}

/// Convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends a single event.
    async fn append_event(&self, event: EventEnvelope) -> Result<Version> {
        self.append(vec![event]).await
    }

    /// Checks if an aggregate has any events.
    async fn has_events(&self, aggregate_id: Identifier) -> Result<bool> {
        Ok(self.aggregate_version(aggregate_id).await?.is_some())
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks that a batch is non-empty and targets a single aggregate.
///
/// Returns the aggregate id shared by the batch.
pub(crate) fn validate_batch(events: &[EventEnvelope]) -> Result<Identifier> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty batch".to_string(),
        ));
    };

    if let Some(stray) = events
        .iter()
        .find(|e| e.aggregate_id != first.aggregate_id || e.aggregate_type != first.aggregate_type)
    {
        return Err(EventStoreError::InvalidAppend(format!(
            "batch mixes aggregates {} and {}",
            first.aggregate_id, stray.aggregate_id
        )));
    }

    Ok(first.aggregate_id)
}
