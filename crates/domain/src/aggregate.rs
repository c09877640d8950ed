//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use common::Identifier;
use event_store::{EventEnvelope, Version};
use serde::{Serialize, de::DeserializeOwned};

use crate::event_queue::EventQueue;

/// Trait for domain events.
///
/// Domain events record facts that already happened inside an aggregate.
/// They are immutable and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name used for storage and filtering.
    fn event_type(&self) -> &'static str;

    /// Returns the aggregate the event happened to.
    fn aggregate_id(&self) -> Identifier;

    /// Returns when the change happened.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Returns the kind-specific payload as JSON.
    fn payload(&self) -> Result<serde_json::Value, serde_json::Error>;
}

/// Trait for state-stored aggregates that queue the events they cause.
///
/// An aggregate is a consistency boundary: it is changed only through its own
/// operations, each of which preserves its invariants and records the events
/// it caused. Nothing is published until the owner drains the queue.
pub trait AggregateRoot: Send + Sync {
    /// The type of events this aggregate records.
    type Event: DomainEvent;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    fn id(&self) -> Identifier;

    /// Returns the number of accepted mutations so far.
    fn version(&self) -> Version;

    /// Returns the events recorded since the last drain.
    fn pending_events(&self) -> &EventQueue<Self::Event>;

    /// Removes and returns the recorded events, oldest first.
    fn drain_events(&mut self) -> Vec<Self::Event>;

    /// Returns true if the aggregate has undispatched events.
    fn has_pending_events(&self) -> bool {
        !self.pending_events().is_empty()
    }
}

/// Wraps drained events into envelopes for the event store.
///
/// `command` is recorded in each envelope's metadata.
pub fn to_envelopes<A: AggregateRoot>(
    events: &[A::Event],
    command: &str,
) -> Result<Vec<EventEnvelope>, event_store::EventStoreError> {
    events
        .iter()
        .map(|event| {
            EventEnvelope::builder()
                .aggregate_id(event.aggregate_id())
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .occurred_at(event.occurred_at())
                .payload_raw(event.payload()?)
                .metadata("command", serde_json::Value::from(command))
                .build()
        })
        .collect()
}
