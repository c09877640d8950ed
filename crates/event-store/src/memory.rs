use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EventEnvelope, EventQuery, Identifier, Result, Version,
    store::{EventStore, EventStream, validate_batch},
};

/// In-memory event store.
///
/// Events are kept in insertion order. Cloning shares the underlying log.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Removes every stored event.
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }

    fn current_version(events: &[EventEnvelope], aggregate_id: Identifier) -> Version {
        events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max()
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, mut events: Vec<EventEnvelope>) -> Result<Version> {
        let aggregate_id = validate_batch(&events)?;

        let mut log = self.events.write().await;
        let mut version = Self::current_version(&log, aggregate_id);
        for event in &mut events {
            version = version.next();
            event.version = version;
        }
        log.extend(events);

        Ok(version)
    }

    async fn events_for_aggregate(&self, aggregate_id: Identifier) -> Result<Vec<EventEnvelope>> {
        let log = self.events.read().await;
        let mut events: Vec<_> = log
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        let log = self.events.read().await;
        let mut events: Vec<_> = log
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.occurred_at);
        Ok(events)
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let log = self.events.read().await;
        let mut events: Vec<_> = log.iter().filter(|e| query.matches(e)).cloned().collect();

        events.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then(a.version.cmp(&b.version))
        });

        let events = events
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(events)
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.events.read().await.clone();
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn aggregate_version(&self, aggregate_id: Identifier) -> Result<Option<Version>> {
        let log = self.events.read().await;
        let version = Self::current_version(&log, aggregate_id);
        Ok((version != Version::initial()).then_some(version))
    }
}
