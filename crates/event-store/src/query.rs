use chrono::{DateTime, Utc};

use crate::{EventEnvelope, Identifier};

/// Filter over the event log.
///
/// Every criterion that is set must match; unset criteria match anything.
/// Results are ordered by occurrence time, then by version.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub aggregate_id: Option<Identifier>,
    pub aggregate_type: Option<String>,

    /// Any of these event types.
    pub event_types: Option<Vec<String>>,

    /// Inclusive lower bound on `occurred_at`.
    pub since: Option<DateTime<Utc>>,

    /// Inclusive upper bound on `occurred_at`.
    pub until: Option<DateTime<Utc>>,

    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl EventQuery {
    /// Creates a query that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a single aggregate's stream.
    pub fn for_aggregate(aggregate_id: Identifier) -> Self {
        Self {
            aggregate_id: Some(aggregate_id),
            ..Default::default()
        }
    }

    pub fn aggregate_id(mut self, id: Identifier) -> Self {
        self.aggregate_id = Some(id);
        self
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    /// Adds an event type to the accepted set.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types
            .get_or_insert_with(Vec::new)
            .push(event_type.into());
        self
    }

    pub fn since(mut self, timestamp: DateTime<Utc>) -> Self {
        self.since = Some(timestamp);
        self
    }

    pub fn until(mut self, timestamp: DateTime<Utc>) -> Self {
        self.until = Some(timestamp);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `event` satisfies every filter in this query.
    ///
    /// Paging (`limit`/`offset`) is applied by the store, not here.
    pub fn matches(&self, event: &EventEnvelope) -> bool {
        self.aggregate_id.is_none_or(|id| event.aggregate_id == id)
            && self
                .aggregate_type
                .as_ref()
                .is_none_or(|t| &event.aggregate_type == t)
            && self
                .event_types
                .as_ref()
                .is_none_or(|types| types.contains(&event.event_type))
            && self.since.is_none_or(|ts| event.occurred_at >= ts)
            && self.until.is_none_or(|ts| event.occurred_at <= ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(aggregate_id: Identifier, event_type: &str) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("Workflow")
            .event_type(event_type)
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap()
    }

    #[test]
    fn empty_query_matches_everything() {
        let event = envelope(Identifier::generate(), "NodeAdded");
        assert!(EventQuery::new().matches(&event));
    }

    #[test]
    fn event_type_accumulates() {
        let query = EventQuery::new()
            .event_type("NodeAdded")
            .event_type("NodeRemoved");

        assert_eq!(
            query.event_types,
            Some(vec!["NodeAdded".to_string(), "NodeRemoved".to_string()])
        );

        let id = Identifier::generate();
        assert!(query.matches(&envelope(id, "NodeRemoved")));
        assert!(!query.matches(&envelope(id, "ConnectionAdded")));
    }

    #[test]
    fn aggregate_filter() {
        let id = Identifier::generate();
        let query = EventQuery::for_aggregate(id);

        assert!(query.matches(&envelope(id, "NodeAdded")));
        assert!(!query.matches(&envelope(Identifier::generate(), "NodeAdded")));
    }

    #[test]
    fn time_window_is_inclusive() {
        let event = envelope(Identifier::generate(), "NodeAdded");
        let at = event.occurred_at;

        assert!(EventQuery::new().since(at).until(at).matches(&event));
        assert!(
            !EventQuery::new()
                .since(at + chrono::Duration::seconds(1))
                .matches(&event)
        );
    }
}
