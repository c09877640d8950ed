use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::{TryStreamExt, stream};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EventEnvelope, EventId, EventQuery, EventStoreError, Identifier, Result, Version,
    store::{EventStore, EventStream, validate_batch},
};

const EVENT_COLUMNS: &str =
    "id, event_type, aggregate_id, aggregate_type, version, occurred_at, payload, metadata";

/// Rows fetched per round trip by [`PostgresEventStore::stream_all_events`].
const STREAM_PAGE_SIZE: i64 = 500;

/// PostgreSQL-backed event store.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: &PgRow) -> Result<EventEnvelope> {
        let metadata: HashMap<String, serde_json::Value> =
            serde_json::from_value(row.try_get("metadata")?)?;

        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: Identifier::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            occurred_at: row.try_get("occurred_at")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }

    /// Fetches the page of events stored after `after_position`.
    ///
    /// Returns the events together with the last position seen.
    async fn fetch_page(
        pool: PgPool,
        after_position: i64,
    ) -> Result<Option<(Vec<EventEnvelope>, i64, bool)>> {
        let rows = sqlx::query(&format!(
            "SELECT position, {EVENT_COLUMNS} FROM workflow_events \
             WHERE position > $1 ORDER BY position ASC LIMIT $2"
        ))
        .bind(after_position)
        .bind(STREAM_PAGE_SIZE)
        .fetch_all(&pool)
        .await?;

        let Some(last) = rows.last() else {
            return Ok(None);
        };
        let last_position: i64 = last.try_get("position")?;
        let exhausted = (rows.len() as i64) < STREAM_PAGE_SIZE;

        let events = rows
            .iter()
            .map(Self::row_to_event)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some((events, last_position, exhausted)))
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, events: Vec<EventEnvelope>) -> Result<Version> {
        let aggregate_id = validate_batch(&events)?;

        let mut tx = self.pool.begin().await?;

        // Serializes appends for one aggregate so version stamping is gap-free.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(aggregate_id.to_string())
            .execute(&mut *tx)
            .await?;

        let current: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) FROM workflow_events WHERE aggregate_id = $1",
        )
        .bind(aggregate_id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;

        let mut version = Version::new(current);
        for event in &events {
            version = version.next();

            sqlx::query(
                r#"
                INSERT INTO workflow_events
                    (id, event_type, aggregate_id, aggregate_type, version, occurred_at, payload, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(&event.event_type)
            .bind(aggregate_id.as_uuid())
            .bind(&event.aggregate_type)
            .bind(version.as_i64())
            .bind(event.occurred_at)
            .bind(&event.payload)
            .bind(serde_json::to_value(&event.metadata)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err)
                    if db_err.constraint() == Some("unique_aggregate_version") =>
                {
                    EventStoreError::ConcurrencyConflict {
                        aggregate_id,
                        version,
                    }
                }
                other => EventStoreError::Database(other),
            })?;
        }

        tx.commit().await?;
        tracing::debug!(%aggregate_id, %version, count = events.len(), "appended events");

        Ok(version)
    }

    async fn events_for_aggregate(&self, aggregate_id: Identifier) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM workflow_events WHERE aggregate_id = $1 ORDER BY version ASC"
        ))
        .bind(aggregate_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM workflow_events WHERE event_type = $1 \
             ORDER BY occurred_at ASC, position ASC"
        ))
        .bind(event_type)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {EVENT_COLUMNS} FROM workflow_events WHERE TRUE"
        ));

        if let Some(id) = query.aggregate_id {
            qb.push(" AND aggregate_id = ").push_bind(id.as_uuid());
        }
        if let Some(aggregate_type) = query.aggregate_type {
            qb.push(" AND aggregate_type = ").push_bind(aggregate_type);
        }
        if let Some(event_types) = query.event_types {
            qb.push(" AND event_type = ANY(")
                .push_bind(event_types)
                .push(")");
        }
        if let Some(since) = query.since {
            qb.push(" AND occurred_at >= ").push_bind(since);
        }
        if let Some(until) = query.until {
            qb.push(" AND occurred_at <= ").push_bind(until);
        }

        qb.push(" ORDER BY occurred_at ASC, version ASC");

        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            qb.push(" OFFSET ").push_bind(offset as i64);
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_event).collect()
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        let pages = stream::try_unfold(
            (self.pool.clone(), 0_i64, false),
            |(pool, after, exhausted)| async move {
                if exhausted {
                    return Ok(None);
                }
                let page = Self::fetch_page(pool.clone(), after).await?;
                Ok::<_, EventStoreError>(
                    page.map(|(events, last, exhausted)| (events, (pool, last, exhausted))),
                )
            },
        );

        let events = pages
            .map_ok(|events| stream::iter(events.into_iter().map(Ok::<_, EventStoreError>)))
            .try_flatten();

        Ok(Box::pin(events))
    }

    async fn aggregate_version(&self, aggregate_id: Identifier) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM workflow_events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }
}
