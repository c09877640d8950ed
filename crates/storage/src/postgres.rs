use async_trait::async_trait;
use common::Identifier;
use domain::{AggregateRoot, RepositoryError, Workflow, WorkflowRepository};
use event_store::Version;
use sqlx::{PgPool, Row};

/// PostgreSQL-backed workflow repository.
///
/// Each workflow is one row: the serialized aggregate in `document`, plus
/// the columns needed for listing and the version guard.
#[derive(Clone)]
pub struct PostgresWorkflowRepository {
    pool: PgPool,
}

impl PostgresWorkflowRepository {
    /// Creates a new PostgreSQL workflow repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(RepositoryError::persistence)
    }

    async fn stored_version(&self, id: Identifier) -> Result<Option<Version>, RepositoryError> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM workflows WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::persistence)?;

        Ok(version.map(Version::new))
    }
}

#[async_trait]
impl WorkflowRepository for PostgresWorkflowRepository {
    #[tracing::instrument(skip(self, workflow), fields(workflow_id = %workflow.id(), version = %workflow.version()))]
    async fn save(&self, workflow: &Workflow) -> Result<(), RepositoryError> {
        let document = serde_json::to_value(workflow)?;

        // The WHERE clause turns a stale or competing write into a no-op we
        // can detect. Re-saving an identical document still matches.
        let result = sqlx::query(
            r#"
            INSERT INTO workflows (id, name, active, version, created_at, updated_at, document)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                active = EXCLUDED.active,
                version = EXCLUDED.version,
                updated_at = EXCLUDED.updated_at,
                document = EXCLUDED.document
            WHERE workflows.version < EXCLUDED.version
               OR workflows.document = EXCLUDED.document
            "#,
        )
        .bind(workflow.id().as_uuid())
        .bind(workflow.name())
        .bind(workflow.is_active())
        .bind(workflow.version().as_i64())
        .bind(workflow.created_at())
        .bind(workflow.updated_at())
        .bind(&document)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::persistence)?;

        if result.rows_affected() == 0 {
            let stored = self
                .stored_version(workflow.id())
                .await?
                .unwrap_or_default();
            tracing::warn!(%stored, "rejected stale workflow write");
            return Err(RepositoryError::ConcurrencyConflict {
                id: workflow.id(),
                stored,
                attempted: workflow.version(),
            });
        }

        tracing::debug!("saved workflow");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: Identifier) -> Result<Option<Workflow>, RepositoryError> {
        let row = sqlx::query("SELECT document FROM workflows WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::persistence)?;

        match row {
            Some(row) => {
                let document: serde_json::Value = row
                    .try_get("document")
                    .map_err(RepositoryError::persistence)?;
                Ok(Some(serde_json::from_value(document)?))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: Identifier) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::persistence)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<Workflow>, RepositoryError> {
        let documents: Vec<serde_json::Value> =
            sqlx::query_scalar("SELECT document FROM workflows ORDER BY created_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(RepositoryError::persistence)?;

        documents
            .into_iter()
            .map(|document| serde_json::from_value(document).map_err(RepositoryError::from))
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn exists(&self, id: Identifier) -> Result<bool, RepositoryError> {
        Ok(self.stored_version(id).await?.is_some())
    }
}
