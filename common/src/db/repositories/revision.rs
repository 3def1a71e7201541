// Revision repository: append-only version history

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::Revision;
use tracing::instrument;
use uuid::Uuid;

/// Repository for the append-only revision log. Revisions are written as a
/// side effect of every content state transition and never touched again.
pub struct RevisionRepository {
    pool: DbPool,
}

impl RevisionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append one revision for `entity_id`. The version is assigned inside
    /// the insert statement as max(existing) + 1, so concurrent writers for
    /// the same entity cannot both read a stale maximum from the
    /// application side.
    #[instrument(skip(self, snapshot))]
    pub async fn create(
        &self,
        entity_id: Uuid,
        reason: &str,
        actor: Option<Uuid>,
        snapshot: serde_json::Value,
    ) -> Result<Revision, DatabaseError> {
        let revision = sqlx::query_as::<_, Revision>(
            r#"
            INSERT INTO revisions (id, entity_id, version, snapshot, reason, actor, created_at)
            VALUES (
                $1, $2,
                (SELECT COALESCE(MAX(version), 0) + 1 FROM revisions WHERE entity_id = $2),
                $3, $4, $5, NOW()
            )
            RETURNING id, entity_id, version, snapshot, reason, actor, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entity_id)
        .bind(snapshot)
        .bind(reason)
        .bind(actor)
        .fetch_one(self.pool.pool())
        .await?;

        tracing::debug!(
            entity_id = %entity_id,
            version = revision.version,
            reason = reason,
            "Revision appended"
        );
        Ok(revision)
    }

    /// Highest version recorded for an entity, 0 when none exist.
    #[instrument(skip(self))]
    pub async fn latest_version(&self, entity_id: Uuid) -> Result<i32, DatabaseError> {
        let version: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) FROM revisions WHERE entity_id = $1",
        )
        .bind(entity_id)
        .fetch_one(self.pool.pool())
        .await?;

        Ok(version)
    }

    /// Full history for an entity, oldest first.
    #[instrument(skip(self))]
    pub async fn list_for_entity(&self, entity_id: Uuid) -> Result<Vec<Revision>, DatabaseError> {
        let revisions = sqlx::query_as::<_, Revision>(
            r#"
            SELECT id, entity_id, version, snapshot, reason, actor, created_at
            FROM revisions
            WHERE entity_id = $1
            ORDER BY version
            "#,
        )
        .bind(entity_id)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(revisions)
    }
}
