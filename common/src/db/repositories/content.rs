// Content repository: posts and reviews share one row shape, so one
// repository serves both tables keyed by ContentKind.

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{ContentItem, ContentKind};
use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

const ITEM_COLUMNS: &str = "id, title, slug, body, status, scheduled_at, scheduled_by, \
     published_at, reviewed_at, created_at, updated_at";

/// Repository for publishable content (posts and reviews)
pub struct ContentRepository {
    pool: DbPool,
}

impl ContentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new draft item.
    #[instrument(skip(self, item), fields(kind = %kind, id = %item.id))]
    pub async fn create(&self, kind: ContentKind, item: &ContentItem) -> Result<(), DatabaseError> {
        let query = format!(
            r#"
            INSERT INTO {} ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
            kind.table(),
            ITEM_COLUMNS
        );

        sqlx::query(&query)
            .bind(item.id)
            .bind(&item.title)
            .bind(&item.slug)
            .bind(&item.body)
            .bind(item.status)
            .bind(item.scheduled_at)
            .bind(item.scheduled_by)
            .bind(item.published_at)
            .bind(item.reviewed_at)
            .bind(item.created_at)
            .bind(item.updated_at)
            .execute(self.pool.pool())
            .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn find_by_id(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentItem>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1",
            ITEM_COLUMNS,
            kind.table()
        );

        let item = sqlx::query_as::<_, ContentItem>(&query)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(item)
    }

    /// Find drafts whose schedule is at or before `now`. The boundary
    /// instant counts as due.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn find_due(
        &self,
        kind: ContentKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<ContentItem>, DatabaseError> {
        let query = format!(
            r#"
            SELECT {}
            FROM {}
            WHERE status = 'draft' AND scheduled_at IS NOT NULL AND scheduled_at <= $1
            ORDER BY scheduled_at
            "#,
            ITEM_COLUMNS,
            kind.table()
        );

        let items = sqlx::query_as::<_, ContentItem>(&query)
            .bind(now)
            .fetch_all(self.pool.pool())
            .await?;

        tracing::debug!(kind = %kind, count = items.len(), "Found due items");
        Ok(items)
    }

    /// Conditional publish transition for one due item.
    ///
    /// The WHERE clause restates the full due precondition so that under
    /// concurrent invocations (other processes included) exactly one caller
    /// observes an affected row. `published_at` is kept if already set.
    ///
    /// Returns whether this call won the transition.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn publish_due(
        &self,
        kind: ContentKind,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let query = format!(
            r#"
            UPDATE {}
            SET status = 'published',
                published_at = COALESCE(published_at, $2),
                reviewed_at = $2,
                scheduled_at = NULL,
                scheduled_by = NULL,
                updated_at = $2
            WHERE id = $1 AND status = 'draft'
              AND scheduled_at IS NOT NULL AND scheduled_at <= $2
            "#,
            kind.table()
        );

        let result = sqlx::query(&query)
            .bind(id)
            .bind(now)
            .execute(self.pool.pool())
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Set or overwrite the schedule on a draft. Only drafts can carry a
    /// schedule; a non-draft item is left untouched and `None` is returned.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn set_schedule(
        &self,
        kind: ContentKind,
        id: Uuid,
        publish_at: DateTime<Utc>,
        actor: Uuid,
    ) -> Result<Option<ContentItem>, DatabaseError> {
        let query = format!(
            r#"
            UPDATE {}
            SET scheduled_at = $2, scheduled_by = $3, updated_at = $4
            WHERE id = $1 AND status = 'draft'
            RETURNING {}
            "#,
            kind.table(),
            ITEM_COLUMNS
        );

        let item = sqlx::query_as::<_, ContentItem>(&query)
            .bind(id)
            .bind(publish_at)
            .bind(actor)
            .bind(Utc::now())
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(item)
    }

    /// Clear the schedule back to a plain draft. Both schedule fields are
    /// nulled in the same statement.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn clear_schedule(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentItem>, DatabaseError> {
        let query = format!(
            r#"
            UPDATE {}
            SET scheduled_at = NULL, scheduled_by = NULL, updated_at = $2
            WHERE id = $1 AND status = 'draft'
            RETURNING {}
            "#,
            kind.table(),
            ITEM_COLUMNS
        );

        let item = sqlx::query_as::<_, ContentItem>(&query)
            .bind(id)
            .bind(Utc::now())
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(item)
    }

    /// Publish a draft right now, bypassing any schedule. Clears the
    /// schedule fields atomically with the status change.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn publish_immediately(
        &self,
        kind: ContentKind,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ContentItem>, DatabaseError> {
        let query = format!(
            r#"
            UPDATE {}
            SET status = 'published',
                published_at = COALESCE(published_at, $2),
                reviewed_at = $2,
                scheduled_at = NULL,
                scheduled_by = NULL,
                updated_at = $2
            WHERE id = $1 AND status = 'draft'
            RETURNING {}
            "#,
            kind.table(),
            ITEM_COLUMNS
        );

        let item = sqlx::query_as::<_, ContentItem>(&query)
            .bind(id)
            .bind(now)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(item)
    }

    /// Count drafts whose schedule is older than `cutoff` — items the
    /// scheduler should already have published. Health-monitor signal.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn count_overdue(
        &self,
        kind: ContentKind,
        cutoff: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let query = format!(
            r#"
            SELECT COUNT(*)
            FROM {}
            WHERE status = 'draft' AND scheduled_at IS NOT NULL AND scheduled_at < $1
            "#,
            kind.table()
        );

        let count: i64 = sqlx::query_scalar(&query)
            .bind(cutoff)
            .fetch_one(self.pool.pool())
            .await?;

        Ok(count)
    }

    /// Published items for the member-facing listing, newest first.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn list_published(
        &self,
        kind: ContentKind,
        limit: i64,
    ) -> Result<Vec<ContentItem>, DatabaseError> {
        let query = format!(
            r#"
            SELECT {}
            FROM {}
            WHERE status = 'published'
            ORDER BY published_at DESC
            LIMIT $1
            "#,
            ITEM_COLUMNS,
            kind.table()
        );

        let items = sqlx::query_as::<_, ContentItem>(&query)
            .bind(limit)
            .fetch_all(self.pool.pool())
            .await?;

        Ok(items)
    }
}
