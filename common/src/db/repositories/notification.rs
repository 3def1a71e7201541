// Notification repository: in-app alert rows, dedupe lookups, and the
// per-recipient email delivery ledger

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{AdminAlert, EmailStatus, Notification};
use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, kind, severity, title, message, href, payload, read_at, created_at";

/// Repository for admin notifications and email delivery records.
pub struct NotificationRepository {
    pool: DbPool,
}

impl NotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Persist one notification row for a recipient.
    #[instrument(skip(self, alert), fields(kind = %alert.kind))]
    pub async fn create_for_recipient(
        &self,
        recipient_id: Uuid,
        alert: &AdminAlert,
    ) -> Result<Notification, DatabaseError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL, NOW())
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS, NOTIFICATION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(recipient_id)
        .bind(alert.kind.as_str())
        .bind(alert.severity.as_str())
        .bind(&alert.title)
        .bind(&alert.message)
        .bind(&alert.href)
        .bind(&alert.payload)
        .fetch_one(self.pool.pool())
        .await?;

        Ok(notification)
    }

    /// Timestamp of the most recent notification of `kind`, across all
    /// recipients. One record inside the dedupe window suppresses the whole
    /// next fan-out.
    #[instrument(skip(self))]
    pub async fn latest_of_kind(&self, kind: &str) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let latest: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(created_at) FROM notifications WHERE kind = $1")
                .bind(kind)
                .fetch_one(self.pool.pool())
                .await?;

        Ok(latest)
    }

    /// Unread notifications for a recipient, newest first.
    #[instrument(skip(self))]
    pub async fn list_unread(&self, recipient_id: Uuid) -> Result<Vec<Notification>, DatabaseError> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE recipient_id = $1 AND read_at IS NULL
            ORDER BY created_at DESC
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(recipient_id)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(notifications)
    }

    /// Record the outcome of one alert email attempt.
    #[instrument(skip(self))]
    pub async fn record_email_delivery(
        &self,
        notification_id: Option<Uuid>,
        recipient: &str,
        status: EmailStatus,
        error: Option<&str>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO email_deliveries (id, notification_id, recipient, status, error, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notification_id)
        .bind(recipient)
        .bind(status)
        .bind(error)
        .execute(self.pool.pool())
        .await?;

        Ok(())
    }

    /// Failed email deliveries since `cutoff`. Health-monitor signal.
    #[instrument(skip(self))]
    pub async fn count_failed_emails_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM email_deliveries WHERE status = $1 AND created_at >= $2",
        )
        .bind(EmailStatus::Failed)
        .bind(cutoff)
        .fetch_one(self.pool.pool())
        .await?;

        Ok(count)
    }
}
