// Audit repository: append audit events, count the risky ones

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{AuditAction, AuthEventKind};
use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

/// Repository over the audit log and authentication-event tables. The
/// trigger surfaces append scheduler-run events here; the health monitor
/// reads both tables as anomaly signals. The login path writing
/// `auth_events` lives outside this core.
pub struct AuditRepository {
    pool: DbPool,
}

impl AuditRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append one audit event.
    #[instrument(skip(self, detail))]
    pub async fn record(
        &self,
        action: AuditAction,
        actor: Option<Uuid>,
        detail: serde_json::Value,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, action, actor, detail, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(action.as_str())
        .bind(actor)
        .bind(detail)
        .execute(self.pool.pool())
        .await?;

        tracing::info!(action = action.as_str(), "Audit event recorded");
        Ok(())
    }

    /// Risky administrative actions since `cutoff`. Health-monitor signal.
    #[instrument(skip(self))]
    pub async fn count_risky_since(&self, cutoff: DateTime<Utc>) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM audit_log WHERE action = ANY($1) AND created_at >= $2",
        )
        .bind(
            AuditAction::risky_tags()
                .iter()
                .map(|tag| tag.to_string())
                .collect::<Vec<String>>(),
        )
        .bind(cutoff)
        .fetch_one(self.pool.pool())
        .await?;

        Ok(count)
    }

    /// Append one authentication event (used by seeding and tests; the
    /// production writer is the login path).
    #[instrument(skip(self))]
    pub async fn record_auth_event(
        &self,
        kind: AuthEventKind,
        email: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO auth_events (id, kind, email, created_at)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(kind)
        .bind(email)
        .execute(self.pool.pool())
        .await?;

        Ok(())
    }

    /// Authentication events of `kind` since `cutoff`. Health-monitor signal.
    #[instrument(skip(self))]
    pub async fn count_auth_events_since(
        &self,
        kind: AuthEventKind,
        cutoff: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM auth_events WHERE kind = $1 AND created_at >= $2",
        )
        .bind(kind)
        .bind(cutoff)
        .fetch_one(self.pool.pool())
        .await?;

        Ok(count)
    }
}
