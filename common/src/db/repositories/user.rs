// User repository: recipient resolution and account-state signals

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{User, UserRole};
use tracing::instrument;

const USER_COLUMNS: &str = "id, email, display_name, role, locked_at, created_at, updated_at";

/// Repository for user rows. This core only resolves alert recipients and
/// counts locked admin accounts; account management itself lives elsewhere.
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a user row (used by seeding and tests).
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub async fn create(&self, user: &User) -> Result<(), DatabaseError> {
        sqlx::query(&format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role)
        .bind(user.locked_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.pool.pool())
        .await?;

        Ok(())
    }

    /// All unlocked admin-role users — the alert fan-out recipient set.
    #[instrument(skip(self))]
    pub async fn find_admins(&self) -> Result<Vec<User>, DatabaseError> {
        let admins = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE role = $1 AND locked_at IS NULL ORDER BY email",
            USER_COLUMNS
        ))
        .bind(UserRole::Admin)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(admins)
    }

    /// Currently locked admin accounts. Health-monitor signal.
    #[instrument(skip(self))]
    pub async fn count_locked_admins(&self) -> Result<i64, DatabaseError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1 AND locked_at IS NOT NULL")
                .bind(UserRole::Admin)
                .fetch_one(self.pool.pool())
                .await?;

        Ok(count)
    }
}
