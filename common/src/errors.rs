// Error handling framework

use thiserror::Error;

/// Database-specific errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Database health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate key violation: {0}")]
    DuplicateKey(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),
}

/// Scheduled-publishing errors
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Store operation failed: {0}")]
    Store(#[from] DatabaseError),

    #[error("Publish failed for {kind} {id}: {reason}")]
    PublishFailed {
        kind: String,
        id: uuid::Uuid,
        reason: String,
    },

    #[error("Scheduler run exhausted {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Admin notification sink errors
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Recipient lookup failed: {0}")]
    RecipientLookup(String),

    #[error("Notification persistence failed: {0}")]
    Persistence(String),
}

// Implement From for common external errors
impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // Check for specific database error codes
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => DatabaseError::DuplicateKey(db_err.message().to_string()),
                        "23503" => DatabaseError::ForeignKeyViolation(db_err.message().to_string()),
                        _ => DatabaseError::QueryFailed(db_err.message().to_string()),
                    }
                } else {
                    DatabaseError::QueryFailed(db_err.message().to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<DatabaseError> for NotifyError {
    fn from(err: DatabaseError) -> Self {
        NotifyError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_error_display() {
        let err = SchedulerError::RetriesExhausted {
            attempts: 3,
            last_error: "connection reset".to_string(),
        };
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_database_error_wraps_into_scheduler_error() {
        let err: SchedulerError = DatabaseError::QueryFailed("timeout".to_string()).into();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_notify_error_from_database_error() {
        let err: NotifyError = DatabaseError::ConnectionFailed("refused".to_string()).into();
        assert!(matches!(err, NotifyError::Persistence(_)));
    }
}
