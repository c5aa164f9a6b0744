//! Storage-specific error type wrapping sqlx errors.

use hearth_domain::error::{HearthError, ValidationError};

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize or deserialize a stored JSON value.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A legacy schedule record cannot be converted to a cron trigger.
    #[error("legacy automation {id} cannot be converted")]
    LegacyRecord {
        id: String,
        #[source]
        source: ValidationError,
    },
}

impl From<StorageError> for HearthError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
