/// Error types for the Fetchkeep record store.
use thiserror::Error;

/// Failures raised by the download record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Byte count {0} does not fit the store's integer range")]
    Overflow(u64),
}

impl StoreError {
    /// Whether the store reported it was busy or locked (worth another try later).
    pub fn is_busy(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Database(db)) => db
                .code()
                .map(|code| code == "5" || code == "6")
                .unwrap_or(false),
            StoreError::Database(sqlx::Error::PoolTimedOut) => true,
            _ => false,
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
