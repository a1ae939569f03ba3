use std::time::Duration;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("table already exists: {0}")]
    TableExists(String),

    #[error("invalid header for {table}: {reason}")]
    InvalidHeader { table: String, reason: String },

    #[error("header index {index} out of range for {table} (header has {len} columns)")]
    HeaderIndex {
        table: String,
        index: usize,
        len: usize,
    },

    #[error("row for {table} has {got} cells, header has {expected}")]
    RowArity {
        table: String,
        expected: usize,
        got: usize,
    },

    #[error("backing store call {op} timed out after {}ms", .after.as_millis())]
    Timeout { op: &'static str, after: Duration },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
