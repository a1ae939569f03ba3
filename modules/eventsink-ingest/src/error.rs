use eventsink_store::StoreError;

/// Result type alias for ingest operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The payload was rejected before any table was touched.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entries before `entry` are committed; `entry` and everything after it are not.
    #[error("entry {entry} of {total} failed, {entry} committed, rest not processed: {source}")]
    Store {
        entry: usize,
        total: usize,
        #[source]
        source: StoreError,
    },

    #[error("provisioning {table} failed: {source}")]
    Provision {
        table: String,
        #[source]
        source: StoreError,
    },
}

impl IngestError {
    pub fn is_validation(&self) -> bool {
        matches!(self, IngestError::Validation(_))
    }
}
