use async_trait::async_trait;

use eventsink_common::Row;

use crate::error::Result;

/// Handle to an existing table. Cheap to clone; carries no state of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    name: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The backing-store contract: named tables, each an ordered header plus an
/// ordered sequence of rows. Rows only come in at the tail and only leave from
/// the head.
///
/// Implementations do not serialize callers against each other beyond keeping
/// individual calls atomic; per-table exclusivity is the dispatcher's job.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn get_table(&self, name: &str) -> Result<Option<TableRef>>;

    /// Create a table with an initial header (possibly empty).
    async fn create_table(&self, name: &str, header: &[String]) -> Result<TableRef>;

    async fn header(&self, table: &TableRef) -> Result<Vec<String>>;

    /// Write one header cell. `index == len` appends a column; `index < len`
    /// renames in place; anything past the end is an error.
    async fn set_header_cell(&self, table: &TableRef, index: usize, name: &str) -> Result<()>;

    async fn append_row(&self, table: &TableRef, row: &Row) -> Result<()>;

    async fn row_count(&self, table: &TableRef) -> Result<u64>;

    /// Delete up to `count` rows from the head of the table. The header stays.
    async fn delete_oldest_rows(&self, table: &TableRef, count: u64) -> Result<()>;

    /// Release connections on shutdown.
    async fn close(&self) {}
}

/// Validates a header cell write against the current header. Shared by stores.
pub(crate) fn check_header_cell(
    table: &str,
    header: &[String],
    index: usize,
    name: &str,
) -> Result<()> {
    use crate::error::StoreError;

    if index > header.len() {
        return Err(StoreError::HeaderIndex {
            table: table.to_string(),
            index,
            len: header.len(),
        });
    }
    if name.is_empty() {
        return Err(StoreError::InvalidHeader {
            table: table.to_string(),
            reason: "column name must not be empty".to_string(),
        });
    }
    let clashes = header
        .iter()
        .enumerate()
        .any(|(i, existing)| i != index && existing == name);
    if clashes {
        return Err(StoreError::InvalidHeader {
            table: table.to_string(),
            reason: format!("duplicate column {name}"),
        });
    }
    Ok(())
}

/// Validates an initial header: no empty or duplicate names.
pub(crate) fn check_initial_header(table: &str, header: &[String]) -> Result<()> {
    eventsink_common::Header::from_columns(header.iter().cloned())
        .map(|_| ())
        .map_err(|e| crate::error::StoreError::InvalidHeader {
            table: table.to_string(),
            reason: e.to_string(),
        })
}

/// A row must match the header length current at append time.
pub(crate) fn check_row_arity(table: &str, header_len: usize, row: &Row) -> Result<()> {
    if row.len() != header_len {
        return Err(crate::error::StoreError::RowArity {
            table: table.to_string(),
            expected: header_len,
            got: row.len(),
        });
    }
    Ok(())
}
